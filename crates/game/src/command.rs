use serde::{Deserialize, Serialize};

use crate::fleet::ShipClass;
use crate::wire::ClientDatagramMessage;

/// The three command kinds a player may send over the datagram transport
/// (spec §4.4). The sender's username travels alongside the command at the
/// transport layer, not inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    FleetMovement {
        fleet_id: u64,
        from_system_id: usize,
        to_system_id: usize,
    },
    FleetCreation {
        system_id: usize,
    },
    FleetModification {
        fleet_id: u64,
        system_id: usize,
        ship_type: ShipClass,
    },
}

/// `register`/`ping` have no place in the command model; everything else
/// converts directly.
impl TryFrom<ClientDatagramMessage> for Command {
    type Error = ();

    fn try_from(message: ClientDatagramMessage) -> Result<Self, Self::Error> {
        match message {
            ClientDatagramMessage::FleetMovement {
                fleet_id,
                from_system_id,
                to_system_id,
            } => Ok(Command::FleetMovement {
                fleet_id,
                from_system_id,
                to_system_id,
            }),
            ClientDatagramMessage::FleetCreation { system_id } => {
                Ok(Command::FleetCreation { system_id })
            }
            ClientDatagramMessage::FleetModification {
                fleet_id,
                system_id,
                ship_type,
            } => Ok(Command::FleetModification {
                fleet_id,
                system_id,
                ship_type,
            }),
            ClientDatagramMessage::Register { .. } | ClientDatagramMessage::Ping => Err(()),
        }
    }
}
