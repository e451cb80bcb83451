use anyhow::{Result, bail};

use starbit_core::{ClientDatagramMessage, ClientState, ShipClass};

/// Parses the client console grammar (spec §6):
///   fm <fleetId> <toSystemId>
///   fc <systemId>
///   fu <fleetId> <shipType ∈ {de,cr,ba,dr}>
pub fn parse(line: &str, state: &ClientState) -> Result<ClientDatagramMessage> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["fm", fleet_id, to_system_id] => {
            let fleet_id: u64 = fleet_id.parse()?;
            let to_system_id: usize = to_system_id.parse()?;
            let fleet = state
                .fleets
                .get(&fleet_id)
                .ok_or_else(|| anyhow::anyhow!("no known fleet with id {}", fleet_id))?;
            Ok(ClientDatagramMessage::FleetMovement {
                fleet_id,
                from_system_id: fleet.system_id,
                to_system_id,
            })
        }
        ["fc", system_id] => {
            let system_id: usize = system_id.parse()?;
            Ok(ClientDatagramMessage::FleetCreation { system_id })
        }
        ["fu", fleet_id, ship_type] => {
            let fleet_id: u64 = fleet_id.parse()?;
            let ship_type = ShipClass::from_shorthand(ship_type)
                .ok_or_else(|| anyhow::anyhow!("unknown ship type '{}'", ship_type))?;
            let fleet = state
                .fleets
                .get(&fleet_id)
                .ok_or_else(|| anyhow::anyhow!("no known fleet with id {}", fleet_id))?;
            Ok(ClientDatagramMessage::FleetModification {
                fleet_id,
                system_id: fleet.system_id,
                ship_type,
            })
        }
        _ => bail!("unrecognized command '{}' (expected fm/fc/fu)", line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starbit_core::{ClientFleet, FleetStats};

    fn state_with_fleet(id: u64, system_id: usize) -> ClientState {
        let mut state = ClientState::new();
        state.fleets.insert(
            id,
            ClientFleet {
                id,
                owner: "alice".to_string(),
                system_id,
                health: 50,
                stats: FleetStats {
                    max_health: 50,
                    attack: 2,
                    exattack: 1,
                    evasion: 35,
                    armor: 5,
                },
            },
        );
        state
    }

    #[test]
    fn parses_fleet_movement() {
        let state = state_with_fleet(1, 0);
        let msg = parse("fm 1 5", &state).unwrap();
        assert!(matches!(
            msg,
            ClientDatagramMessage::FleetMovement {
                fleet_id: 1,
                from_system_id: 0,
                to_system_id: 5
            }
        ));
    }

    #[test]
    fn parses_fleet_creation() {
        let state = ClientState::new();
        let msg = parse("fc 3", &state).unwrap();
        assert!(matches!(
            msg,
            ClientDatagramMessage::FleetCreation { system_id: 3 }
        ));
    }

    #[test]
    fn parses_fleet_upgrade() {
        let state = state_with_fleet(2, 4);
        let msg = parse("fu 2 cr", &state).unwrap();
        assert!(matches!(
            msg,
            ClientDatagramMessage::FleetModification {
                fleet_id: 2,
                system_id: 4,
                ship_type: ShipClass::Cruiser
            }
        ));
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(parse("xx 1 2", &ClientState::new()).is_err());
    }
}
