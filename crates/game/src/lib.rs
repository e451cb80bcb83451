pub mod client_state;
pub mod combat;
pub mod command;
pub mod config;
pub mod delta;
pub mod error;
pub mod fleet;
pub mod galaxy;
pub mod state;
pub mod wire;

pub use client_state::{ClientFleet, ClientState, ClientSystem};
pub use command::Command;
pub use config::{ClassStats, GameConfig, class_stats};
pub use delta::{
    DeltaBundle, FleetCreation, FleetDestroyed, FleetMovement, GesUpdate, HealthUpdate,
    SystemOwnerChange, TickDelta, Victory,
};
pub use error::{CommandError, LobbyError};
pub use fleet::{Composition, Fleet, FleetStats, ShipClass};
pub use galaxy::{Galaxy, OwnerChange, System, UNOWNED};
pub use state::{AuthoritativeState, JoinOutcome, Player};
pub use wire::{
    ClientDatagramMessage, DatagramEnvelope, LobbySnapshot, ProtocolError, ReliableRequest,
    ReliableResponse, ServerDatagramMessage,
};
