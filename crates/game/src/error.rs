use thiserror::Error;

/// Lobby-phase errors, returned synchronously from the join operation (spec §4.6, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("game already started")]
    AlreadyStarted,
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("game is full (max {0} players)")]
    GameFull(u8),
}

/// Validation errors for in-game commands (spec §4.4, §7). Carried back to the
/// sender as a typed `error` frame; state is left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("system id {0} is out of range")]
    SystemOutOfRange(usize),
    #[error("fleet {0} not found in system {1}")]
    FleetNotFound(u64, usize),
    #[error("fleet {0} is not owned by {1}")]
    NotOwner(u64, String),
    #[error("system {0} is not owned by {1}")]
    SystemNotOwned(usize, String),
    #[error("fleet {0} already moved this tick")]
    AlreadyMoved(u64),
    #[error("system {0} is currently in battle")]
    SystemBattling(usize),
    #[error("fleet {fleet_id} is on cooldown, wait {remaining} more ticks")]
    OnCooldown { fleet_id: u64, remaining: u64 },
    #[error("insufficient resources: have {have}, need {need}")]
    InsufficientResources { have: u64, need: u64 },
    #[error("unknown ship type '{0}'")]
    UnknownShipType(String),
    #[error("unknown player '{0}'")]
    UnknownPlayer(String),
    #[error("game has not started yet")]
    NotStarted,
}
