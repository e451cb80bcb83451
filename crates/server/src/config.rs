use starbit_core::GameConfig;

/// Server-wide configuration: transport binding plus the game rules (spec §6).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub reliable_bind: String,
    pub datagram_bind: String,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            reliable_bind: "0.0.0.0:50051".to_string(),
            datagram_bind: "0.0.0.0:50052".to_string(),
            game: GameConfig::default(),
        }
    }
}
