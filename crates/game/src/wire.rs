use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delta::TickDelta;
use crate::fleet::ShipClass;
use crate::galaxy::Galaxy;

/// Errors produced while decoding a wire frame (spec §7 protocol errors).
/// These are never fatal to the stream: the caller logs and drops the frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed datagram frame: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("unrecognized message type '{0}'")]
    UnknownType(String),
    #[error("message type '{0}' is missing its content payload")]
    MissingContent(String),
}

// ---- Reliable side (spec §4.6, §6) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub player_count: u8,
    pub players: Vec<String>,
    pub started: bool,
    pub galaxy: Galaxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReliableRequest {
    Join { username: String },
    Maintain { username: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReliableResponse {
    JoinResponse(LobbySnapshot),
    JoinError(String),
    /// Pushed on the maintain stream when the lobby changes, and again (with
    /// `started = true`) the moment the game initializes (spec §4.6).
    GameUpdate(LobbySnapshot),
}

// ---- Datagram side (spec §4.7, §6) ----

/// The wire envelope shared by both directions: `{type, username?, content?,
/// tickMsg?}`. Commands and replies are encoded into `content` as nested
/// JSON; only `tick` uses `tick_msg` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatagramEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(rename = "tickMsg", skip_serializing_if = "Option::is_none")]
    pub tick_msg: Option<TickDelta>,
}

impl DatagramEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientDatagramMessage {
    Register { username: String },
    Ping,
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

impl ClientDatagramMessage {
    pub fn into_envelope(self) -> DatagramEnvelope {
        match self {
            ClientDatagramMessage::Register { username } => DatagramEnvelope {
                kind: "register".to_string(),
                username: Some(username),
                content: None,
                tick_msg: None,
            },
            ClientDatagramMessage::Ping => DatagramEnvelope {
                kind: "ping".to_string(),
                username: None,
                content: None,
                tick_msg: None,
            },
            other => {
                let kind = other.kind_str().to_string();
                let content = serde_json::to_value(&other).ok();
                DatagramEnvelope {
                    kind,
                    username: None,
                    content,
                    tick_msg: None,
                }
            }
        }
    }

    fn kind_str(&self) -> &'static str {
        match self {
            ClientDatagramMessage::Register { .. } => "register",
            ClientDatagramMessage::Ping => "ping",
            ClientDatagramMessage::FleetMovement { .. } => "fleet_movement",
            ClientDatagramMessage::FleetCreation { .. } => "fleet_creation",
            ClientDatagramMessage::FleetModification { .. } => "fleet_modification",
        }
    }

    pub fn from_envelope(envelope: DatagramEnvelope) -> Result<Self, ProtocolError> {
        match envelope.kind.as_str() {
            "register" => {
                let username = envelope
                    .username
                    .ok_or_else(|| ProtocolError::MissingContent("register".to_string()))?;
                Ok(ClientDatagramMessage::Register { username })
            }
            "ping" => Ok(ClientDatagramMessage::Ping),
            "fleet_movement" => {
                #[derive(Deserialize)]
                struct Body {
                    fleet_id: u64,
                    from_system_id: usize,
                    to_system_id: usize,
                }
                let body: Body = envelope
                    .content
                    .ok_or_else(|| ProtocolError::MissingContent("fleet_movement".to_string()))
                    .and_then(|v| serde_json::from_value(v).map_err(ProtocolError::from))?;
                Ok(ClientDatagramMessage::FleetMovement {
                    fleet_id: body.fleet_id,
                    from_system_id: body.from_system_id,
                    to_system_id: body.to_system_id,
                })
            }
            "fleet_creation" => {
                #[derive(Deserialize)]
                struct Body {
                    system_id: usize,
                }
                let body: Body = envelope
                    .content
                    .ok_or_else(|| ProtocolError::MissingContent("fleet_creation".to_string()))
                    .and_then(|v| serde_json::from_value(v).map_err(ProtocolError::from))?;
                Ok(ClientDatagramMessage::FleetCreation {
                    system_id: body.system_id,
                })
            }
            "fleet_modification" => {
                #[derive(Deserialize)]
                struct Body {
                    fleet_id: u64,
                    system_id: usize,
                    ship_type: ShipClass,
                }
                let body: Body = envelope
                    .content
                    .ok_or_else(|| ProtocolError::MissingContent("fleet_modification".to_string()))
                    .and_then(|v| serde_json::from_value(v).map_err(ProtocolError::from))?;
                Ok(ClientDatagramMessage::FleetModification {
                    fleet_id: body.fleet_id,
                    system_id: body.system_id,
                    ship_type: body.ship_type,
                })
            }
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServerDatagramMessage {
    Welcome,
    Pong,
    Error { reason: String },
    Tick(TickDelta),
}

impl ServerDatagramMessage {
    pub fn into_envelope(self) -> DatagramEnvelope {
        match self {
            ServerDatagramMessage::Welcome => DatagramEnvelope {
                kind: "welcome".to_string(),
                username: None,
                content: None,
                tick_msg: None,
            },
            ServerDatagramMessage::Pong => DatagramEnvelope {
                kind: "pong".to_string(),
                username: None,
                content: None,
                tick_msg: None,
            },
            ServerDatagramMessage::Error { reason } => DatagramEnvelope {
                kind: "error".to_string(),
                username: None,
                content: Some(serde_json::Value::String(reason)),
                tick_msg: None,
            },
            ServerDatagramMessage::Tick(delta) => DatagramEnvelope {
                kind: "tick".to_string(),
                username: None,
                content: None,
                tick_msg: Some(delta),
            },
        }
    }

    pub fn from_envelope(envelope: DatagramEnvelope) -> Result<Self, ProtocolError> {
        match envelope.kind.as_str() {
            "welcome" => Ok(ServerDatagramMessage::Welcome),
            "pong" => Ok(ServerDatagramMessage::Pong),
            "error" => {
                let reason = match envelope.content {
                    Some(serde_json::Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Ok(ServerDatagramMessage::Error { reason })
            }
            "tick" => {
                let delta = envelope
                    .tick_msg
                    .ok_or_else(|| ProtocolError::MissingContent("tick".to_string()))?;
                Ok(ServerDatagramMessage::Tick(delta))
            }
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_round_trips_through_envelope() {
        let msg = ClientDatagramMessage::Register {
            username: "alice".to_string(),
        };
        let envelope = msg.clone().into_envelope();
        let bytes = envelope.encode().unwrap();
        let decoded = DatagramEnvelope::decode(&bytes).unwrap();
        let roundtripped = ClientDatagramMessage::from_envelope(decoded).unwrap();
        assert!(matches!(roundtripped, ClientDatagramMessage::Register { username } if username == "alice"));
    }

    #[test]
    fn fleet_movement_round_trips_through_content() {
        let msg = ClientDatagramMessage::FleetMovement {
            fleet_id: 7,
            from_system_id: 1,
            to_system_id: 2,
        };
        let envelope = msg.into_envelope();
        assert_eq!(envelope.kind, "fleet_movement");
        let bytes = envelope.encode().unwrap();
        let decoded = DatagramEnvelope::decode(&bytes).unwrap();
        let roundtripped = ClientDatagramMessage::from_envelope(decoded).unwrap();
        assert!(matches!(
            roundtripped,
            ClientDatagramMessage::FleetMovement {
                fleet_id: 7,
                from_system_id: 1,
                to_system_id: 2
            }
        ));
    }

    #[test]
    fn unknown_type_is_a_protocol_error() {
        let envelope = DatagramEnvelope {
            kind: "nonsense".to_string(),
            username: None,
            content: None,
            tick_msg: None,
        };
        assert!(matches!(
            ClientDatagramMessage::from_envelope(envelope),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn server_tick_round_trips() {
        let delta = TickDelta::default();
        let msg = ServerDatagramMessage::Tick(delta);
        let envelope = msg.into_envelope();
        let bytes = envelope.encode().unwrap();
        let decoded = DatagramEnvelope::decode(&bytes).unwrap();
        assert!(matches!(
            ServerDatagramMessage::from_envelope(decoded).unwrap(),
            ServerDatagramMessage::Tick(_)
        ));
    }
}
