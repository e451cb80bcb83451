use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use quinn::{Connection, Endpoint, RecvStream, SendStream};
use tokio::sync::{Mutex, mpsc};

use starbit_core::{ClientDatagramMessage, ServerDatagramMessage, TickDelta};

use crate::tls;

const PING_INTERVAL: Duration = Duration::from_secs(5);

/// A connected datagram session: the bidirectional stream used for
/// register/ping/commands, shared behind a mutex since writes can come from
/// both the console input loop and the ping timer (spec §4.7).
pub struct DatagramSession {
    send: Mutex<SendStream>,
}

impl DatagramSession {
    pub async fn connect(addr: &str, username: &str) -> Result<(Self, RecvStream)> {
        let client_config = tls::build_client_config()?;
        let mut endpoint = Endpoint::client("0.0.0.0:0".parse()?)?;
        endpoint.set_default_client_config(client_config);

        let socket_addr = addr.parse()?;
        let connection: Connection = endpoint.connect(socket_addr, "localhost")?.await?;
        let (send, recv) = connection.open_bi().await?;

        let session = DatagramSession {
            send: Mutex::new(send),
        };
        session
            .send_message(ClientDatagramMessage::Register {
                username: username.to_string(),
            })
            .await?;

        Ok((session, recv))
    }

    pub async fn send_message(&self, message: ClientDatagramMessage) -> Result<()> {
        let envelope = message.into_envelope();
        let bytes = envelope.encode()?;
        let mut send = self.send.lock().await;
        use tokio::io::AsyncWriteExt;
        send.write_all(&bytes).await?;
        Ok(())
    }
}

/// Sends a ping every five seconds to keep the datagram stream alive (spec §4.7).
pub async fn run_ping_loop(session: Arc<DatagramSession>) {
    let mut ticker = tokio::time::interval(PING_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(err) = session.send_message(ClientDatagramMessage::Ping).await {
            log::warn!("ping failed: {}", err);
            return;
        }
    }
}

/// Reads frames off the datagram stream, forwarding ticks to `ticks` and
/// logging anything else.
pub async fn run_read_loop(mut recv: RecvStream, ticks: mpsc::UnboundedSender<TickDelta>) {
    let mut buf = vec![0u8; 8192];
    loop {
        let n = match recv.read(&mut buf).await {
            Ok(Some(n)) if n > 0 => n,
            Ok(_) => return,
            Err(err) => {
                log::warn!("datagram stream read error: {}", err);
                return;
            }
        };

        let envelope = match starbit_core::DatagramEnvelope::decode(&buf[..n]) {
            Ok(envelope) => envelope,
            Err(err) => {
                log::warn!("malformed server frame: {}", err);
                continue;
            }
        };

        match ServerDatagramMessage::from_envelope(envelope) {
            Ok(ServerDatagramMessage::Tick(delta)) => {
                if ticks.send(delta).is_err() {
                    return;
                }
            }
            Ok(ServerDatagramMessage::Welcome) => log::info!("registered with the server"),
            Ok(ServerDatagramMessage::Pong) => {}
            Ok(ServerDatagramMessage::Error { reason }) => log::warn!("server error: {}", reason),
            Err(err) => log::warn!("unrecognized server frame: {}", err),
        }
    }
}
