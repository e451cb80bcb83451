use anyhow::{Result, bail};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use starbit_core::{LobbySnapshot, ReliableRequest, ReliableResponse};

/// Sends a one-shot `Join` request and returns the lobby snapshot (spec
/// §4.6). The connection is closed immediately after; `maintain` opens its
/// own long-lived connection.
pub async fn join(addr: &str, username: &str) -> Result<LobbySnapshot> {
    let socket = TcpStream::connect(addr).await?;
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    let request = ReliableRequest::Join {
        username: username.to_string(),
    };
    framed.send(Bytes::from(bincode::serialize(&request)?)).await?;

    let Some(frame) = framed.next().await else {
        bail!("server closed the connection before responding to join");
    };
    match bincode::deserialize(&frame?)? {
        ReliableResponse::JoinResponse(snapshot) => Ok(snapshot),
        ReliableResponse::JoinError(reason) => bail!(reason),
        ReliableResponse::GameUpdate(_) => bail!("unexpected GameUpdate in response to join"),
    }
}

/// Opens the long-lived `Maintain` stream and forwards every pushed
/// `LobbySnapshot` onto `updates` until the stream ends (spec §4.6).
pub async fn run_maintain(
    addr: String,
    username: String,
    updates: mpsc::UnboundedSender<LobbySnapshot>,
) -> Result<()> {
    let socket = TcpStream::connect(&addr).await?;
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    let request = ReliableRequest::Maintain { username };
    framed.send(Bytes::from(bincode::serialize(&request)?)).await?;

    while let Some(frame) = framed.next().await {
        let response: ReliableResponse = bincode::deserialize(&frame?)?;
        match response {
            ReliableResponse::GameUpdate(snapshot) => {
                if updates.send(snapshot).is_err() {
                    break;
                }
            }
            other => log::warn!("unexpected maintain-stream message: {:?}", other),
        }
    }

    Ok(())
}
