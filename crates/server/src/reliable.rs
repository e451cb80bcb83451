use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use starbit_core::{JoinOutcome, LobbySnapshot, ReliableRequest, ReliableResponse};

use crate::shared::Shared;

/// Runs the reliable session server (spec §4.6): accepts TCP connections,
/// each carrying exactly one `Join` or `Maintain` request framed with a
/// length-delimited codec and encoded with `bincode`.
pub async fn run(shared: Arc<Shared>) -> Result<()> {
    let listener = TcpListener::bind(&shared.config.reliable_bind).await?;
    log::info!("reliable server listening on {}", shared.config.reliable_bind);

    loop {
        let (socket, addr) = listener.accept().await?;
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(socket, shared).await {
                log::warn!("reliable connection from {} ended: {}", addr, err);
            }
        });
    }
}

async fn handle_connection(socket: TcpStream, shared: Arc<Shared>) -> Result<()> {
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    let Some(frame) = framed.next().await else {
        return Ok(());
    };
    let request: ReliableRequest = bincode::deserialize(&frame?)?;

    match request {
        ReliableRequest::Join { username } => handle_join(&mut framed, &shared, username).await,
        ReliableRequest::Maintain { username } => {
            handle_maintain(&mut framed, &shared, username).await
        }
    }
}

async fn handle_join(
    framed: &mut Framed<TcpStream, LengthDelimitedCodec>,
    shared: &Arc<Shared>,
    username: String,
) -> Result<()> {
    let outcome = {
        let mut state = shared.state.lock().await;
        state.join(&username)
    };

    let response = match &outcome {
        Ok(_) => ReliableResponse::JoinResponse(build_snapshot(shared).await),
        Err(err) => ReliableResponse::JoinError(err.to_string()),
    };

    // Already-maintained clients are only pushed an update when this join
    // transitions the lobby to started (spec §4.6, grounded on the
    // original's `gameJustStarted` flag gating `broadcastGameStart`), not on
    // every join.
    if matches!(outcome, Ok(JoinOutcome::GameStarted)) {
        let snapshot = build_snapshot(shared).await;
        let _ = shared.lobby_updates.send(snapshot);
    }

    let bytes = bincode::serialize(&response)?;
    framed.send(Bytes::from(bytes)).await?;
    Ok(())
}

async fn handle_maintain(
    framed: &mut Framed<TcpStream, LengthDelimitedCodec>,
    shared: &Arc<Shared>,
    username: String,
) -> Result<()> {
    let mut updates = shared.lobby_updates.subscribe();
    log::info!("{} is maintaining a reliable connection", username);

    loop {
        tokio::select! {
            update = updates.recv() => {
                let snapshot = match update {
                    Ok(snapshot) => snapshot,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let response = ReliableResponse::GameUpdate(snapshot);
                let bytes = bincode::serialize(&response)?;
                framed.send(Bytes::from(bytes)).await?;
            }
            frame = framed.next() => {
                match frame {
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        }
    }

    let mut state = shared.state.lock().await;
    state.remove_player(&username);
    drop(state);
    log::info!("{} disconnected from the reliable stream", username);
    Ok(())
}

async fn build_snapshot(shared: &Arc<Shared>) -> LobbySnapshot {
    let state = shared.state.lock().await;
    LobbySnapshot {
        player_count: state.player_count(),
        players: state.player_names(),
        started: state.started,
        galaxy: state.galaxy.clone(),
    }
}
