use std::sync::Arc;

use anyhow::{Context, Result};
use quinn::{Connection, Endpoint, RecvStream, SendStream};
use tokio::sync::mpsc;

use starbit_core::{ClientDatagramMessage, Command, DatagramEnvelope, ServerDatagramMessage};

use crate::shared::Shared;
use crate::tls;

/// Runs the datagram session server (spec §4.7): a QUIC endpoint where each
/// connection opens one bidirectional stream per client session.
pub async fn run(shared: Arc<Shared>) -> Result<()> {
    let server_config = tls::build_server_config()?;
    let addr = shared.config.datagram_bind.parse()?;
    let endpoint = Endpoint::server(server_config, addr)?;
    log::info!("datagram server listening on {}", shared.config.datagram_bind);

    while let Some(incoming) = endpoint.accept().await {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            match incoming.await {
                Ok(connection) => handle_connection(connection, shared).await,
                Err(err) => log::warn!("datagram handshake failed: {}", err),
            }
        });
    }

    Ok(())
}

async fn handle_connection(connection: Connection, shared: Arc<Shared>) {
    loop {
        match connection.accept_bi().await {
            Ok((send, recv)) => {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    if let Err(err) = handle_stream(send, recv, shared).await {
                        log::warn!("datagram stream ended: {}", err);
                    }
                });
            }
            Err(err) => {
                log::info!("datagram connection closed: {}", err);
                return;
            }
        }
    }
}

async fn handle_stream(send: SendStream, mut recv: RecvStream, shared: Arc<Shared>) -> Result<()> {
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let mut username: Option<String> = None;

    let mut writer = send;
    let writer_task = tokio::spawn(async move {
        while let Some(bytes) = outbox_rx.recv().await {
            use tokio::io::AsyncWriteExt;
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    let result = read_loop(&mut recv, &shared, &outbox_tx, &mut username).await;

    if let Some(name) = &username {
        shared.unregister_datagram_outbox(name).await;
    }
    drop(outbox_tx);
    let _ = writer_task.await;

    result
}

async fn read_loop(
    recv: &mut RecvStream,
    shared: &Arc<Shared>,
    outbox: &mpsc::UnboundedSender<Vec<u8>>,
    username: &mut Option<String>,
) -> Result<()> {
    // The reference protocol is a stream of independently-framed JSON
    // objects; since QUIC streams are byte streams, each read is treated as
    // one frame, matching the original datagram-per-read convention (spec §6,
    // grounded in the unlimited length-delimited style of the underlying
    // stream API).
    let mut buf = vec![0u8; 4096];
    loop {
        let n = match recv.read(&mut buf).await.context("stream read")? {
            Some(n) if n > 0 => n,
            _ => return Ok(()),
        };

        let envelope = match DatagramEnvelope::decode(&buf[..n]) {
            Ok(envelope) => envelope,
            Err(err) => {
                log::warn!("malformed datagram frame: {}", err);
                continue;
            }
        };

        let message = match ClientDatagramMessage::from_envelope(envelope) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("unrecognized datagram message: {}", err);
                continue;
            }
        };

        match message {
            ClientDatagramMessage::Register { username: name } => {
                let known = shared.state.lock().await.player_names().contains(&name);
                if known {
                    shared
                        .register_datagram_outbox(name.clone(), outbox.clone())
                        .await;
                    *username = Some(name);
                    send_reply(outbox, ServerDatagramMessage::Welcome);
                } else {
                    send_reply(
                        outbox,
                        ServerDatagramMessage::Error {
                            reason: format!("unknown username '{}'", name),
                        },
                    );
                }
            }
            ClientDatagramMessage::Ping => {
                send_reply(outbox, ServerDatagramMessage::Pong);
            }
            other => {
                let Some(sender) = username.clone() else {
                    send_reply(
                        outbox,
                        ServerDatagramMessage::Error {
                            reason: "register before sending commands".to_string(),
                        },
                    );
                    continue;
                };
                let Ok(command) = Command::try_from(other) else {
                    continue;
                };
                let outcome = {
                    let mut state = shared.state.lock().await;
                    state.apply_command(&sender, command)
                };
                if let Err(err) = outcome {
                    send_reply(
                        outbox,
                        ServerDatagramMessage::Error {
                            reason: err.to_string(),
                        },
                    );
                }
            }
        }
    }
}

fn send_reply(outbox: &mpsc::UnboundedSender<Vec<u8>>, message: ServerDatagramMessage) {
    if let Ok(bytes) = message.into_envelope().encode() {
        let _ = outbox.send(bytes);
    }
}
