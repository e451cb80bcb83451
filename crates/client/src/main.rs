mod commands;
mod datagram;
mod reliable;
mod tls;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};

use starbit_core::ClientState;

#[derive(Parser)]
#[command(name = "starbit-client")]
#[command(about = "Console client for starbit")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:50051")]
    reliable_addr: String,

    #[arg(long, default_value = "127.0.0.1:50052")]
    datagram_addr: String,

    #[arg(long)]
    username: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("no rustls crypto provider installed yet");

    let args = Args::parse();

    let snapshot = reliable::join(&args.reliable_addr, &args.username).await?;
    log::info!(
        "joined as {}: {} players connected, started = {}",
        args.username,
        snapshot.player_count,
        snapshot.started
    );

    // The join response already carries every system's owner and every
    // starter fleet once the lobby has started; subsequent `TickDelta`s
    // never repeat that initial state, so the replica must be seeded from
    // it directly (spec §4.6/§4.8).
    let client_state = Arc::new(Mutex::new(ClientState::new()));
    if snapshot.started {
        client_state.lock().await.seed(&snapshot.galaxy);
    }

    let (lobby_tx, mut lobby_rx) = mpsc::unbounded_channel();
    tokio::spawn(reliable::run_maintain(
        args.reliable_addr.clone(),
        args.username.clone(),
        lobby_tx,
    ));
    let lobby_state = Arc::clone(&client_state);
    tokio::spawn(async move {
        while let Some(update) = lobby_rx.recv().await {
            if update.started {
                log::info!("game has started with {} players", update.players.len());
                lobby_state.lock().await.seed(&update.galaxy);
            }
        }
    });

    let (session, recv) = datagram::DatagramSession::connect(&args.datagram_addr, &args.username).await?;
    let session = Arc::new(session);

    tokio::spawn(datagram::run_ping_loop(Arc::clone(&session)));

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    tokio::spawn(datagram::run_read_loop(recv, tick_tx));

    let apply_state = Arc::clone(&client_state);
    tokio::spawn(async move {
        while let Some(delta) = tick_rx.recv().await {
            let mut state = apply_state.lock().await;
            state.apply(&delta);
            if state.victor.is_some() {
                log::info!("victory declared: {:?}", state.victor);
            }
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    println!("Connected. Enter commands: fm <fleetId> <toSystemId> | fc <systemId> | fu <fleetId> <de|cr|ba|dr>");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message = {
            let state = client_state.lock().await;
            commands::parse(line, &state)
        };
        match message {
            Ok(message) => {
                if let Err(err) = session.send_message(message).await {
                    log::warn!("failed to send command: {}", err);
                }
            }
            Err(err) => println!("error: {}", err),
        }
    }

    Ok(())
}
