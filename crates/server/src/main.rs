mod broadcaster;
mod config;
mod datagram;
mod reliable;
mod shared;
mod tls;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use config::ServerConfig;
use shared::Shared;
use starbit_core::GameConfig;

#[derive(Parser)]
#[command(name = "starbit-server")]
#[command(about = "Authoritative server for starbit")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:50051")]
    reliable_bind: String,

    #[arg(long, default_value = "0.0.0.0:50052")]
    datagram_bind: String,

    #[arg(long, default_value_t = GameConfig::default().max_players)]
    max_players: u8,

    #[arg(long, default_value_t = GameConfig::default().galaxy_width)]
    galaxy_width: u32,

    #[arg(long, default_value_t = GameConfig::default().galaxy_height)]
    galaxy_height: u32,

    #[arg(long, default_value_t = GameConfig::default().tick_period_ms)]
    tick_period_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("no rustls crypto provider installed yet");

    let args = Args::parse();
    let config = ServerConfig {
        reliable_bind: args.reliable_bind,
        datagram_bind: args.datagram_bind,
        game: GameConfig {
            max_players: args.max_players,
            galaxy_width: args.galaxy_width,
            galaxy_height: args.galaxy_height,
            tick_period_ms: args.tick_period_ms,
            ..GameConfig::default()
        },
    };

    log::info!(
        "starting starbit-server (reliable on {}, datagram on {})",
        config.reliable_bind,
        config.datagram_bind
    );

    let shared = Arc::new(Shared::new(config));

    let reliable_task = tokio::spawn(reliable::run(Arc::clone(&shared)));
    let datagram_task = tokio::spawn(datagram::run(Arc::clone(&shared)));
    let broadcaster_task = tokio::spawn(broadcaster::run(Arc::clone(&shared)));

    tokio::select! {
        result = reliable_task => result??,
        result = datagram_task => result??,
        _ = broadcaster_task => {},
    }

    Ok(())
}
