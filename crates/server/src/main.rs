mod connection;
mod sim;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use arena_core::RoomConfig;
use arena_core::net::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "arena-server")]
#[command(about = "Authoritative arena shooter server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 16)]
    max_clients: usize,

    #[arg(long, default_value_t = 20, help = "Reconnection grace window in seconds")]
    reconnect_grace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let config = RoomConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        reconnect_grace_ms: args.reconnect_grace_secs * 1_000,
    };

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::channel(4096);

    tokio::spawn(sim::run(config, control_rx, input_rx));

    let listener = TcpListener::bind(&bind_addr).await?;
    log::info!("server listening on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.accept().await?;
        let control_tx = control_tx.clone();
        let input_tx = input_tx.clone();
        tokio::spawn(async move {
            connection::handle_connection(stream, addr, control_tx, input_tx).await;
        });
    }
}
