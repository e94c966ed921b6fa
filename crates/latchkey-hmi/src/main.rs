//! Latchkey HMI node binary.
//!
//! Keys are read from stdin (digits, `+`, `-`, return as Enter) and the
//! display is drawn on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! latchkey-hmi --connect 127.0.0.1:7600
//! ```

use std::time::Duration;

use clap::Parser;
use latchkey_core::{ProtocolTiming, SystemEnv, link::StreamLink, timer::TokioTimer};
use latchkey_hmi::{
    HmiConfig, HmiNode, HmiPeripherals,
    devices::{ReaderKeypad, TextDisplay},
};
use tokio::net::TcpStream;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Latchkey HMI node
#[derive(Parser, Debug)]
#[command(name = "latchkey-hmi")]
#[command(about = "Door access keypad and display node")]
#[command(version)]
struct Args {
    /// Control node address
    #[arg(short, long, default_value = "127.0.0.1:7600")]
    connect: String,

    /// Door open and close dwell in seconds (must match Control)
    #[arg(long, default_value = "15")]
    door_secs: u64,

    /// Lockout dwell in seconds (must match Control)
    #[arg(long, default_value = "60")]
    lockout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = HmiConfig {
        timing: ProtocolTiming {
            door_dwell: Duration::from_secs(args.door_secs),
            lockout_dwell: Duration::from_secs(args.lockout_secs),
        },
        ..HmiConfig::default()
    };

    tracing::info!("Connecting to control at {}", args.connect);
    let stream = TcpStream::connect(&args.connect).await?;
    stream.set_nodelay(true)?;

    let peripherals = HmiPeripherals {
        keypad: Box::new(ReaderKeypad::new(tokio::io::stdin())),
        display: Box::new(TextDisplay::new(std::io::stdout())),
    };
    let mut node =
        HmiNode::new(SystemEnv::new(), StreamLink::new(stream), TokioTimer::new(), peripherals, config)?;
    node.run().await?;

    Ok(())
}
