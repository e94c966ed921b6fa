//! Latchkey Control node binary.
//!
//! # Usage
//!
//! ```bash
//! # Wait for the HMI on the default port, credential in ./credential.bin
//! latchkey-control --bind 127.0.0.1:7600
//!
//! # Short dwells, keep an existing credential, doorway driven by a flag file
//! latchkey-control --door-secs 3 --lockout-secs 10 --resume-enrolled --presence-flag /tmp/someone
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use latchkey_control::{
    ControlConfig, ControlNode, ControlPeripherals, FileCredentialStore,
    devices::{FlagFilePresence, TracingActuator, TracingAlarm},
};
use latchkey_core::{ProtocolTiming, SystemEnv, link::StreamLink, timer::TokioTimer};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Latchkey Control node
#[derive(Parser, Debug)]
#[command(name = "latchkey-control")]
#[command(about = "Door access Control node")]
#[command(version)]
struct Args {
    /// Address to accept the HMI link on
    #[arg(short, long, default_value = "127.0.0.1:7600")]
    bind: String,

    /// Credential store file
    #[arg(short, long, default_value = "credential.bin")]
    store: PathBuf,

    /// Door open and close dwell in seconds
    #[arg(long, default_value = "15")]
    door_secs: u64,

    /// Lockout dwell in seconds
    #[arg(long, default_value = "60")]
    lockout_secs: u64,

    /// Start in Idle when the store already holds a valid credential
    #[arg(long)]
    resume_enrolled: bool,

    /// Report someone in the doorway while this file exists
    #[arg(long)]
    presence_flag: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Latchkey control starting");

    let config = ControlConfig {
        timing: ProtocolTiming {
            door_dwell: Duration::from_secs(args.door_secs),
            lockout_dwell: Duration::from_secs(args.lockout_secs),
        },
        resume_enrolled: args.resume_enrolled,
        ..ControlConfig::default()
    };
    let store = FileCredentialStore::open(&args.store)?;
    let peripherals = ControlPeripherals {
        actuator: Box::new(TracingActuator),
        alarm: Box::new(TracingAlarm::default()),
        presence: Box::new(FlagFilePresence::new(args.presence_flag)),
    };

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!("Waiting for HMI on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept().await?;
    stream.set_nodelay(true)?;
    tracing::info!("HMI connected from {}", peer);

    let mut node = ControlNode::new(
        SystemEnv::new(),
        store,
        StreamLink::new(stream),
        TokioTimer::new(),
        peripherals,
        config,
    )?;
    node.run().await?;

    Ok(())
}
