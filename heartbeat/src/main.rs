#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pulsecake::detector::{DetectorConfig, FailureDetector};
use pulsecake::directory::{load_entries, Directory};
use pulsecake::transport::Transport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args: Args = Args::parse();

    let config = DetectorConfig::default()
        .with_start_delay(args.start_delay)
        .with_beat_interval(args.beat_interval)
        .with_timeout(args.timeout);
    config.validate()?;

    let directory = match args.directory.as_ref() {
        Some(path) => Directory::new(load_entries(path)?),
        None => Directory::sample(),
    };

    let transport = Arc::new(Transport::open(args.id.as_str(), &directory).await?);
    info!(id = %transport.id(), addr = %transport.local_addr(), "Transport is listening.");

    let detector = FailureDetector::start(transport.clone(), args.neighbors, config)?;
    let suspicions = detector.suspicions();

    loop {
        tokio::select! {
            suspicion = suspicions.recv_async() => {
                match suspicion {
                    Ok(suspicion) => println!("{suspicion}"),
                    Err(_) => break,
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down.");
                break;
            },
        }
    }

    detector.shutdown();
    transport.close().await?;

    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Sends heartbeats to a set of neighbors and reports any which stop responding.
pub struct Args {
    /// The ID of this node.
    id: String,

    #[arg(required = true, num_args = 1..)]
    /// The IDs of the nodes to monitor.
    neighbors: Vec<String>,

    #[arg(long)]
    /// A JSON file of `{"id": ..., "address": ...}` entries.
    ///
    /// The built in sample table is used if this is not set.
    directory: Option<PathBuf>,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
    /// How long to wait for the other nodes to start before sending heartbeats.
    start_delay: Duration,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    /// The time between heartbeats.
    beat_interval: Duration,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "3s")]
    /// How long a neighbor may be silent before it is reported as failed.
    ///
    /// Must be at least twice the beat interval.
    timeout: Duration,
}
