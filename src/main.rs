use abx_client::capture::write_capture;
use abx_client::export::write_json;
use abx_client::{logging, AbxClient, ClientConfig, TcpConnector};
use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(version, about = "ABX exchange replay and gap recovery client")]
struct Args {
    /// Exchange host
    #[arg(long, env = "ABX_HOST", default_value = "localhost")]
    host: String,

    /// Exchange port
    #[arg(long, env = "ABX_PORT", default_value_t = 3000)]
    port: u16,

    /// Connect timeout in milliseconds
    #[arg(long, env = "ABX_CONNECT_TIMEOUT_MS", default_value_t = 5000)]
    connect_timeout_ms: u64,

    /// Per-read timeout in milliseconds
    #[arg(long, env = "ABX_READ_TIMEOUT_MS", default_value_t = 5000)]
    read_timeout_ms: u64,

    /// Timeout for a whole resend round in milliseconds
    #[arg(long, env = "ABX_ROUND_TRIP_TIMEOUT_MS", default_value_t = 10000)]
    round_trip_timeout_ms: u64,

    /// Output JSON path
    #[arg(long, env = "OUT_FILE", default_value = "packets.json")]
    out: PathBuf,

    /// Also write a binary capture of the run (.bin)
    #[arg(long, env = "CAPTURE_FILE")]
    capture: Option<PathBuf>,

    /// Sort the snapshot by sequence before writing
    #[arg(long, default_value_t = false)]
    sorted: bool,
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    logging::init();
    let args = Args::parse();

    let config = ClientConfig::new(args.host.clone(), args.port)
        .with_connect_timeout(Duration::from_millis(args.connect_timeout_ms))
        .with_read_timeout(Duration::from_millis(args.read_timeout_ms))
        .with_round_trip_timeout(Duration::from_millis(args.round_trip_timeout_ms));
    info!(upstream = %config.address(), "starting run");

    let client = AbxClient::new(TcpConnector::new(&config)).with_round_trip_timeout(config.round_trip_timeout);
    let outcome = client.run().with_context(|| format!("run against {}", config.address()))?;

    let mut snapshot = outcome.snapshot;
    if args.sorted {
        snapshot.sort_by_sequence();
    }
    if outcome.stats.unrecovered > 0 {
        warn!(
            sequences = outcome.stats.unrecovered,
            spans = snapshot.unrecovered.len(),
            "snapshot is incomplete"
        );
    }

    write_json(&args.out, &snapshot)?;
    if let Some(path) = &args.capture {
        write_capture(path, &config.address(), &snapshot).with_context(|| "write capture")?;
    }

    let s = &outcome.stats;
    info!(
        packets = snapshot.len(),
        streamed = s.streamed,
        dropped = s.dropped_frames,
        gaps = s.gaps,
        recovered = s.recovered,
        unrecovered = s.unrecovered,
        "data saved to {}",
        args.out.display()
    );
    Ok(())
}
