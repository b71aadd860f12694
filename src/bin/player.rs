use abx_client::capture::CaptureReader;
use abx_client::export::write_json;
use abx_client::gaps::{missing_spans, span_total};
use abx_client::logging;
use abx_client::snapshot::Origin;
use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Play a recorded ABX capture and report its completeness")]
struct Args {
    /// Input file path to read (recorded .bin)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Print every packet as it is read
    #[arg(long, default_value_t = false)]
    dump: bool,

    /// Print packets in sequence order instead of capture order
    #[arg(long, default_value_t = false)]
    sorted: bool,

    /// Re-export the capture as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let mut reader = CaptureReader::open(&args.input)?;
    let (header, mut snapshot) = reader.read_snapshot().with_context(|| format!("read {:?}", args.input))?;
    eprintln!("Header: v{} upstream={} created={}ns", header.version, header.upstream, header.created_unix_ns);

    if args.sorted {
        snapshot.sort_by_sequence();
    }
    if args.dump {
        for (origin, p) in snapshot.entries() {
            let tag = match origin {
                Origin::Stream => "stream",
                Origin::Recovered => "resend",
            };
            println!(
                "seq={:>5} {:<4} {} qty={:>8} price={:>8} [{}]",
                p.sequence,
                p.symbol,
                p.side.as_byte() as char,
                p.quantity,
                p.price,
                tag
            );
        }
    }

    let seqs: HashSet<i32> = snapshot.packets().map(|p| p.sequence).collect();
    let still_missing = missing_spans(&seqs);
    if !still_missing.is_empty() {
        let listed: Vec<String> = still_missing.iter().map(ToString::to_string).collect();
        eprintln!("Missing sequences: {}", listed.join(", "));
    }
    if let Some(path) = &args.json {
        write_json(path, &snapshot)?;
    }
    eprintln!(
        "Read {} packets ({} recovered). Unrecovered at capture time: {}. Missing now: {}.",
        snapshot.len(),
        snapshot.recovered_count(),
        span_total(&snapshot.unrecovered),
        span_total(&still_missing)
    );
    Ok(())
}
