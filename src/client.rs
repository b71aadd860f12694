//! End-to-end run against the exchange: replay, gap detection, recovery.
use crate::codec::Request;
use crate::config::DEFAULT_ROUND_TRIP_TIMEOUT;
use crate::gaps::{missing_spans, summarize};
use crate::receiver::{PacketStream, ReceiveError};
use crate::recovery::{RecoveryCoordinator, RecoveryReport};
use crate::snapshot::{Snapshot, SnapshotAssembler};
use crate::transport::{send_request, ConnectError, Connector};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Failures that abort a run. Everything else is logged and recorded.
///
/// Only the replay connection can fail a run; once packets are in hand,
/// recovery problems are reported in the outcome instead.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Connection(#[from] ConnectError),
    #[error("sending stream request failed: {0}")]
    Send(#[source] io::Error),
    #[error("connection lost during replay: {0}")]
    Transport(#[source] io::Error),
    #[error("no data received before the read timeout")]
    StreamTimeout,
}

/// Counters describing how a run went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub streamed: usize,
    /// Complete frames that failed to decode or carried a sequence below 1.
    pub dropped_frames: usize,
    pub duplicates: usize,
    /// Whether the replay ended on a partial frame or a timeout.
    pub stream_cut_short: bool,
    pub gaps: u64,
    pub recovered: usize,
    pub unrecovered: u64,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub snapshot: Snapshot,
    pub recovery: RecoveryReport,
    pub stats: RunStats,
}

pub struct AbxClient<C> {
    connector: C,
    round_trip_timeout: Duration,
}

impl<C: Connector> AbxClient<C> {
    pub fn new(connector: C) -> Self {
        Self { connector, round_trip_timeout: DEFAULT_ROUND_TRIP_TIMEOUT }
    }

    /// Bound each resend round as a whole, not just each read.
    pub fn with_round_trip_timeout(mut self, timeout: Duration) -> Self {
        self.round_trip_timeout = timeout;
        self
    }

    pub fn run(&self) -> Result<RunOutcome, ClientError> {
        let mut assembler = SnapshotAssembler::new();
        let mut stats = RunStats::default();
        self.replay(&mut assembler, &mut stats)?;

        let gaps = missing_spans(assembler.sequences());
        let range = summarize(assembler.sequences(), &gaps);
        info!(max = range.max, received = range.received, missing = range.missing, "gap scan");
        stats.gaps = range.missing;

        let recovery = RecoveryCoordinator::new(&self.connector)
            .with_round_trip_timeout(self.round_trip_timeout)
            .recover(&gaps);
        stats.recovered = recovery.recovered.len();
        stats.unrecovered = recovery.unrecovered_count();

        assembler.extend_recovered(recovery.recovered.clone());
        stats.duplicates = assembler.duplicates();
        let snapshot = assembler.finish(recovery.unrecovered_spans());
        info!(
            packets = snapshot.len(),
            recovered = stats.recovered,
            unrecovered = stats.unrecovered,
            "snapshot assembled"
        );
        Ok(RunOutcome { snapshot, recovery, stats })
    }

    /// Drain the full replay into the assembler. The connection is dropped on return.
    fn replay(&self, assembler: &mut SnapshotAssembler, stats: &mut RunStats) -> Result<(), ClientError> {
        let mut stream = self.connector.connect()?;
        send_request(&mut stream, &Request::StreamAll.encode()).map_err(ClientError::Send)?;

        let mut packets = PacketStream::new(stream);
        for item in &mut packets {
            match item {
                Ok(packet) if packet.sequence < 1 => {
                    warn!(sequence = packet.sequence, symbol = %packet.symbol, "dropping packet with non-positive sequence");
                    stats.dropped_frames += 1;
                }
                Ok(packet) => {
                    stats.streamed += 1;
                    assembler.push_streamed(packet);
                }
                Err(ReceiveError::Decode(e)) => {
                    warn!(error = %e, "dropping undecodable frame");
                    stats.dropped_frames += 1;
                }
                Err(ReceiveError::Truncated { received }) => {
                    warn!(received, "replay ended mid-frame, partial frame discarded");
                    stats.stream_cut_short = true;
                }
                Err(ReceiveError::Timeout) if packets_seen(stats) => {
                    warn!(streamed = stats.streamed, "replay stalled, continuing with what arrived");
                    stats.stream_cut_short = true;
                }
                Err(ReceiveError::Timeout) => return Err(ClientError::StreamTimeout),
                Err(ReceiveError::Io(e)) => return Err(ClientError::Transport(e)),
            }
        }
        info!(frames = packets.frames(), streamed = stats.streamed, "replay complete");
        Ok(())
    }
}

fn packets_seen(stats: &RunStats) -> bool {
    stats.streamed + stats.dropped_frames > 0
}
