//! Gap repair through single-packet resend requests.
//!
//! Each missing sequence gets one round-trip: open a stream, send the resend
//! frame, read exactly one packet frame. Rounds run strictly one after the
//! other. A round that yields no usable packet leaves the sequence missing
//! and is reported. If the server cannot be reached again, the remaining
//! gaps are given up without further attempts and the run still produces its
//! snapshot.
use crate::codec::{CodecError, Request, MAX_RESEND_SEQUENCE};
use crate::config::DEFAULT_ROUND_TRIP_TIMEOUT;
use crate::gaps::{contiguous_spans, span_total, SequenceSpan};
use crate::packet::Packet;
use crate::receiver::{FrameReader, ReceiveError};
use crate::transport::{send_request, ConnectError, Connector};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a gap could not be filled.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Unaddressable(#[from] CodecError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("recovery stopped after the exchange became unreachable")]
    Abandoned,
    #[error("peer closed without replying")]
    NoReply,
    #[error("timed out waiting for resend reply")]
    Timeout,
    #[error("reply carried sequence {actual}, expected {expected}")]
    SequenceMismatch { expected: i32, actual: i32 },
    #[error("sending resend request failed: {0}")]
    Send(#[source] std::io::Error),
    #[error(transparent)]
    Receive(ReceiveError),
}

impl From<ReceiveError> for RecoveryError {
    fn from(e: ReceiveError) -> Self {
        match e {
            ReceiveError::Timeout => RecoveryError::Timeout,
            other => RecoveryError::Receive(other),
        }
    }
}

/// Sequences that stay missing after recovery, with the reason.
#[derive(Debug)]
pub struct Unrecovered {
    pub span: SequenceSpan,
    pub reason: RecoveryError,
}

#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Recovered packets in ascending sequence order.
    pub recovered: Vec<Packet>,
    pub unrecovered: Vec<Unrecovered>,
}

impl RecoveryReport {
    pub fn unrecovered_spans(&self) -> Vec<SequenceSpan> {
        self.unrecovered.iter().map(|u| u.span).collect()
    }

    /// Number of sequences still missing.
    pub fn unrecovered_count(&self) -> u64 {
        span_total(&self.unrecovered_spans())
    }

    fn give_up(&mut self, span: SequenceSpan, reason: RecoveryError) {
        self.unrecovered.push(Unrecovered { span, reason });
    }
}

pub struct RecoveryCoordinator<'a, C> {
    connector: &'a C,
    round_trip_timeout: Duration,
}

impl<'a, C: Connector> RecoveryCoordinator<'a, C> {
    pub fn new(connector: &'a C) -> Self {
        Self { connector, round_trip_timeout: DEFAULT_ROUND_TRIP_TIMEOUT }
    }

    pub fn with_round_trip_timeout(mut self, timeout: Duration) -> Self {
        self.round_trip_timeout = timeout;
        self
    }

    /// Run one resend round per addressable gap, in ascending order.
    ///
    /// Gaps above the one-byte resend range are reported as they are, with a
    /// single warning and without contacting the server.
    pub fn recover(&self, gaps: &[SequenceSpan]) -> RecoveryReport {
        let mut report = RecoveryReport::default();
        let mut seqs = Vec::new();
        let mut beyond = Vec::new();
        for span in gaps {
            let (low, high) = span.split_at(MAX_RESEND_SEQUENCE);
            if let Some(l) = low {
                seqs.extend(l.iter());
            }
            beyond.extend(high);
        }
        seqs.sort_unstable();
        seqs.dedup();

        for (i, &seq) in seqs.iter().enumerate() {
            match self.recover_one(seq) {
                Ok(packet) => {
                    debug!(sequence = seq, symbol = %packet.symbol, "recovered");
                    report.recovered.push(packet);
                }
                Err(reason @ RecoveryError::Connect(_)) => {
                    warn!(sequence = seq, %reason, "exchange unreachable, stopping recovery");
                    report.give_up(SequenceSpan::single(seq), reason);
                    for span in contiguous_spans(&seqs[i + 1..]) {
                        report.give_up(span, RecoveryError::Abandoned);
                    }
                    break;
                }
                Err(reason) => {
                    warn!(sequence = seq, %reason, "sequence unrecovered");
                    report.give_up(SequenceSpan::single(seq), reason);
                }
            }
        }

        if !beyond.is_empty() {
            beyond.sort_unstable_by_key(|s| s.start);
            warn!(
                spans = beyond.len(),
                sequences = span_total(&beyond),
                first = beyond[0].start,
                "gaps beyond resend range left unrecovered"
            );
            for span in beyond {
                report.give_up(span, CodecError::SequenceOutOfRange(span.start).into());
            }
        }
        info!(
            recovered = report.recovered.len(),
            unrecovered = report.unrecovered_count(),
            "recovery finished"
        );
        report
    }

    fn recover_one(&self, seq: i32) -> Result<Packet, RecoveryError> {
        let request = Request::resend(seq)?;
        let mut stream = self.connector.connect()?;
        send_request(&mut stream, &request.encode()).map_err(RecoveryError::Send)?;
        let deadline = Instant::now() + self.round_trip_timeout;
        let mut reader = FrameReader::with_deadline(stream, deadline);
        match reader.read_packet()? {
            Some(p) if p.sequence == seq => Ok(p),
            Some(p) => Err(RecoveryError::SequenceMismatch { expected: seq, actual: p.sequence }),
            None => Err(RecoveryError::NoReply),
        }
    }
}
