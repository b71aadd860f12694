//! Frame reassembly on top of a byte stream.
//!
//! [`FrameReader`] accumulates partial reads into complete 17-byte frames and
//! decides how a stream ended: a zero-length read at a frame boundary is an
//! orderly close, one in the middle of a frame is a truncation. A zero-length
//! read never causes another read attempt.
//!
//! [`PacketStream`] turns a reader into a lazy iterator of decoded packets
//! that ends with the stream.
use crate::codec::{decode_packet, FrameDecodeError, PACKET_SIZE};
use crate::packet::Packet;
use std::io::{self, ErrorKind, Read};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("stream closed mid-frame after {received} of 17 bytes")]
    Truncated { received: usize },
    #[error("undecodable frame: {0}")]
    Decode(#[from] FrameDecodeError),
    #[error("timed out waiting for data")]
    Timeout,
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Reassembles frames from `R`.
///
/// The socket read timeout bounds each `read` call. A reader built with
/// [`FrameReader::with_deadline`] also gives up on a frame once the deadline
/// has passed, so a peer sending one byte at a time cannot hold it forever.
pub struct FrameReader<R> {
    inner: R,
    deadline: Option<Instant>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, deadline: None }
    }

    pub fn with_deadline(inner: R, deadline: Instant) -> Self {
        Self { inner, deadline: Some(deadline) }
    }

    /// Read one complete frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream on a frame boundary.
    pub fn read_frame(&mut self) -> Result<Option<[u8; PACKET_SIZE]>, ReceiveError> {
        let mut buf = [0u8; PACKET_SIZE];
        let mut filled = 0usize;
        while filled < PACKET_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(ReceiveError::Truncated { received: filled }),
                Ok(n) => {
                    trace!(bytes = n, filled, "partial read");
                    filled += n;
                    if filled < PACKET_SIZE && self.deadline.is_some_and(|d| Instant::now() >= d) {
                        return Err(ReceiveError::Timeout);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(ReceiveError::Timeout),
                Err(e) => return Err(ReceiveError::Io(e)),
            }
        }
        Ok(Some(buf))
    }

    /// Read and decode exactly one packet, as a resend round expects.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, ReceiveError> {
        match self.read_frame()? {
            Some(frame) => Ok(Some(decode_packet(&frame)?)),
            None => Ok(None),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Lazy, finite sequence of packets read until the peer closes the stream.
///
/// Undecodable frames are yielded as errors and iteration continues with the
/// next frame. Truncation, timeouts and I/O failures are yielded once and
/// finish the stream.
pub struct PacketStream<R> {
    reader: FrameReader<R>,
    frames: u64,
    done: bool,
}

impl<R: Read> PacketStream<R> {
    pub fn new(inner: R) -> Self {
        Self { reader: FrameReader::new(inner), frames: 0, done: false }
    }

    /// Number of complete frames read so far, decodable or not.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<R: Read> Iterator for PacketStream<R> {
    type Item = Result<Packet, ReceiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_frame() {
            Ok(Some(frame)) => {
                self.frames += 1;
                Some(decode_packet(&frame).map_err(ReceiveError::from))
            }
            Ok(None) => {
                debug!(frames = self.frames, "peer closed stream");
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for PacketStream<R> {}
