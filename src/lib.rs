//! ABX exchange recovery client library.
//!
//! This crate provides the protocol and recovery logic used by the
//! `abx_client` binary and the `player` tool:
//!
//! - `codec`: request frames and the fixed 17-byte packet frame
//! - `receiver`: frame reassembly and the lazy packet stream
//! - `gaps`: missing-sequence detection over `[1, max]`
//! - `recovery`: serial single-packet resend rounds
//! - `snapshot`: arrival-ordered, de-duplicated packet collection
//! - `client`: the full replay → gap scan → recovery run
//! - `export` / `capture`: JSON output and CRC-framed binary captures
pub mod capture;
pub mod client;
pub mod codec;
pub mod config;
pub mod export;
pub mod gaps;
pub mod logging;
pub mod packet;
pub mod receiver;
pub mod recovery;
pub mod snapshot;
pub mod transport;

pub use client::{AbxClient, ClientError, RunOutcome, RunStats};
pub use config::ClientConfig;
pub use packet::{Packet, Side};
pub use snapshot::Snapshot;
pub use transport::{Connector, TcpConnector};
