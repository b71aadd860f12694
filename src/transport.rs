//! Connection establishment.
//!
//! The exchange closes its side after answering each request, so the client
//! asks a [`Connector`] for a fresh stream per round-trip. Streams are owned
//! values and close when dropped.
use crate::config::ClientConfig;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("cannot connect to {addr}: {source}")]
pub struct ConnectError {
    pub addr: String,
    #[source]
    pub source: io::Error,
}

/// Opens byte streams to the upstream feed.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&self) -> Result<Self::Stream, ConnectError>;
}

/// TCP connector with bounded connect and read waits.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpConnector {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            addr: config.address(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
        }
    }

    fn open(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for sa in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&sa, self.connect_timeout) {
                Ok(s) => {
                    s.set_read_timeout(Some(self.read_timeout))?;
                    s.set_write_timeout(Some(self.read_timeout))?;
                    s.set_nodelay(true)?;
                    debug!(peer = %sa, "connected");
                    return Ok(s);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")))
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> Result<TcpStream, ConnectError> {
        self.open().map_err(|source| ConnectError { addr: self.addr.clone(), source })
    }
}

/// Write a whole request frame and flush it.
pub fn send_request<W: Write>(stream: &mut W, frame: &[u8]) -> io::Result<()> {
    stream.write_all(frame)?;
    stream.flush()
}
