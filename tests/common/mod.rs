//! Scripted ABX exchange on a loopback socket.
#![allow(dead_code)]

use abx_client::codec::encode_packet;
use abx_client::{ClientConfig, Packet, Side};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How the exchange answers one kind of request.
#[derive(Clone)]
pub enum Reply {
    /// Write these bytes (in small chunks) and close.
    Bytes(Vec<u8>),
    /// Keep the connection open without writing, then close.
    Stall(Duration),
    /// Write these bytes one at a time with a pause before each.
    Trickle(Vec<u8>, Duration),
}

#[derive(Clone, Default)]
pub struct Script {
    pub stream_all: Option<Reply>,
    pub resend: HashMap<u8, Reply>,
    /// Stop listening once this many connections were accepted.
    pub max_connections: Option<usize>,
}

pub struct MockExchange {
    pub port: u16,
    pub requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockExchange {
    pub fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        thread::spawn(move || {
            let mut listener = Some(listener);
            let mut accepted = 0;
            while let Some(l) = &listener {
                let Ok((conn, _)) = l.accept() else { break };
                accepted += 1;
                // close the port before replying so later connects are refused
                if script.max_connections.is_some_and(|n| accepted >= n) {
                    listener = None;
                }
                serve(conn, &script, &log);
            }
        });
        Self { port, requests }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", self.port)
            .with_read_timeout(Duration::from_millis(300))
            .with_connect_timeout(Duration::from_secs(2))
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve(mut conn: TcpStream, script: &Script, log: &Mutex<Vec<Vec<u8>>>) {
    let mut call = [0u8; 1];
    if conn.read_exact(&mut call).is_err() {
        return;
    }
    let reply = match call[0] {
        1 => {
            log.lock().unwrap().push(vec![1]);
            script.stream_all.clone()
        }
        2 => {
            let mut seq = [0u8; 1];
            if conn.read_exact(&mut seq).is_err() {
                return;
            }
            log.lock().unwrap().push(vec![2, seq[0]]);
            script.resend.get(&seq[0]).cloned()
        }
        _ => None,
    };
    match reply {
        Some(Reply::Bytes(bytes)) => {
            for chunk in bytes.chunks(7) {
                if conn.write_all(chunk).is_err() {
                    return;
                }
                let _ = conn.flush();
            }
        }
        Some(Reply::Stall(d)) => thread::sleep(d),
        Some(Reply::Trickle(bytes, pause)) => {
            for b in bytes {
                thread::sleep(pause);
                if conn.write_all(&[b]).is_err() {
                    return;
                }
            }
        }
        None => {}
    }
}

pub fn packet(seq: i32) -> Packet {
    let side = if seq % 2 == 0 { Side::Sell } else { Side::Buy };
    Packet::new("AAPL", side, 10 * seq, 100 + seq, seq)
}

pub fn frame(seq: i32) -> Vec<u8> {
    encode_packet(&packet(seq)).unwrap().to_vec()
}

pub fn frames(seqs: &[i32]) -> Vec<u8> {
    seqs.iter().flat_map(|&s| frame(s)).collect()
}
