//! Packet data model for the ABX exchange feed.
use serde::{Deserialize, Serialize};

/// Order side, carried on the wire as a single ASCII byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "S")]
    Sell,
}

impl Side {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'B' => Some(Side::Buy),
            b'S' => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Side::Buy => b'B',
            Side::Sell => b'S',
        }
    }
}

/// One market event as decoded from a 17-byte response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Ticker symbol, trailing padding removed.
    pub symbol: String,
    pub side: Side,
    pub quantity: i32,
    pub price: i32,
    /// Server-assigned, starts at 1, unique per packet.
    pub sequence: i32,
}

impl Packet {
    pub fn new(symbol: impl Into<String>, side: Side, quantity: i32, price: i32, sequence: i32) -> Self {
        Self { symbol: symbol.into(), side, quantity, price, sequence }
    }
}
