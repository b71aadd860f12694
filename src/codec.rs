//! Wire codec for the ABX exchange protocol.
//!
//! Requests are one or two bytes: a call type followed, for resends, by the
//! target sequence. Responses are fixed 17-byte packet frames:
//!
//! `[symbol:4 ASCII][side:1 'B'|'S'][quantity:i32 BE][price:i32 BE][sequence:i32 BE]`
//!
//! The resend request addresses its target with a single byte, so only
//! sequences `1..=255` can be requested again. Packets above that are still
//! decoded normally; they just cannot be recovered with this request format.
use crate::packet::{Packet, Side};
use thiserror::Error;

/// Size of every packet frame sent by the server.
pub const PACKET_SIZE: usize = 17;
/// Width of the space-padded symbol field.
pub const SYMBOL_LEN: usize = 4;
/// Highest sequence a resend request can address.
pub const MAX_RESEND_SEQUENCE: i32 = u8::MAX as i32;

const CALL_STREAM_ALL: u8 = 1;
const CALL_RESEND_PACKET: u8 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("packet frame too short: expected 17 bytes, got {0}")]
    Length(usize),
    #[error("invalid side byte {0:#04x}")]
    InvalidSide(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("sequence {0} cannot be addressed by a resend request (1..=255)")]
    SequenceOutOfRange(i32),
    #[error("symbol {0:?} does not fit a 4-byte ASCII field")]
    SymbolTooWide(String),
}

/// Outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Replay the whole packet stream from the beginning.
    StreamAll,
    /// Resend the single packet with this sequence.
    ResendPacket(u8),
}

impl Request {
    /// Build a resend request, rejecting sequences the one-byte field cannot carry.
    pub fn resend(sequence: i32) -> Result<Self, CodecError> {
        if !(1..=MAX_RESEND_SEQUENCE).contains(&sequence) {
            return Err(CodecError::SequenceOutOfRange(sequence));
        }
        Ok(Request::ResendPacket(sequence as u8))
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Request::StreamAll => encode_stream_all().to_vec(),
            Request::ResendPacket(seq) => encode_resend(seq).to_vec(),
        }
    }
}

pub fn encode_stream_all() -> [u8; 1] {
    [CALL_STREAM_ALL]
}

pub fn encode_resend(sequence: u8) -> [u8; 2] {
    [CALL_RESEND_PACKET, sequence]
}

/// Decode one packet frame. Bytes past the first 17 are ignored.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, FrameDecodeError> {
    if bytes.len() < PACKET_SIZE {
        return Err(FrameDecodeError::Length(bytes.len()));
    }
    let read_i32 = |o: usize| -> i32 {
        let mut tmp = [0u8; 4];
        tmp.copy_from_slice(&bytes[o..o + 4]);
        i32::from_be_bytes(tmp)
    };

    // non-ASCII bytes become '?', the packet is kept
    let symbol: String = bytes[..SYMBOL_LEN]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();
    let symbol = symbol.trim().to_string();
    let side = Side::from_byte(bytes[4]).ok_or(FrameDecodeError::InvalidSide(bytes[4]))?;

    Ok(Packet {
        symbol,
        side,
        quantity: read_i32(5),
        price: read_i32(9),
        sequence: read_i32(13),
    })
}

/// Encode a packet the way the server frames it. Used to synthesize feeds.
pub fn encode_packet(packet: &Packet) -> Result<[u8; PACKET_SIZE], CodecError> {
    let symbol = packet.symbol.as_bytes();
    if symbol.len() > SYMBOL_LEN || !symbol.is_ascii() {
        return Err(CodecError::SymbolTooWide(packet.symbol.clone()));
    }
    let mut out = [b' '; PACKET_SIZE];
    out[..symbol.len()].copy_from_slice(symbol);
    out[4] = packet.side.as_byte();
    out[5..9].copy_from_slice(&packet.quantity.to_be_bytes());
    out[9..13].copy_from_slice(&packet.price.to_be_bytes());
    out[13..17].copy_from_slice(&packet.sequence.to_be_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frames() {
        assert_eq!(encode_stream_all(), [0x01]);
        assert_eq!(encode_resend(3), [0x02, 0x03]);
        assert_eq!(Request::StreamAll.encode(), vec![0x01]);
        assert_eq!(Request::resend(255).unwrap().encode(), vec![0x02, 0xff]);
    }

    #[test]
    fn resend_rejects_unaddressable_sequences() {
        assert_eq!(Request::resend(256), Err(CodecError::SequenceOutOfRange(256)));
        assert_eq!(Request::resend(0), Err(CodecError::SequenceOutOfRange(0)));
        assert_eq!(Request::resend(-4), Err(CodecError::SequenceOutOfRange(-4)));
    }

    #[test]
    fn decode_known_frame() {
        let mut frame = Vec::new();
        frame.extend_from_slice(b"MSFT");
        frame.push(b'S');
        frame.extend_from_slice(&50i32.to_be_bytes());
        frame.extend_from_slice(&(-12i32).to_be_bytes());
        frame.extend_from_slice(&300i32.to_be_bytes());
        let p = decode_packet(&frame).unwrap();
        assert_eq!(p, Packet::new("MSFT", Side::Sell, 50, -12, 300));
    }

    #[test]
    fn decode_trims_symbol_padding() {
        let frame = encode_packet(&Packet::new("GS", Side::Buy, 1, 2, 3)).unwrap();
        assert_eq!(&frame[..4], b"GS  ");
        assert_eq!(decode_packet(&frame).unwrap().symbol, "GS");
    }

    #[test]
    fn decode_errors() {
        let mut frame = encode_packet(&Packet::new("AAPL", Side::Buy, 1, 2, 3)).unwrap();
        assert_eq!(decode_packet(&frame[..16]), Err(FrameDecodeError::Length(16)));
        frame[4] = b'X';
        assert_eq!(decode_packet(&frame), Err(FrameDecodeError::InvalidSide(b'X')));
    }

    #[test]
    fn non_ascii_symbol_is_kept_lossily() {
        let mut frame = encode_packet(&Packet::new("AAPL", Side::Buy, 1, 2, 3)).unwrap();
        frame[0] = 0xc3;
        frame[3] = 0xff;
        let p = decode_packet(&frame).unwrap();
        assert_eq!(p.symbol, "?AP?");
        assert_eq!(p.sequence, 3);
    }

    #[test]
    fn synthetic_frames_decode_back() {
        let packets = [
            Packet::new("AAPL", Side::Buy, 100, 1_500, 1),
            Packet::new("A", Side::Sell, i32::MAX, i32::MIN, 255),
            Packet::new("", Side::Buy, 0, 0, 70_000),
        ];
        for p in &packets {
            let frame = encode_packet(p).unwrap();
            assert_eq!(&decode_packet(&frame).unwrap(), p);
        }
    }

    #[test]
    fn encode_rejects_wide_symbol() {
        let p = Packet::new("GOOGL", Side::Buy, 1, 1, 1);
        assert_eq!(encode_packet(&p), Err(CodecError::SymbolTooWide("GOOGL".into())));
    }
}
