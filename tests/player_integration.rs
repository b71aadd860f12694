mod common;

use abx_client::capture::{write_capture, write_frame, CaptureFrame, CaptureReader};
use abx_client::export::{write_json, PacketDocument};
use abx_client::gaps::SequenceSpan;
use abx_client::snapshot::Origin;
use abx_client::{AbxClient, TcpConnector};
use common::{frame, frames, MockExchange, Reply, Script};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

#[test]
fn end_to_end_capture_and_export() {
    let ex = MockExchange::start(Script {
        stream_all: Some(Reply::Bytes(frames(&[3, 1, 5]))),
        resend: HashMap::from([(4, Reply::Bytes(frame(4)))]),
        ..Script::default()
    });
    let out = AbxClient::new(TcpConnector::new(&ex.config())).run().unwrap();
    assert_eq!(out.snapshot.sequences(), vec![3, 1, 5, 4]);
    assert_eq!(out.snapshot.unrecovered, vec![SequenceSpan::single(2)]);

    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("run.bin");
    let json = dir.path().join("packets.json");
    write_capture(&capture, "127.0.0.1", &out.snapshot).unwrap();
    write_json(&json, &out.snapshot).unwrap();

    // Read the capture back the way the player does
    let (header, back) = CaptureReader::open(&capture).unwrap().read_snapshot().unwrap();
    assert_eq!(header.upstream, "127.0.0.1");
    assert_eq!(back, out.snapshot);
    let origins: Vec<Origin> = back.entries().iter().map(|(o, _)| *o).collect();
    assert_eq!(origins, vec![Origin::Stream, Origin::Stream, Origin::Stream, Origin::Recovered]);

    let doc: PacketDocument = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    let seqs: Vec<i32> = doc.packet_stream.iter().map(|p| p.sequence).collect();
    assert_eq!(seqs, vec![3, 1, 5, 4]);
}

#[test]
fn sorted_export_is_in_sequence_order() {
    let ex = MockExchange::start(Script {
        stream_all: Some(Reply::Bytes(frames(&[2, 3, 1]))),
        ..Script::default()
    });
    let mut snapshot = AbxClient::new(TcpConnector::new(&ex.config())).run().unwrap().snapshot;
    snapshot.sort_by_sequence();

    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("sorted.json");
    write_json(&json, &snapshot).unwrap();
    let doc: PacketDocument = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    let seqs: Vec<i32> = doc.packet_stream.iter().map(|p| p.sequence).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn truncated_capture_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.bin");
    let mut w = BufWriter::new(File::create(&path).unwrap());
    write_frame(&mut w, &CaptureFrame::Unrecovered { span: SequenceSpan::single(1) }).unwrap();
    w.flush().unwrap();
    drop(w);
    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 2);
    fs::write(&path, bytes).unwrap();

    assert!(CaptureReader::open(&path).unwrap().next_frame().is_err());
}
