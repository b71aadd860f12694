//! Final packet collection of a run.
//!
//! Streamed packets keep their arrival order and recovered packets are
//! appended after them in ascending sequence order. The result is therefore
//! not globally sorted; call [`Snapshot::sort_by_sequence`] when the consumer
//! needs total order.
use crate::gaps::SequenceSpan;
use crate::packet::Packet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Where a packet in the snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Stream,
    Recovered,
}

#[derive(Debug, Default)]
pub struct SnapshotAssembler {
    packets: Vec<(Origin, Packet)>,
    sequences: HashSet<i32>,
    duplicates: usize,
}

impl SnapshotAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a packet from the initial stream. Returns false for a repeated sequence.
    pub fn push_streamed(&mut self, packet: Packet) -> bool {
        self.push(Origin::Stream, packet)
    }

    /// Append recovered packets, ascending by sequence.
    pub fn extend_recovered(&mut self, mut recovered: Vec<Packet>) {
        recovered.sort_by_key(|p| p.sequence);
        for p in recovered {
            self.push(Origin::Recovered, p);
        }
    }

    fn push(&mut self, origin: Origin, packet: Packet) -> bool {
        if !self.sequences.insert(packet.sequence) {
            warn!(sequence = packet.sequence, ?origin, "duplicate sequence dropped");
            self.duplicates += 1;
            return false;
        }
        self.packets.push((origin, packet));
        true
    }

    /// Distinct sequences collected so far.
    pub fn sequences(&self) -> &HashSet<i32> {
        &self.sequences
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn finish(self, unrecovered: Vec<SequenceSpan>) -> Snapshot {
        Snapshot { entries: self.packets, unrecovered }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    entries: Vec<(Origin, Packet)>,
    /// Sequences that stayed missing after recovery, ascending by start.
    pub unrecovered: Vec<SequenceSpan>,
}

impl Snapshot {
    pub fn packets(&self) -> impl Iterator<Item = &Packet> {
        self.entries.iter().map(|(_, p)| p)
    }

    pub fn entries(&self) -> &[(Origin, Packet)] {
        &self.entries
    }

    pub fn sequences(&self) -> Vec<i32> {
        self.packets().map(|p| p.sequence).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn recovered_count(&self) -> usize {
        self.entries.iter().filter(|(o, _)| *o == Origin::Recovered).count()
    }

    /// Reorder the whole collection by sequence.
    pub fn sort_by_sequence(&mut self) {
        self.entries.sort_by_key(|(_, p)| p.sequence);
    }

    /// Rebuild from stored entries, e.g. when reading a capture back.
    pub fn from_entries(entries: Vec<(Origin, Packet)>, unrecovered: Vec<SequenceSpan>) -> Self {
        Self { entries, unrecovered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Side;

    fn p(seq: i32) -> Packet {
        Packet::new("AAPL", Side::Buy, 1, 1, seq)
    }

    #[test]
    fn streamed_first_then_recovered_ascending() {
        let mut a = SnapshotAssembler::new();
        for s in [1, 2, 6, 4] {
            a.push_streamed(p(s));
        }
        a.extend_recovered(vec![p(5), p(3)]);
        let snap = a.finish(vec![]);
        assert_eq!(snap.sequences(), vec![1, 2, 6, 4, 3, 5]);
        assert_eq!(snap.recovered_count(), 2);
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut a = SnapshotAssembler::new();
        assert!(a.push_streamed(p(1)));
        assert!(!a.push_streamed(p(1)));
        a.extend_recovered(vec![p(1), p(2)]);
        assert_eq!(a.duplicates(), 2);
        let snap = a.finish(vec![]);
        assert_eq!(snap.sequences(), vec![1, 2]);
        let max = *snap.sequences().iter().max().unwrap();
        assert!(snap.len() <= max as usize);
    }

    #[test]
    fn sort_is_opt_in() {
        let mut a = SnapshotAssembler::new();
        for s in [1, 3, 2] {
            a.push_streamed(p(s));
        }
        let mut snap = a.finish(vec![SequenceSpan::single(7)]);
        assert_eq!(snap.sequences(), vec![1, 3, 2]);
        snap.sort_by_sequence();
        assert_eq!(snap.sequences(), vec![1, 2, 3]);
        assert_eq!(snap.unrecovered, vec![SequenceSpan::single(7)]);
    }
}
