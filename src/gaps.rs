//! Sequence gap detection.
//!
//! Gaps are kept as inclusive [`SequenceSpan`]s so a single stray sequence
//! near `i32::MAX` costs one entry, not two billion.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;

/// Inclusive run of sequence numbers, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceSpan {
    pub start: i32,
    pub end: i32,
}

impl SequenceSpan {
    pub fn new(start: i32, end: i32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn single(seq: i32) -> Self {
        Self { start: seq, end: seq }
    }

    pub fn len(&self) -> u64 {
        (i64::from(self.end) - i64::from(self.start) + 1) as u64
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Split into the part at or below `limit` and the part above it.
    pub fn split_at(self, limit: i32) -> (Option<Self>, Option<Self>) {
        if self.end <= limit {
            (Some(self), None)
        } else if self.start > limit {
            (None, Some(self))
        } else {
            (Some(Self::new(self.start, limit)), Some(Self::new(limit + 1, self.end)))
        }
    }
}

impl fmt::Display for SequenceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..={}", self.start, self.end)
        }
    }
}

/// Total number of sequences covered by `spans`.
pub fn span_total(spans: &[SequenceSpan]) -> u64 {
    spans.iter().map(SequenceSpan::len).sum()
}

/// Coalesce ascending, de-duplicated sequences into runs.
pub fn contiguous_spans(sorted: &[i32]) -> Vec<SequenceSpan> {
    let mut out: Vec<SequenceSpan> = Vec::new();
    for &s in sorted {
        match out.last_mut() {
            Some(last) if last.end.checked_add(1) == Some(s) => last.end = s,
            _ => out.push(SequenceSpan::single(s)),
        }
    }
    out
}

/// Summary of the observed sequence range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceRange {
    /// Highest sequence received, 0 when nothing was received.
    pub max: i32,
    pub received: usize,
    pub missing: u64,
}

/// Sequences in `[1, max(received)]` that were never received, ascending.
///
/// Runs in time linear in the maximum sequence. Values below 1 are outside
/// the expected range and are ignored.
pub fn missing_sequences(received: &HashSet<i32>) -> Vec<i32> {
    let max = received.iter().copied().max().unwrap_or(0);
    if max < 1 {
        return Vec::new();
    }
    let mut seen = vec![false; max as usize + 1];
    for &s in received {
        if s >= 1 {
            seen[s as usize] = true;
        }
    }
    (1..=max).filter(|&s| !seen[s as usize]).collect()
}

/// Same gaps as [`missing_sequences`], as ascending spans.
///
/// Cost depends on how many sequences were received, not on their maximum.
pub fn missing_spans(received: &HashSet<i32>) -> Vec<SequenceSpan> {
    let mut seen: Vec<i32> = received.iter().copied().filter(|&s| s >= 1).collect();
    seen.sort_unstable();
    let mut out = Vec::new();
    let mut next = 1i32;
    for s in seen {
        if s > next {
            out.push(SequenceSpan::new(next, s - 1));
        }
        next = s.saturating_add(1);
    }
    out
}

pub fn summarize(received: &HashSet<i32>, missing: &[SequenceSpan]) -> SequenceRange {
    SequenceRange {
        max: received.iter().copied().max().unwrap_or(0).max(0),
        received: received.len(),
        missing: span_total(missing),
    }
}
