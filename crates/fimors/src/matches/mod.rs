//! Motif matches and the bounded store that keeps the best of them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
    /// Protein scans have no strand.
    Unstranded,
}

impl Strand {
    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unstranded => '.',
        }
    }
}

/// One scored motif site.
///
/// For reverse strand matches `start` is the larger coordinate and
/// `sequence` is the reverse complement of the scanned window.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub motif_id: String,
    pub seq_name: String,
    pub sequence: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
    pub score: f64,
    pub pvalue: f64,
    pub qvalue: f64,
}

impl MatchRecord {
    pub fn low(&self) -> u64 {
        self.start.min(self.stop)
    }

    pub fn high(&self) -> u64 {
        self.start.max(self.stop)
    }
}

struct Entry {
    serial: u64,
    record: MatchRecord,
}

// Max-heap on p-value; among equal p-values the latest arrival is evicted
// first.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record
            .pvalue
            .total_cmp(&other.record.pvalue)
            .then(self.serial.cmp(&other.serial))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Keeps at most `capacity` matches with the smallest p-values.
pub struct MatchStore {
    capacity: usize,
    threshold: f64,
    heap: BinaryHeap<Entry>,
    next_serial: u64,
    dropped: bool,
}

impl MatchStore {
    pub fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            capacity,
            threshold,
            heap: BinaryHeap::with_capacity(capacity.min(1 << 16)),
            next_serial: 0,
            dropped: false,
        }
    }

    /// Offer a match. Returns whether it was stored.
    pub fn offer(&mut self, record: MatchRecord) -> bool {
        let serial = self.next_serial;
        self.next_serial += 1;
        if self.heap.len() < self.capacity {
            self.heap.push(Entry { serial, record });
            return true;
        }
        self.dropped = true;
        let improves = self
            .heap
            .peek()
            .is_some_and(|worst| record.pvalue < worst.record.pvalue);
        if improves {
            self.heap.pop();
            self.heap.push(Entry { serial, record });
        }
        improves
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.dropped
    }

    /// Worst p-value still held once matches were dropped, otherwise the
    /// configured threshold.
    pub fn max_pvalue_retained(&self) -> f64 {
        if self.dropped {
            self.heap
                .peek()
                .map_or(self.threshold, |worst| worst.record.pvalue)
        } else {
            self.threshold
        }
    }

    /// Retained matches in the order they were offered.
    pub fn finish(self) -> Vec<MatchRecord> {
        let mut entries = self.heap.into_vec();
        entries.sort_by_key(|entry| entry.serial);
        entries.into_iter().map(|entry| entry.record).collect()
    }
}
