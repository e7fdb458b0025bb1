//! Data blocks and the streaming reader interface shared by sequence and
//! prior sources.

use crate::{Error, Result};

/// One contiguous run of positional data.
///
/// Prior readers fill `value` and cover `count` positions starting at
/// `start`. Sequence readers fill `residues` with a sliding window and use
/// `count` for the number of residues currently held. A block is created
/// once by the consumer and overwritten in place by every `next_block`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBlock {
    start: u64,
    count: usize,
    capacity: usize,
    value: f64,
    residues: Vec<u8>,
}

impl DataBlock {
    /// A block holding a window of `width` residues.
    pub fn sequence(width: usize) -> Self {
        Self {
            start: 0,
            count: 0,
            capacity: width,
            value: f64::NAN,
            residues: Vec::with_capacity(width),
        }
    }

    /// A block holding a single prior value.
    pub fn prior() -> Self {
        Self {
            start: 0,
            count: 0,
            capacity: 1,
            value: f64::NAN,
            residues: Vec::new(),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn set_start(&mut self, start: u64) {
        self.start = start;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    /// Last position covered by the block (`start + count - 1`).
    pub fn end(&self) -> u64 {
        (self.start + self.count as u64).saturating_sub(1)
    }

    pub fn covers(&self, position: u64) -> bool {
        self.count > 0 && self.start <= position && position <= self.end()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    pub fn is_full(&self) -> bool {
        self.residues.len() == self.capacity
    }

    /// Drop the oldest residue to make room for the next one.
    pub fn shift(&mut self) {
        if !self.residues.is_empty() {
            self.residues.remove(0);
        }
        self.count = self.residues.len();
    }

    pub fn push_residue(&mut self, residue: u8) {
        self.residues.push(residue);
        self.count = self.residues.len();
    }

    /// Forget all content, keeping the allocation.
    pub fn clear(&mut self) {
        self.start = 0;
        self.count = 0;
        self.value = f64::NAN;
        self.residues.clear();
    }

    /// Overwrite this block with `other` without reallocating.
    pub fn copy_from(&mut self, other: &DataBlock) {
        self.start = other.start;
        self.count = other.count;
        self.capacity = other.capacity;
        self.value = other.value;
        self.residues.clear();
        self.residues.extend_from_slice(&other.residues);
    }
}

/// Streaming cursor over a positional data source.
///
/// `go_to_next_sequence` must be called before the first `next_block` of
/// every sequence. Within a sequence, blocks arrive in non-decreasing
/// start order. `next_block` returns `Ok(false)` once the current sequence
/// has no complete block left.
pub trait DataBlockReader {
    /// Rewind to the beginning of the source.
    fn reset(&mut self) -> Result<()>;

    fn is_eof(&self) -> bool;

    fn next_block(&mut self, block: &mut DataBlock) -> Result<bool>;

    /// Make the next `next_block` call replay the previous one.
    ///
    /// Only one block can be pushed back at a time; a second call without
    /// an intervening `next_block` fails with [`Error::InvalidState`].
    fn unget_block(&mut self) -> Result<()>;

    fn go_to_next_sequence(&mut self) -> Result<bool>;

    /// Name of the current sequence, if one has been entered.
    fn seq_name(&self) -> Option<&str>;

    /// Release the underlying handle. Further reads fail until `reset`.
    fn close(&mut self);
}

/// A reader whose blocks carry prior probabilities.
pub trait PriorReader: DataBlockReader {
    /// Prior returned for positions without data.
    fn default_prior(&self) -> f64;
}

/// Single-slot pushback used to implement `unget_block`.
#[derive(Debug, Default)]
pub struct Pushback {
    saved: DataBlock,
    saved_result: bool,
    has_saved: bool,
    pending: bool,
}

impl Pushback {
    /// Remember the outcome of the latest `next_block` call.
    pub fn remember(&mut self, block: &DataBlock, result: bool) {
        self.saved.copy_from(block);
        self.saved_result = result;
        self.has_saved = true;
    }

    pub fn unget(&mut self) -> Result<()> {
        if !self.has_saved {
            return Err(Error::InvalidState(
                "no block has been read in this sequence".into(),
            ));
        }
        if self.pending {
            return Err(Error::InvalidState(
                "a block has already been pushed back".into(),
            ));
        }
        self.pending = true;
        Ok(())
    }

    /// If a block was pushed back, copy it into `block` and return the
    /// saved result.
    pub fn replay(&mut self, block: &mut DataBlock) -> Option<bool> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        block.copy_from(&self.saved);
        Some(self.saved_result)
    }

    pub fn clear(&mut self) {
        self.has_saved = false;
        self.pending = false;
    }
}

/// In-memory prior reader over explicit `(start, count, value)` blocks.
pub struct VecPriorReader {
    sequences: Vec<(String, Vec<(u64, usize, f64)>)>,
    default_prior: f64,
    seq_index: Option<usize>,
    block_index: usize,
    pushback: Pushback,
    closed: bool,
}

impl VecPriorReader {
    pub fn new(sequences: Vec<(String, Vec<(u64, usize, f64)>)>, default_prior: f64) -> Self {
        Self {
            sequences,
            default_prior,
            seq_index: None,
            block_index: 0,
            pushback: Pushback::default(),
            closed: false,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("reader is closed".into()));
        }
        Ok(())
    }
}

impl DataBlockReader for VecPriorReader {
    fn reset(&mut self) -> Result<()> {
        self.seq_index = None;
        self.block_index = 0;
        self.pushback.clear();
        self.closed = false;
        Ok(())
    }

    fn is_eof(&self) -> bool {
        match self.seq_index {
            Some(i) => match self.sequences.get(i) {
                Some((_, blocks)) => {
                    i + 1 >= self.sequences.len() && self.block_index >= blocks.len()
                }
                None => true,
            },
            None => self.sequences.is_empty(),
        }
    }

    fn next_block(&mut self, block: &mut DataBlock) -> Result<bool> {
        self.check_open()?;
        if let Some(result) = self.pushback.replay(block) {
            return Ok(result);
        }
        let Some(seq) = self.seq_index else {
            return Err(Error::InvalidState("no current sequence".into()));
        };
        let next = self
            .sequences
            .get(seq)
            .and_then(|(_, blocks)| blocks.get(self.block_index));
        let result = match next {
            Some(&(start, count, value)) => {
                self.block_index += 1;
                block.set_start(start);
                block.set_count(count);
                block.set_value(value);
                true
            }
            None => {
                block.set_count(0);
                false
            }
        };
        self.pushback.remember(block, result);
        Ok(result)
    }

    fn unget_block(&mut self) -> Result<()> {
        self.pushback.unget()
    }

    fn go_to_next_sequence(&mut self) -> Result<bool> {
        self.check_open()?;
        self.pushback.clear();
        let next = self.seq_index.map_or(0, |i| i + 1);
        if next >= self.sequences.len() {
            self.seq_index = Some(self.sequences.len());
            return Ok(false);
        }
        self.seq_index = Some(next);
        self.block_index = 0;
        Ok(true)
    }

    fn seq_name(&self) -> Option<&str> {
        self.seq_index
            .and_then(|i| self.sequences.get(i))
            .map(|(name, _)| name.as_str())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl PriorReader for VecPriorReader {
    fn default_prior(&self) -> f64 {
        self.default_prior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_block_slides() {
        let mut block = DataBlock::sequence(3);
        for &b in b"ACG" {
            block.push_residue(b);
        }
        assert!(block.is_full());
        block.shift();
        block.push_residue(b'T');
        assert_eq!(block.residues(), b"CGT");
        assert_eq!(block.count(), 3);
    }

    #[test]
    fn prior_block_extent() {
        let mut block = DataBlock::prior();
        block.set_start(5);
        block.set_count(5);
        assert_eq!(block.end(), 9);
        assert!(block.covers(5));
        assert!(block.covers(9));
        assert!(!block.covers(10));
        assert!(!block.covers(4));
    }

    #[test]
    fn unget_replays_previous_block() {
        let mut reader = VecPriorReader::new(
            vec![("s1".into(), vec![(1, 2, 0.1), (3, 1, 0.2)])],
            0.5,
        );
        assert!(reader.go_to_next_sequence().unwrap());
        let mut block = DataBlock::prior();
        assert!(reader.next_block(&mut block).unwrap());
        reader.unget_block().unwrap();
        let mut replayed = DataBlock::prior();
        assert!(reader.next_block(&mut replayed).unwrap());
        assert_eq!(replayed.start(), 1);
        assert_eq!(replayed.value(), 0.1);
        assert!(reader.next_block(&mut block).unwrap());
        assert_eq!(block.start(), 3);
        assert!(!reader.next_block(&mut block).unwrap());
    }

    #[test]
    fn double_unget_is_rejected() {
        let mut reader = VecPriorReader::new(vec![("s1".into(), vec![(1, 1, 0.1)])], 0.5);
        reader.go_to_next_sequence().unwrap();
        assert!(matches!(reader.unget_block(), Err(Error::InvalidState(_))));
        let mut block = DataBlock::prior();
        reader.next_block(&mut block).unwrap();
        reader.unget_block().unwrap();
        assert!(matches!(reader.unget_block(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn closed_reader_refuses_reads_until_reset() {
        let mut reader = VecPriorReader::new(vec![("s1".into(), vec![(1, 1, 0.1)])], 0.5);
        reader.close();
        assert!(reader.go_to_next_sequence().is_err());
        reader.reset().unwrap();
        assert!(reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.seq_name(), Some("s1"));
    }
}
