//! Aligning prior blocks with sequence positions.

use std::path::Path;

use tracing::debug;

use crate::block::{DataBlock, PriorReader};
use crate::io::TextSource;
use crate::psp::PriorReaderFromPsp;
use crate::wiggle::PriorReaderFromWig;
use crate::{Error, Result};

pub mod build;
pub mod dist;

pub use dist::PriorDist;

/// Open a prior file, choosing the wiggle reader for `.wig` (or `.wig.gz`)
/// names and the PSP reader otherwise.
pub fn open_prior_reader(
    path: &Path,
    parse_genomic_coord: bool,
    default_prior: f64,
) -> Result<Box<dyn PriorReader>> {
    let source = TextSource::from_arg(path);
    let name = path.to_string_lossy();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".wig") {
        Ok(Box::new(PriorReaderFromWig::new(source, default_prior)?))
    } else {
        Ok(Box::new(PriorReaderFromPsp::new(
            source,
            parse_genomic_coord,
            default_prior,
        )?))
    }
}

/// Per-sequence cursor for incremental prior lookups.
///
/// Query positions must be non-decreasing within a sequence; the cursor
/// only ever moves forward through the reader's blocks. Create a fresh
/// cursor (or call [`PriorCursor::clear`]) for every sequence.
#[derive(Debug, Default)]
pub struct PriorCursor {
    block: Option<DataBlock>,
    exhausted: bool,
}

impl PriorCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.block = None;
        self.exhausted = false;
    }

    /// Prior for `position` of sequence `seq_name`.
    pub fn prior_at(
        &mut self,
        reader: &mut dyn PriorReader,
        seq_name: &str,
        position: u64,
    ) -> Result<f64> {
        let default = reader.default_prior();
        let block = match &mut self.block {
            Some(block) => block,
            slot @ None => {
                let mut block = DataBlock::prior();
                if !reader.next_block(&mut block)? {
                    return Err(Error::PriorData(format!(
                        "failed to read first prior for sequence {seq_name}"
                    )));
                }
                slot.insert(block)
            }
        };

        if position < block.start() {
            return Ok(default);
        }
        if block.covers(position) {
            return Ok(block.value());
        }
        if self.exhausted {
            return Ok(default);
        }
        while reader.next_block(block)? {
            if position < block.start() {
                return Ok(default);
            }
            if block.covers(position) {
                return Ok(block.value());
            }
        }
        self.exhausted = true;
        debug!("reached end of priors for sequence {seq_name}");
        Ok(default)
    }
}

/// Fill `out` with the priors for positions `seq_start..seq_start + out.len()`.
///
/// Positions without data get the reader's default prior. The last block
/// read is pushed back when it reaches past the requested range, so a
/// following call for a later range still sees it.
pub fn fill_prior_array(
    reader: &mut dyn PriorReader,
    seq_name: &str,
    seq_start: u64,
    out: &mut [f64],
) -> Result<()> {
    match reader.seq_name() {
        Some(name) if name == seq_name => {}
        other => {
            return Err(Error::SequenceMismatch(format!(
                "prior reader is on sequence {} but priors were requested for {seq_name}",
                other.unwrap_or("<none>")
            )));
        }
    }
    out.fill(reader.default_prior());
    if out.is_empty() {
        return Ok(());
    }
    let seq_last = seq_start + out.len() as u64 - 1;

    let mut block = DataBlock::prior();
    while reader.next_block(&mut block)? {
        if block.count() == 0 || block.end() < seq_start {
            continue;
        }
        let first = block.start().max(seq_start);
        let last = block.end().min(seq_last);
        if first <= last {
            let from = (first - seq_start) as usize;
            let to = (last - seq_start) as usize;
            out[from..=to].fill(block.value());
        }
        if block.end() > seq_last {
            reader.unget_block()?;
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{DataBlockReader, VecPriorReader};

    fn reader(blocks: Vec<(u64, usize, f64)>) -> VecPriorReader {
        let mut r = VecPriorReader::new(vec![("s".into(), blocks)], -1.0);
        r.go_to_next_sequence().unwrap();
        r
    }

    #[test]
    fn queries_before_and_between_blocks_get_default() {
        let mut r = reader(vec![(3, 2, 0.4), (8, 1, 0.9)]);
        let mut cursor = PriorCursor::new();
        let got: Vec<f64> = [1, 3, 4, 5, 8, 9]
            .iter()
            .map(|&p| cursor.prior_at(&mut r, "s", p).unwrap())
            .collect();
        assert_eq!(got, vec![-1.0, 0.4, 0.4, -1.0, 0.9, -1.0]);
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let mut r = reader(vec![]);
        let mut cursor = PriorCursor::new();
        assert!(matches!(
            cursor.prior_at(&mut r, "s", 1),
            Err(Error::PriorData(_))
        ));
    }

    #[test]
    fn fill_clips_and_pushes_back_overhang() {
        let mut r = reader(vec![(0, 3, 0.1), (4, 4, 0.2), (10, 2, 0.3)]);
        let mut first = vec![0.0; 6];
        fill_prior_array(&mut r, "s", 0, &mut first).unwrap();
        assert_eq!(first, vec![0.1, 0.1, 0.1, -1.0, 0.2, 0.2]);
        let mut second = vec![0.0; 6];
        fill_prior_array(&mut r, "s", 6, &mut second).unwrap();
        assert_eq!(second, vec![0.2, 0.2, -1.0, -1.0, 0.3, 0.3]);
    }

    #[test]
    fn fill_rejects_wrong_sequence() {
        let mut r = reader(vec![(0, 1, 0.5)]);
        let mut out = vec![0.0; 2];
        assert!(matches!(
            fill_prior_array(&mut r, "other", 0, &mut out),
            Err(Error::SequenceMismatch(_))
        ));
    }

    #[test]
    fn wig_suffix_selects_wiggle_reader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p.wig");
        std::fs::write(&path, "variableStep chrom=s\n2 0.5\n").expect("write wig");
        let mut r = open_prior_reader(&path, false, 0.1).expect("open wig");
        assert!(r.go_to_next_sequence().unwrap());
        assert_eq!(r.seq_name(), Some("s"));
        let mut cursor = PriorCursor::new();
        assert_eq!(cursor.prior_at(r.as_mut(), "s", 2).unwrap(), 0.5);
    }
}
