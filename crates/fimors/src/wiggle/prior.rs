use crate::Result;
use crate::block::{DataBlock, DataBlockReader, PriorReader, Pushback};
use crate::io::TextSource;

use super::WiggleReader;

/// Prior reader over a wiggle track; each value line becomes one block
/// covering `span` positions.
///
/// Consecutive declarations for the same chromosome are read as a single
/// sequence.
pub struct PriorReaderFromWig {
    raw: WiggleReader,
    default_prior: f64,
    name: Option<String>,
    // Set when next_block already consumed the declaration of the next
    // chromosome.
    entered_next: bool,
    pushback: Pushback,
}

impl PriorReaderFromWig {
    pub fn new(source: TextSource, default_prior: f64) -> Result<Self> {
        Ok(Self {
            raw: WiggleReader::new(source)?,
            default_prior,
            name: None,
            entered_next: false,
            pushback: Pushback::default(),
        })
    }

    fn current_chrom(&self) -> Option<String> {
        self.raw.declaration().map(|d| d.chrom.clone())
    }
}

impl DataBlockReader for PriorReaderFromWig {
    fn reset(&mut self) -> Result<()> {
        self.raw.reset()?;
        self.name = None;
        self.entered_next = false;
        self.pushback.clear();
        Ok(())
    }

    fn is_eof(&self) -> bool {
        self.raw.is_eof()
    }

    fn next_block(&mut self, block: &mut DataBlock) -> Result<bool> {
        if let Some(result) = self.pushback.replay(block) {
            return Ok(result);
        }
        let mut result = false;
        while !self.entered_next {
            if let Some(record) = self.raw.next_record()? {
                block.set_start(record.start);
                block.set_count(record.span as usize);
                block.set_value(record.value);
                result = true;
                break;
            }
            if !self.raw.next_declaration()? {
                break;
            }
            if self.current_chrom() != self.name {
                self.entered_next = true;
            }
        }
        if !result {
            block.set_count(0);
        }
        self.pushback.remember(block, result);
        Ok(result)
    }

    fn unget_block(&mut self) -> Result<()> {
        self.pushback.unget()
    }

    fn go_to_next_sequence(&mut self) -> Result<bool> {
        self.pushback.clear();
        if self.entered_next {
            self.entered_next = false;
            self.name = self.current_chrom();
            return Ok(true);
        }
        loop {
            if !self.raw.next_declaration()? {
                self.name = None;
                return Ok(false);
            }
            let chrom = self.current_chrom();
            if chrom != self.name {
                self.name = chrom;
                return Ok(true);
            }
        }
    }

    fn seq_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn close(&mut self) {
        self.raw.close();
    }
}

impl PriorReader for PriorReaderFromWig {
    fn default_prior(&self) -> f64 {
        self.default_prior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(reader: &mut PriorReaderFromWig) -> Vec<(u64, usize, f64)> {
        let mut block = DataBlock::prior();
        let mut out = Vec::new();
        while reader.next_block(&mut block).unwrap() {
            out.push((block.start(), block.count(), block.value()));
        }
        out
    }

    #[test]
    fn sequences_follow_chromosome_changes() {
        let text = "fixedStep chrom=chr1 start=1 step=10 span=5\n0.1\n0.2\n\
fixedStep chrom=chr1 start=101 step=1\n0.3\n\
variableStep chrom=chr2 span=3\n7 0.4\n";
        let mut reader =
            PriorReaderFromWig::new(TextSource::memory("p.wig", text.as_bytes().to_vec()), 0.01)
                .unwrap();
        assert!(reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.seq_name(), Some("chr1"));
        assert_eq!(
            blocks(&mut reader),
            vec![(1, 5, 0.1), (11, 5, 0.2), (101, 1, 0.3)]
        );
        assert!(reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.seq_name(), Some("chr2"));
        assert_eq!(blocks(&mut reader), vec![(7, 3, 0.4)]);
        assert!(!reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.default_prior(), 0.01);
    }

    #[test]
    fn skipping_a_sequence_discards_its_values() {
        let text = "variableStep chrom=a\n1 0.1\n2 0.2\nvariableStep chrom=b\n5 0.5\n";
        let mut reader =
            PriorReaderFromWig::new(TextSource::memory("p.wig", text.as_bytes().to_vec()), 0.0)
                .unwrap();
        assert!(reader.go_to_next_sequence().unwrap());
        assert!(reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.seq_name(), Some("b"));
        assert_eq!(blocks(&mut reader), vec![(5, 1, 0.5)]);
    }
}
