//! Prior reader over flat PSP files.
//!
//! A PSP file is a FASTA-like list of `>name` headers, each followed by
//! whitespace-separated priors, one per sequence position.

use crate::block::{DataBlock, DataBlockReader, PriorReader, Pushback};
use crate::io::{ByteReader, TextSource};
use crate::util::{parse_plain_coordinates, parse_seq_name};
use crate::{Error, Result};

const MAX_PRIOR_TOKEN: usize = 99;

pub struct PriorReaderFromPsp {
    source: TextSource,
    input: Option<ByteReader>,
    parse_genomic_coord: bool,
    default_prior: f64,
    at_start_of_line: bool,
    position: u64,
    header: Vec<u8>,
    token: Vec<u8>,
    name: Option<String>,
    pushback: Pushback,
}

impl PriorReaderFromPsp {
    pub fn new(source: TextSource, parse_genomic_coord: bool, default_prior: f64) -> Result<Self> {
        let input = ByteReader::new(source.open()?);
        Ok(Self {
            source,
            input: Some(input),
            parse_genomic_coord,
            default_prior,
            at_start_of_line: true,
            position: 0,
            header: Vec::with_capacity(128),
            token: Vec::with_capacity(16),
            name: None,
            pushback: Pushback::default(),
        })
    }

    fn input(&mut self) -> Result<&mut ByteReader> {
        self.input
            .as_mut()
            .ok_or_else(|| Error::InvalidState(format!("{} is closed", self.source.name())))
    }

    fn invalid_prior(&self) -> Error {
        Error::InvalidPrior {
            source_name: self.source.name(),
            value: String::from_utf8_lossy(&self.token).into_owned(),
        }
    }

    fn parse_header(&mut self) -> Result<()> {
        let header = String::from_utf8_lossy(&self.header).into_owned();
        if self.parse_genomic_coord {
            if let Some(coords) = parse_plain_coordinates(&header) {
                self.position = coords.start.saturating_sub(1);
                self.name = Some(coords.chrom);
                return Ok(());
            }
        }
        let name = parse_seq_name(&header, false).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "unable to find sequence name in header '{header}' of {}",
                self.source.name()
            ))
        })?;
        self.name = Some(name.to_string());
        Ok(())
    }

    /// Read the next whitespace-delimited token of the current sequence
    /// into `self.token`. Returns false at the next header or end of input.
    fn read_token(&mut self) -> Result<bool> {
        self.token.clear();
        loop {
            let at_start = self.at_start_of_line;
            let input = self.input()?;
            let Some(byte) = input.peek()? else {
                return Ok(false);
            };
            if byte == b'>' && at_start {
                return Ok(false);
            }
            input.next_byte()?;
            if byte.is_ascii_whitespace() {
                self.at_start_of_line = byte == b'\n';
                continue;
            }
            self.at_start_of_line = false;
            self.token.push(byte);
            break;
        }
        loop {
            let input = self.input()?;
            match input.peek()? {
                Some(byte) if !byte.is_ascii_whitespace() => {
                    input.next_byte()?;
                    self.token.push(byte);
                    if self.token.len() > MAX_PRIOR_TOKEN {
                        return Err(self.invalid_prior());
                    }
                }
                _ => break,
            }
        }
        Ok(true)
    }
}

impl DataBlockReader for PriorReaderFromPsp {
    fn reset(&mut self) -> Result<()> {
        if !self.source.is_rewindable() {
            return Err(Error::UnsupportedFeature(
                "unable to rewind priors read from standard input".into(),
            ));
        }
        self.input = Some(ByteReader::new(self.source.open()?));
        self.at_start_of_line = true;
        self.position = 0;
        self.name = None;
        self.pushback.clear();
        Ok(())
    }

    fn is_eof(&self) -> bool {
        self.input.as_ref().is_none_or(ByteReader::is_eof)
    }

    fn next_block(&mut self, block: &mut DataBlock) -> Result<bool> {
        if let Some(result) = self.pushback.replay(block) {
            return Ok(result);
        }
        let result = if self.read_token()? {
            let prior = std::str::from_utf8(&self.token)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|p| (0.0..=1.0).contains(p))
                .ok_or_else(|| self.invalid_prior())?;
            self.position += 1;
            block.set_value(prior);
            block.set_count(1);
            true
        } else {
            block.set_count(0);
            false
        };
        block.set_start(self.position);
        self.pushback.remember(block, result);
        Ok(result)
    }

    fn unget_block(&mut self) -> Result<()> {
        self.pushback.unget()
    }

    fn go_to_next_sequence(&mut self) -> Result<bool> {
        self.position = 0;
        self.pushback.clear();
        loop {
            let at_start = self.at_start_of_line;
            let Some(byte) = self.input()?.next_byte()? else {
                self.name = None;
                return Ok(false);
            };
            if at_start && byte == b'>' {
                break;
            }
            self.at_start_of_line = byte == b'\n';
        }
        let mut header = std::mem::take(&mut self.header);
        self.input()?.read_line_into(&mut header)?;
        self.header = header;
        self.at_start_of_line = true;
        self.parse_header()?;
        Ok(true)
    }

    fn seq_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn close(&mut self) {
        self.input = None;
    }
}

impl PriorReader for PriorReaderFromPsp {
    fn default_prior(&self) -> f64 {
        self.default_prior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str, parse_coords: bool) -> PriorReaderFromPsp {
        PriorReaderFromPsp::new(
            TextSource::memory("test.psp", text.as_bytes().to_vec()),
            parse_coords,
            0.25,
        )
        .unwrap()
    }

    fn read_all(r: &mut PriorReaderFromPsp) -> Vec<(u64, f64)> {
        let mut block = DataBlock::prior();
        let mut out = Vec::new();
        while r.next_block(&mut block).unwrap() {
            assert_eq!(block.count(), 1);
            out.push((block.start(), block.value()));
        }
        out
    }

    #[test]
    fn values_are_one_per_position() {
        let mut r = reader(">s1\n0.1 0.2\n0.3\n>s2\n1 0\n", false);
        assert!(r.go_to_next_sequence().unwrap());
        assert_eq!(r.seq_name(), Some("s1"));
        assert_eq!(read_all(&mut r), vec![(1, 0.1), (2, 0.2), (3, 0.3)]);
        assert!(r.go_to_next_sequence().unwrap());
        assert_eq!(r.seq_name(), Some("s2"));
        assert_eq!(read_all(&mut r), vec![(1, 1.0), (2, 0.0)]);
        assert!(!r.go_to_next_sequence().unwrap());
        assert_eq!(r.default_prior(), 0.25);
    }

    #[test]
    fn out_of_range_prior_is_fatal() {
        let mut r = reader(">s1\n0.1 1.5\n", false);
        r.go_to_next_sequence().unwrap();
        let mut block = DataBlock::prior();
        assert!(r.next_block(&mut block).unwrap());
        let err = r.next_block(&mut block).unwrap_err();
        assert!(matches!(err, Error::InvalidPrior { ref value, .. } if value == "1.5"));
    }

    #[test]
    fn garbage_prior_is_fatal() {
        let mut r = reader(">s1\n0.1x\n", false);
        r.go_to_next_sequence().unwrap();
        let mut block = DataBlock::prior();
        assert!(matches!(
            r.next_block(&mut block),
            Err(Error::InvalidPrior { .. })
        ));
    }

    #[test]
    fn genomic_header_offsets_positions() {
        let mut r = reader(">chr1:11-12\n0.5 0.6\n", true);
        r.go_to_next_sequence().unwrap();
        assert_eq!(r.seq_name(), Some("chr1"));
        assert_eq!(read_all(&mut r), vec![(11, 0.5), (12, 0.6)]);
    }
}
