//! Sliding-window sequence reader over FASTA input.

use tracing::{debug, warn};

use crate::alphabet::Alphabet;
use crate::block::{DataBlock, DataBlockReader, Pushback};
use crate::io::{ByteReader, TextSource};
use crate::util::{parse_genomic_coordinates, parse_seq_name};
use crate::{Error, Result};

/// Reads FASTA sequences as overlapping windows of a fixed width.
///
/// The first `next_block` call of a sequence fills the whole window; each
/// later call drops the oldest residue and reads one more. Window starts
/// are 1-based (or genomic when coordinates are parsed from the header).
pub struct SeqReaderFromFasta {
    source: TextSource,
    input: Option<ByteReader>,
    alphabet: Alphabet,
    parse_genomic_coord: bool,
    at_start_of_line: bool,
    position: u64,
    header: Vec<u8>,
    name: Option<String>,
    warned: [bool; 256],
    pushback: Pushback,
}

impl SeqReaderFromFasta {
    pub fn new(source: TextSource, alphabet: Alphabet, parse_genomic_coord: bool) -> Result<Self> {
        let input = ByteReader::new(source.open()?);
        Ok(Self {
            source,
            input: Some(input),
            alphabet,
            parse_genomic_coord,
            at_start_of_line: true,
            position: 0,
            header: Vec::with_capacity(128),
            name: None,
            warned: [false; 256],
            pushback: Pushback::default(),
        })
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn input(&mut self) -> Result<&mut ByteReader> {
        self.input
            .as_mut()
            .ok_or_else(|| Error::InvalidState(format!("{} is closed", self.source.name())))
    }

    fn parse_header(&mut self) -> Result<()> {
        let header = String::from_utf8_lossy(&self.header).into_owned();
        if self.parse_genomic_coord {
            if let Some(coords) = parse_genomic_coordinates(&header) {
                self.position = coords.start.saturating_sub(1);
                self.name = Some(coords.chrom);
                return Ok(());
            }
        }
        let name = parse_seq_name(&header, self.parse_genomic_coord).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "unable to find sequence name in header '{header}' of {}",
                self.source.name()
            ))
        })?;
        self.name = Some(name.to_string());
        Ok(())
    }

    fn convert_residue(&mut self, byte: u8) -> u8 {
        let upper = byte.to_ascii_uppercase();
        if self.alphabet.is_known(upper) {
            return upper;
        }
        let wildcard = self.alphabet.wildcard();
        if !self.warned[byte as usize] {
            self.warned[byte as usize] = true;
            warn!(
                "{} is not a valid character in the {} alphabet; converting to {} in sequence {}",
                char::from(byte).escape_default(),
                self.alphabet.name(),
                char::from(wildcard),
                self.name.as_deref().unwrap_or("?")
            );
        }
        wildcard
    }
}

impl DataBlockReader for SeqReaderFromFasta {
    fn reset(&mut self) -> Result<()> {
        if !self.source.is_rewindable() {
            return Err(Error::UnsupportedFeature(
                "unable to rewind when reading sequences from standard input".into(),
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
        if block.is_full() {
            block.shift();
        }
        let mut result = false;
        loop {
            let at_start = self.at_start_of_line;
            let input = self.input()?;
            let Some(byte) = input.peek()? else {
                break;
            };
            if byte == b'>' && at_start {
                // Leave the header for go_to_next_sequence.
                break;
            }
            input.next_byte()?;
            if byte.is_ascii_whitespace() {
                self.at_start_of_line = byte == b'\n';
                continue;
            }
            self.at_start_of_line = false;
            let residue = self.convert_residue(byte);
            block.push_residue(residue);
            if block.is_full() {
                result = true;
                break;
            }
        }
        self.position += 1;
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
        self.warned = [false; 256];
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
        debug!(
            "entered sequence {} of {}",
            self.name.as_deref().unwrap_or("?"),
            self.source.name()
        );
        Ok(true)
    }

    fn seq_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn close(&mut self) {
        self.input = None;
    }
}
