//! Input sources and low-level text readers shared by the block readers.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Result;
use crate::error::Error;

/// Where a reader pulls its text from.
///
/// Readers reopen their source on `reset`, so every variant except
/// standard input can be scanned any number of times.
#[derive(Debug, Clone)]
pub enum TextSource {
    Path(PathBuf),
    Stdin,
    Memory { name: String, data: Arc<[u8]> },
}

impl TextSource {
    /// Interpret a command-line argument; `-` selects standard input.
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            TextSource::Stdin
        } else {
            TextSource::Path(arg.to_path_buf())
        }
    }

    pub fn memory(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        TextSource::Memory {
            name: name.into(),
            data: Arc::from(data),
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            TextSource::Path(path) => path.display().to_string(),
            TextSource::Stdin => "standard input".to_string(),
            TextSource::Memory { name, .. } => name.clone(),
        }
    }

    pub fn is_rewindable(&self) -> bool {
        !matches!(self, TextSource::Stdin)
    }

    pub fn open(&self) -> Result<Box<dyn BufRead>> {
        match self {
            TextSource::Path(path) => open_text_reader(path),
            TextSource::Stdin => Ok(Box::new(BufReader::new(std::io::stdin()))),
            TextSource::Memory { data, .. } => Ok(Box::new(Cursor::new(Arc::clone(data)))),
        }
    }
}

/// Open a plain or gzip-compressed text file.
pub fn open_text_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|_| Error::MissingFile(path.to_path_buf()))?;
    let reader: Box<dyn BufRead> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let decoder = flate2::read::MultiGzDecoder::new(file);
        Box::new(BufReader::new(decoder))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Byte-at-a-time reader with one byte of lookahead.
pub struct ByteReader {
    reader: Box<dyn BufRead>,
    eof: bool,
}

impl ByteReader {
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self { reader, eof: false }
    }

    pub fn peek(&mut self) -> Result<Option<u8>> {
        let buf = self.reader.fill_buf()?;
        match buf.first() {
            Some(&b) => Ok(Some(b)),
            None => {
                self.eof = true;
                Ok(None)
            }
        }
    }

    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    /// Read the rest of the current line into `out` (without the line
    /// terminator). Returns false if nothing was left to read.
    pub fn read_line_into(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        out.clear();
        let bytes = self.reader.read_until(b'\n', out)?;
        if bytes == 0 {
            self.eof = true;
            return Ok(false);
        }
        strip_line_ending(out);
        Ok(true)
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

/// Line reader with a single pushed-back line.
pub struct LineReader {
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    pushed_back: Option<String>,
    line_no: usize,
    eof: bool,
}

impl LineReader {
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            pushed_back: None,
            line_no: 0,
            eof: false,
        }
    }

    pub fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pushed_back.take() {
            self.line_no += 1;
            return Ok(Some(line));
        }
        self.buf.clear();
        let bytes = self.reader.read_until(b'\n', &mut self.buf)?;
        if bytes == 0 {
            self.eof = true;
            return Ok(None);
        }
        strip_line_ending(&mut self.buf);
        self.line_no += 1;
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Push `line` back so the next `read_line` returns it again.
    pub fn unread_line(&mut self, line: String) {
        self.line_no = self.line_no.saturating_sub(1);
        self.pushed_back = Some(line);
    }

    /// 1-based number of the line most recently returned.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    pub fn is_eof(&self) -> bool {
        self.eof && self.pushed_back.is_none()
    }
}

fn strip_line_ending(buf: &mut Vec<u8>) {
    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }
}
