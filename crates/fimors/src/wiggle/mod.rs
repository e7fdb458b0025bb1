//! Wiggle track parsing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::io::{LineReader, TextSource};
use crate::{Error, Result};

mod prior;

pub use prior::PriorReaderFromWig;

static FIXED_STEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^fixedStep\s+chrom=([^\s:]+)\s+start=([0-9]+)\s+step=([0-9]+)(?:\s+span=([0-9]+))?")
        .expect("valid fixedStep regex")
});

static VARIABLE_STEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^variableStep\s+chrom=([^\s:]+)(?:\s+span=([0-9]+))?")
        .expect("valid variableStep regex")
});

pub const DEFAULT_SPAN: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiggleFormat {
    FixedStep,
    VariableStep,
}

/// The declaration line currently in force.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub format: WiggleFormat,
    pub chrom: String,
    /// Declared start (fixedStep only; 0 for variableStep).
    pub start: u64,
    pub step: u64,
    pub span: u64,
}

/// One value line, resolved against its declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct WiggleRecord {
    /// 1-based first position covered.
    pub start: u64,
    pub span: u64,
    pub value: f64,
}

/// Streaming reader for `fixedStep`/`variableStep` wiggle files.
pub struct WiggleReader {
    source: TextSource,
    lines: Option<LineReader>,
    declaration: Option<Declaration>,
    next_start: u64,
}

fn is_declaration(line: &str) -> bool {
    line.starts_with("fixedStep") || line.starts_with("variableStep")
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
}

impl WiggleReader {
    pub fn new(source: TextSource) -> Result<Self> {
        let lines = LineReader::new(source.open()?);
        Ok(Self {
            source,
            lines: Some(lines),
            declaration: None,
            next_start: 0,
        })
    }

    pub fn source_name(&self) -> String {
        self.source.name()
    }

    pub fn reset(&mut self) -> Result<()> {
        if !self.source.is_rewindable() {
            return Err(Error::UnsupportedFeature(
                "unable to rewind wiggle data read from standard input".into(),
            ));
        }
        self.lines = Some(LineReader::new(self.source.open()?));
        self.declaration = None;
        self.next_start = 0;
        Ok(())
    }

    pub fn close(&mut self) {
        self.lines = None;
    }

    pub fn is_eof(&self) -> bool {
        self.lines.as_ref().is_none_or(LineReader::is_eof)
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    fn lines(&mut self) -> Result<&mut LineReader> {
        self.lines
            .as_mut()
            .ok_or_else(|| Error::InvalidState(format!("{} is closed", self.source.name())))
    }

    fn parse_declaration(&self, line: &str, line_no: usize) -> Result<Declaration> {
        let name = self.source.name();
        let number = |text: &str| -> Result<u64> {
            text.parse()
                .map_err(|_| Error::parse(&name, line_no, format!("invalid number '{text}'")))
        };
        if let Some(caps) = FIXED_STEP.captures(line) {
            return Ok(Declaration {
                format: WiggleFormat::FixedStep,
                chrom: caps[1].to_string(),
                start: number(&caps[2])?,
                step: number(&caps[3])?,
                span: caps.get(4).map_or(Ok(DEFAULT_SPAN), |m| number(m.as_str()))?,
            });
        }
        if let Some(caps) = VARIABLE_STEP.captures(line) {
            return Ok(Declaration {
                format: WiggleFormat::VariableStep,
                chrom: caps[1].to_string(),
                start: 0,
                step: 0,
                span: caps.get(2).map_or(Ok(DEFAULT_SPAN), |m| number(m.as_str()))?,
            });
        }
        Err(Error::parse(&name, line_no, "unable to determine wiggle format"))
    }

    /// Advance to the next declaration line, skipping any value lines in
    /// between. Returns false at end of input.
    pub fn next_declaration(&mut self) -> Result<bool> {
        loop {
            let Some(line) = self.lines()?.read_line()? else {
                return Ok(false);
            };
            if is_declaration(&line) {
                let line_no = self.lines()?.line_no();
                let declaration = self.parse_declaration(&line, line_no)?;
                self.next_start = declaration.start;
                self.declaration = Some(declaration);
                return Ok(true);
            }
        }
    }

    /// Read the next value line of the current declaration. A declaration
    /// line ends the run and is left for `next_declaration`.
    pub fn next_record(&mut self) -> Result<Option<WiggleRecord>> {
        loop {
            let Some(line) = self.lines()?.read_line()? else {
                return Ok(None);
            };
            if is_skippable(&line) {
                continue;
            }
            if is_declaration(&line) {
                self.lines()?.unread_line(line);
                return Ok(None);
            }
            let line_no = self.lines()?.line_no();
            let Some(declaration) = self.declaration.as_ref() else {
                return Err(Error::parse(
                    &self.source.name(),
                    line_no,
                    "value line before any wiggle declaration",
                ));
            };
            let record = match declaration.format {
                WiggleFormat::FixedStep => {
                    let value = parse_value(line.trim(), &self.source.name(), line_no)?;
                    let start = self.next_start;
                    self.next_start += declaration.step;
                    WiggleRecord {
                        start,
                        span: declaration.span,
                        value,
                    }
                }
                WiggleFormat::VariableStep => {
                    let mut fields = line.split_whitespace();
                    let (Some(pos), Some(value)) = (fields.next(), fields.next()) else {
                        return Err(Error::parse(
                            &self.source.name(),
                            line_no,
                            "expected a position and a value",
                        ));
                    };
                    let start = pos.parse().map_err(|_| {
                        Error::parse(&self.source.name(), line_no, format!("invalid position '{pos}'"))
                    })?;
                    WiggleRecord {
                        start,
                        span: declaration.span,
                        value: parse_value(value, &self.source.name(), line_no)?,
                    }
                }
            };
            return Ok(Some(record));
        }
    }
}

fn parse_value(text: &str, source: &str, line_no: usize) -> Result<f64> {
    text.parse()
        .map_err(|_| Error::parse(source, line_no, format!("invalid value '{text}'")))
}
