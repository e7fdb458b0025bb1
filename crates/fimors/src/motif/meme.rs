//! MEME text motif format.

use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::alphabet::Alphabet;
use crate::motif::Motif;
use crate::{Error, Result};

static ALPHABET_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*ALPHABET\s*=\s*(\S+)").expect("valid alphabet regex"));

static BACKGROUND_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Background\s+letter\s+frequencies").expect("valid background regex")
});

static FREQ_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z])\s+([0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)").expect("valid pair regex")
});

static MOTIF_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*MOTIF\s+(\S+)(?:\s+(\S+))?").expect("valid motif regex")
});

static MATRIX_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*letter-probability\s+matrix\s*:(.*)$").expect("valid matrix regex")
});

static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+)\s*=\s*(\S+)").expect("valid key-value regex"));

/// Contents of a MEME file before background resolution.
#[derive(Debug, Clone)]
pub struct MemeFile {
    pub alphabet: Alphabet,
    /// Letter frequencies of the background block, in alphabet order.
    pub background: Option<Vec<f64>>,
    pub motifs: Vec<Motif>,
}

struct PendingMotif {
    id: String,
    alt: Option<String>,
    line_no: usize,
}

struct MatrixHeader {
    alength: Option<usize>,
    width: Option<usize>,
    nsites: f64,
}

fn parse_matrix_header(text: &str, source: &str, line_no: usize) -> Result<MatrixHeader> {
    let mut header = MatrixHeader {
        alength: None,
        width: None,
        nsites: 0.0,
    };
    for caps in KEY_VALUE.captures_iter(text) {
        let value = &caps[2];
        let bad = || Error::parse(source, line_no, format!("invalid value '{value}' for {}", &caps[1]));
        match &caps[1] {
            "alength" => header.alength = Some(value.parse().map_err(|_| bad())?),
            "w" => header.width = Some(value.parse().map_err(|_| bad())?),
            "nsites" => header.nsites = value.parse().map_err(|_| bad())?,
            _ => {}
        }
    }
    Ok(header)
}

fn parse_row(line: &str) -> Option<Vec<f64>> {
    let row: Option<Vec<f64>> = line.split_whitespace().map(|t| t.parse().ok()).collect();
    row.filter(|r| !r.is_empty())
}

/// Parse MEME text format motifs.
///
/// The alphabet comes from the `ALPHABET=` line when present, otherwise
/// from the matrices' `alength=`.
pub fn parse(reader: impl BufRead, source: &str) -> Result<MemeFile> {
    let mut alphabet: Option<Alphabet> = None;
    let mut background_pairs: Vec<(u8, f64)> = Vec::new();
    let mut in_background = false;
    let mut pending: Option<PendingMotif> = None;
    let mut raw: Vec<(PendingMotif, MatrixHeader, Vec<Vec<f64>>)> = Vec::new();

    let mut lines = reader.lines().enumerate().peekable();
    while let Some((idx, line)) = lines.next() {
        let line = line?;
        let line_no = idx + 1;

        if in_background {
            if line.trim().is_empty() || !FREQ_PAIR.is_match(&line) {
                in_background = false;
            } else {
                for caps in FREQ_PAIR.captures_iter(&line) {
                    let value = caps[2]
                        .parse()
                        .map_err(|_| Error::parse(source, line_no, "invalid background frequency"))?;
                    background_pairs.push((caps[1].as_bytes()[0].to_ascii_uppercase(), value));
                }
                continue;
            }
        }

        if let Some(caps) = ALPHABET_LINE.captures(&line) {
            alphabet = Some(Alphabet::from_letters(&caps[1]).ok_or_else(|| {
                Error::parse(source, line_no, format!("unsupported alphabet '{}'", &caps[1]))
            })?);
        } else if BACKGROUND_LINE.is_match(&line) {
            background_pairs.clear();
            in_background = true;
        } else if let Some(caps) = MOTIF_LINE.captures(&line) {
            pending = Some(PendingMotif {
                id: caps[1].to_string(),
                alt: caps.get(2).map(|m| m.as_str().to_string()),
                line_no,
            });
        } else if let Some(caps) = MATRIX_LINE.captures(&line) {
            let Some(motif) = pending.take() else {
                return Err(Error::parse(source, line_no, "matrix without a MOTIF line"));
            };
            let header = parse_matrix_header(&caps[1], source, line_no)?;
            let mut rows = Vec::new();
            while header.width.is_none_or(|w| rows.len() < w) {
                let Some((_, next)) = lines.peek() else {
                    break;
                };
                let next = match next {
                    Ok(text) => text.trim().to_string(),
                    Err(_) => break,
                };
                if next.is_empty() && header.width.is_some() {
                    lines.next();
                    continue;
                }
                let Some(row) = parse_row(&next) else {
                    break;
                };
                lines.next();
                rows.push(row);
            }
            if let Some(w) = header.width {
                if rows.len() != w {
                    return Err(Error::parse(
                        source,
                        motif.line_no,
                        format!("motif {} declares w= {w} but has {} rows", motif.id, rows.len()),
                    ));
                }
            }
            raw.push((motif, header, rows));
        }
    }

    if raw.is_empty() {
        return Err(Error::InvalidFormat(format!("no motifs could be read from {source}")));
    }

    let alphabet = match alphabet {
        Some(alphabet) => alphabet,
        None => {
            let (_, header, rows) = &raw[0];
            let size = header
                .alength
                .unwrap_or_else(|| rows.first().map_or(0, Vec::len));
            Alphabet::from_size(size).ok_or_else(|| {
                Error::InvalidFormat(format!("cannot infer the alphabet of {source} from alength= {size}"))
            })?
        }
    };

    let mut motifs = Vec::with_capacity(raw.len());
    for (pending, header, rows) in raw {
        if let Some(alength) = header.alength {
            if alength != alphabet.size() {
                return Err(Error::parse(
                    source,
                    pending.line_no,
                    format!("alength= {alength} does not match the {} alphabet", alphabet.name()),
                ));
            }
        }
        motifs.push(Motif::new(pending.id, pending.alt, alphabet, header.nsites, rows)?);
    }

    let background = if background_pairs.is_empty() {
        None
    } else {
        let mut freqs = vec![f64::NAN; alphabet.size()];
        for (letter, value) in background_pairs {
            if let Some(a) = alphabet.index(letter) {
                freqs[a] = value;
            }
        }
        if freqs.iter().any(|f| f.is_nan()) {
            return Err(Error::InvalidFormat(format!(
                "background frequencies in {source} do not cover the {} alphabet",
                alphabet.name()
            )));
        }
        Some(freqs)
    };

    Ok(MemeFile {
        alphabet,
        background,
        motifs,
    })
}
