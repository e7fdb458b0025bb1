//! Motif frequency matrices and background models.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::alphabet::Alphabet;
use crate::io::{TextSource, open_text_reader};
use crate::{Error, Result};

pub mod meme;

/// Site count assumed when a motif does not declare one.
pub const DEFAULT_NSITES: f64 = 20.0;
pub const DEFAULT_PSEUDOCOUNT: f64 = 0.1;

/// A position-specific probability matrix: `width` rows of letter
/// frequencies in alphabet column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    id: String,
    alt: Option<String>,
    alphabet: Alphabet,
    nsites: f64,
    freqs: Vec<Vec<f64>>,
}

impl Motif {
    pub fn new(
        id: impl Into<String>,
        alt: Option<String>,
        alphabet: Alphabet,
        nsites: f64,
        freqs: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let id = id.into();
        if freqs.is_empty() {
            return Err(Error::InvalidFormat(format!("motif {id} has no columns")));
        }
        if let Some(row) = freqs.iter().find(|row| row.len() != alphabet.size()) {
            return Err(Error::InvalidFormat(format!(
                "motif {id} has a row of {} entries, expected {}",
                row.len(),
                alphabet.size()
            )));
        }
        let nsites = if nsites > 0.0 { nsites } else { DEFAULT_NSITES };
        Ok(Self {
            id,
            alt,
            alphabet,
            nsites,
            freqs,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alt(&self) -> Option<&str> {
        self.alt.as_deref()
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn nsites(&self) -> f64 {
        self.nsites
    }

    pub fn width(&self) -> usize {
        self.freqs.len()
    }

    pub fn freq(&self, position: usize, letter: usize) -> f64 {
        self.freqs[position][letter]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.freqs
    }

    /// The motif of the opposite strand: rows reversed, letters complemented.
    pub fn reverse_complement(&self) -> Result<Self> {
        if !self.alphabet.is_complementable() {
            return Err(Error::UnsupportedFeature(format!(
                "cannot reverse complement {} motif {}",
                self.alphabet.name(),
                self.id
            )));
        }
        let freqs = self
            .freqs
            .iter()
            .rev()
            .map(|row| {
                (0..row.len())
                    .map(|a| row[self.alphabet.complement_index(a)])
                    .collect()
            })
            .collect();
        Ok(Self {
            id: self.id.clone(),
            alt: self.alt.clone(),
            alphabet: self.alphabet,
            nsites: self.nsites,
            freqs,
        })
    }

    /// Mix `pseudocount` background-weighted sites into every column.
    pub fn apply_pseudocount(&mut self, background: &Background, pseudocount: f64) {
        let total = self.nsites + pseudocount;
        for row in &mut self.freqs {
            for (a, f) in row.iter_mut().enumerate() {
                *f = (*f * self.nsites + pseudocount * background.freq(a)) / total;
            }
        }
    }
}

/// Order-0 letter frequencies of the sequences being scanned.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    alphabet: Alphabet,
    freqs: Vec<f64>,
}

impl Background {
    pub fn uniform(alphabet: Alphabet) -> Self {
        let n = alphabet.size();
        Self {
            alphabet,
            freqs: vec![1.0 / n as f64; n],
        }
    }

    /// Normalized copy of `freqs`.
    pub fn new(alphabet: Alphabet, freqs: Vec<f64>) -> Result<Self> {
        if freqs.len() != alphabet.size() {
            return Err(Error::InvalidFormat(format!(
                "background has {} letters, expected {}",
                freqs.len(),
                alphabet.size()
            )));
        }
        let total: f64 = freqs.iter().sum();
        if !(total > 0.0) || freqs.iter().any(|f| !(*f >= 0.0)) {
            return Err(Error::InvalidFormat(
                "background frequencies must be non-negative with a positive sum".into(),
            ));
        }
        Ok(Self {
            alphabet,
            freqs: freqs.into_iter().map(|f| f / total).collect(),
        })
    }

    /// Read an order-0 background file (`A 0.25` per line). Entries for
    /// longer words are ignored.
    pub fn load(path: &Path, alphabet: Alphabet) -> Result<Self> {
        let name = path.display().to_string();
        let reader = open_text_reader(path)?;
        let mut freqs = vec![f64::NAN; alphabet.size()];
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split_whitespace();
            let (Some(word), Some(value)) = (fields.next(), fields.next()) else {
                return Err(Error::parse(&name, idx + 1, "expected a letter and a frequency"));
            };
            if word.len() != 1 {
                continue;
            }
            let letter = word.as_bytes()[0];
            let Some(a) = alphabet.index(letter) else {
                return Err(Error::parse(
                    &name,
                    idx + 1,
                    format!("'{word}' is not a {} letter", alphabet.name()),
                ));
            };
            freqs[a] = value
                .parse()
                .map_err(|_| Error::parse(&name, idx + 1, format!("invalid frequency '{value}'")))?;
        }
        if let Some(a) = freqs.iter().position(|f| f.is_nan()) {
            return Err(Error::InvalidFormat(format!(
                "{name} has no frequency for letter {}",
                char::from(alphabet.letters()[a])
            )));
        }
        Self::new(alphabet, freqs)
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn freq(&self, letter: usize) -> f64 {
        self.freqs[letter]
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    /// Make the model strand-symmetric by averaging each letter with its
    /// complement.
    pub fn average_with_complement(&mut self) {
        if !self.alphabet.is_complementable() {
            return;
        }
        let averaged: Vec<f64> = (0..self.freqs.len())
            .map(|a| (self.freqs[a] + self.freqs[self.alphabet.complement_index(a)]) / 2.0)
            .collect();
        let total: f64 = averaged.iter().sum();
        self.freqs = averaged.into_iter().map(|f| f / total).collect();
    }
}

/// Where the scanning background comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BackgroundSource {
    /// The motif file's background block, uniform when it has none.
    #[default]
    MotifFile,
    Uniform,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotifLoadOptions {
    pub pseudocount: f64,
    pub background: BackgroundSource,
}

impl Default for MotifLoadOptions {
    fn default() -> Self {
        Self {
            pseudocount: DEFAULT_PSEUDOCOUNT,
            background: BackgroundSource::MotifFile,
        }
    }
}

/// Motifs of one file with the background they are scored against.
#[derive(Debug, Clone)]
pub struct MotifSet {
    pub alphabet: Alphabet,
    pub background: Background,
    pub motifs: Vec<Motif>,
}

/// Read a MEME motif file, resolve the background and apply pseudocounts.
pub fn load_motifs(source: &TextSource, options: &MotifLoadOptions) -> Result<MotifSet> {
    if options.pseudocount < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "pseudocount must not be negative, got {}",
            options.pseudocount
        )));
    }
    let parsed = meme::parse(source.open()?, &source.name())?;
    let alphabet = parsed.alphabet;
    let background = match &options.background {
        BackgroundSource::Uniform => Background::uniform(alphabet),
        BackgroundSource::File(path) => Background::load(path, alphabet)?,
        BackgroundSource::MotifFile => match parsed.background {
            Some(freqs) => Background::new(alphabet, freqs)?,
            None => {
                warn!(
                    "{} has no background frequencies; using a uniform background",
                    source.name()
                );
                Background::uniform(alphabet)
            }
        },
    };
    let mut motifs = parsed.motifs;
    for motif in &mut motifs {
        motif.apply_pseudocount(&background, options.pseudocount);
    }
    debug!("read {} motifs from {}", motifs.len(), source.name());
    Ok(MotifSet {
        alphabet,
        background,
        motifs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motif() -> Motif {
        Motif::new(
            "m1",
            None,
            Alphabet::Dna,
            10.0,
            vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 0.5, 0.5, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn reverse_complement_swaps_rows_and_letters() {
        let rc = motif().reverse_complement().unwrap();
        assert_eq!(rc.rows()[0], vec![0.0, 0.5, 0.5, 0.0]);
        assert_eq!(rc.rows()[1], vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn pseudocount_blends_towards_background() {
        let mut m = motif();
        m.apply_pseudocount(&Background::uniform(Alphabet::Dna), 10.0);
        assert!((m.freq(0, 0) - 0.625).abs() < 1e-12);
        assert!((m.freq(0, 1) - 0.125).abs() < 1e-12);
        let sum: f64 = m.rows()[1].iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn complement_averaging_is_symmetric() {
        let mut bg = Background::new(Alphabet::Dna, vec![0.4, 0.1, 0.2, 0.3]).unwrap();
        bg.average_with_complement();
        assert!((bg.freq(0) - 0.35).abs() < 1e-12);
        assert!((bg.freq(3) - 0.35).abs() < 1e-12);
        assert!((bg.freq(1) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn background_file_ignores_higher_orders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bg.txt");
        std::fs::write(&path, "# order 0\nA 0.3\nC 0.2\nG 0.2\nT 0.3\nAA 0.09\n")
            .expect("write bg");
        let bg = Background::load(&path, Alphabet::Dna).unwrap();
        for (got, want) in bg.freqs().iter().zip([0.3, 0.2, 0.2, 0.3]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Motif::new("bad", None, Alphabet::Dna, 1.0, vec![vec![1.0, 0.0]]);
        assert!(matches!(err, Err(Error::InvalidFormat(_))));
    }
}
