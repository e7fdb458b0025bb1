use std::io::BufRead;
use std::path::Path;

use crate::io::open_text_reader;
use crate::{Error, Result};

/// Binned distribution of normalized priors (`priors.dist`).
///
/// The file holds the minimum, maximum and median prior, one per line,
/// followed by the probability of each bin.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorDist {
    min: f64,
    max: f64,
    median: f64,
    bins: Vec<f64>,
}

impl PriorDist {
    pub fn new(min: f64, max: f64, median: f64, bins: Vec<f64>) -> Result<Self> {
        if bins.is_empty() {
            return Err(Error::InvalidFormat(
                "prior distribution has no bins".into(),
            ));
        }
        if !(min <= median && median <= max) {
            return Err(Error::InvalidFormat(format!(
                "prior distribution bounds are inconsistent: min {min}, median {median}, max {max}"
            )));
        }
        Ok(Self {
            min,
            max,
            median,
            bins,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let reader = open_text_reader(path)?;
        let mut values = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let value: f64 = trimmed.parse().map_err(|_| {
                Error::parse(&name, idx + 1, format!("invalid number '{trimmed}'"))
            })?;
            values.push(value);
        }
        if values.len() < 4 {
            return Err(Error::InvalidFormat(format!(
                "{name} must contain min, max, median and at least one bin"
            )));
        }
        let bins = values.split_off(3);
        Self::new(values[0], values[1], values[2], bins)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Prior value at the centre of bin `index`.
    pub fn bin_prior(&self, index: usize) -> f64 {
        if self.bins.len() < 2 || self.max <= self.min {
            return self.min;
        }
        let scale = (self.bins.len() - 1) as f64 / (self.max - self.min);
        index as f64 / scale + self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_header_and_bins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("priors.dist");
        std::fs::write(&path, "0.1\n0.5\n0.2\n0.25\n0.5\n0.25\n").expect("write dist");
        let dist = PriorDist::load(&path).unwrap();
        assert_eq!(dist.min(), 0.1);
        assert_eq!(dist.max(), 0.5);
        assert_eq!(dist.median(), 0.2);
        assert_eq!(dist.bins(), &[0.25, 0.5, 0.25]);
        assert!((dist.bin_prior(0) - 0.1).abs() < 1e-12);
        assert!((dist.bin_prior(1) - 0.3).abs() < 1e-12);
        assert!((dist.bin_prior(2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("short.dist");
        std::fs::write(&path, "0.1\n0.5\n0.2\n").expect("write dist");
        assert!(matches!(
            PriorDist::load(&path),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = PriorDist::load(Path::new("/nonexistent/priors.dist")).unwrap_err();
        assert!(matches!(err, Error::MissingFile(_)));
    }
}
