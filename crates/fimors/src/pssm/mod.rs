//! Scaled log-odds scoring matrices and score to p-value conversion.

use std::io::Write;

use crate::alphabet::Alphabet;
use crate::motif::{Background, Motif};
use crate::prior::PriorDist;
use crate::scan::output::format_general;
use crate::{Error, Result};

/// Number of integer steps a single column score is scaled into.
pub const PSSM_RANGE: usize = 1000;

/// Smallest probability used when taking logarithms.
pub const MIN_PROBABILITY: f64 = 1e-10;

/// Integer scoring matrix for one motif strand.
///
/// Every cell is `round((log_odds - offset) * scale)` and lies in
/// `[0, range]`. `pv[s]` is the probability that a background window
/// scores at least `s`. With a prior distribution a second table covers
/// scores that include the prior's log-odds term.
#[derive(Debug, Clone)]
pub struct Pssm {
    alphabet: Alphabet,
    matrix: Vec<Vec<i32>>,
    scale: f64,
    offset: f64,
    range: usize,
    pv: Vec<f64>,
    prior_pv: Option<Vec<f64>>,
}

/// Score of one scorable window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteScore {
    pub score: f64,
    pub pvalue: f64,
}

fn log2_odds(p: f64, q: f64) -> f64 {
    (p.max(MIN_PROBABILITY) / q.max(MIN_PROBABILITY)).log2()
}

/// Log-odds of a prior scaled by `alpha`.
pub fn prior_log_odds(prior: f64, alpha: f64) -> f64 {
    let p = alpha * prior;
    (p / (1.0 - p)).log2()
}

/// Reverse cumulative sum, capped at 1.
fn tail_probabilities(mut dist: Vec<f64>) -> Vec<f64> {
    let mut acc = 0.0;
    for value in dist.iter_mut().rev() {
        acc += *value;
        *value = acc.min(1.0);
    }
    dist
}

impl Pssm {
    /// Build the matrix and p-value tables for `motif` under `background`.
    pub fn build(
        motif: &Motif,
        background: &Background,
        prior_dist: Option<&PriorDist>,
        alpha: f64,
        range: usize,
    ) -> Result<Self> {
        if range == 0 {
            return Err(Error::InvalidConfig("PSSM range must be positive".into()));
        }
        if motif.alphabet() != background.alphabet() {
            return Err(Error::InvalidConfig(format!(
                "motif {} is {} but the background is {}",
                motif.id(),
                motif.alphabet().name(),
                background.alphabet().name()
            )));
        }
        let log_odds: Vec<Vec<f64>> = motif
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(a, &f)| log2_odds(f, background.freq(a)))
                    .collect()
            })
            .collect();

        let mut min = log_odds.iter().flatten().copied().fold(f64::INFINITY, f64::min);
        let mut max = log_odds.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
        // Prior log-odds saturate at the floored probabilities.
        let prior_bounds = prior_dist.map(|dist| {
            let lo = (alpha * dist.min()).clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
            let hi = (alpha * dist.max()).clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
            (prior_log_odds(lo, 1.0), prior_log_odds(hi, 1.0))
        });
        if let Some((lo, hi)) = prior_bounds {
            min = min.min(lo);
            max = max.max(hi);
        }
        let offset = min;
        let scale = if max > min { range as f64 / (max - min) } else { 1.0 };
        let to_cell = |x: f64| ((x - offset) * scale).round().clamp(0.0, range as f64) as i32;

        let matrix: Vec<Vec<i32>> = log_odds
            .iter()
            .map(|row| row.iter().map(|&x| to_cell(x)).collect())
            .collect();

        let mut dist = vec![0.0; motif.width() * range + 1];
        dist[0] = 1.0;
        for (col, row) in matrix.iter().enumerate() {
            let reach = col * range;
            let mut next = vec![0.0; dist.len()];
            for (s, &p) in dist[..=reach].iter().enumerate() {
                if p == 0.0 {
                    continue;
                }
                for (a, &cell) in row.iter().enumerate() {
                    next[s + cell as usize] += p * background.freq(a);
                }
            }
            dist = next;
        }

        let prior_pv = match prior_dist {
            Some(prior) => {
                let bins = prior.bins();
                let total: f64 = bins.iter().sum();
                let mut with_prior = vec![0.0; dist.len() + range];
                for (i, &weight) in bins.iter().enumerate() {
                    if weight <= 0.0 {
                        continue;
                    }
                    let p = (alpha * prior.bin_prior(i)).clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
                    let cell = to_cell(prior_log_odds(p, 1.0)) as usize;
                    let weight = if total > 0.0 { weight / total } else { weight };
                    for (s, &q) in dist.iter().enumerate() {
                        if q != 0.0 {
                            with_prior[s + cell] += q * weight;
                        }
                    }
                }
                Some(tail_probabilities(with_prior))
            }
            None => None,
        };

        Ok(Self {
            alphabet: motif.alphabet(),
            matrix,
            scale,
            offset,
            range,
            pv: tail_probabilities(dist),
            prior_pv,
        })
    }

    /// Assemble a matrix from precomputed parts.
    pub fn from_parts(
        alphabet: Alphabet,
        matrix: Vec<Vec<i32>>,
        scale: f64,
        offset: f64,
        range: usize,
        pv: Vec<f64>,
        prior_pv: Option<Vec<f64>>,
    ) -> Result<Self> {
        if matrix.is_empty() || matrix.iter().any(|row| row.len() != alphabet.size()) {
            return Err(Error::InvalidConfig(
                "matrix rows must match the alphabet size".into(),
            ));
        }
        if pv.is_empty() || prior_pv.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::InvalidConfig("p-value tables must not be empty".into()));
        }
        Ok(Self {
            alphabet,
            matrix,
            scale,
            offset,
            range,
            pv,
            prior_pv,
        })
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn width(&self) -> usize {
        self.matrix.len()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn range(&self) -> usize {
        self.range
    }

    pub fn cell(&self, position: usize, letter: usize) -> i32 {
        self.matrix[position][letter]
    }

    pub fn pv(&self) -> &[f64] {
        &self.pv
    }

    pub fn prior_pv(&self) -> Option<&[f64]> {
        self.prior_pv.as_deref()
    }

    pub fn raw_to_scaled(&self, raw: f64, width: usize) -> f64 {
        ((raw - width as f64 * self.offset) * self.scale).round()
    }

    pub fn scaled_to_raw(&self, scaled: f64, width: usize) -> f64 {
        scaled / self.scale + width as f64 * self.offset
    }

    /// Print the cumulative p-value table, then its per-score differences.
    pub fn write_pv_lookup(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let cumulative: Vec<String> = self.pv.iter().map(|&p| format_general(p, 6)).collect();
        writeln!(out, "{}", cumulative.join(" "))?;
        let diffs: Vec<String> = self
            .pv
            .windows(2)
            .map(|pair| format_general(pair[0] - pair[1], 6))
            .collect();
        writeln!(out, "{}", diffs.join(" "))
    }
}

/// Score `window` against `pssm`.
///
/// Returns `None` when the window holds a residue outside the core
/// alphabet. A non-NaN `prior` adds its log-odds to the score, which is
/// then looked up in the prior table; the lookup index saturates at the
/// table ends and the reported score is recomputed from the saturated
/// index.
pub fn score_window(window: &[u8], prior: f64, pssm: &Pssm, alpha: f64) -> Option<SiteScore> {
    let mut scaled = 0i64;
    for (position, &residue) in window.iter().take(pssm.width()).enumerate() {
        let letter = pssm.alphabet.index(residue)?;
        scaled += i64::from(pssm.cell(position, letter));
    }

    let mut width = pssm.width();
    let mut score = pssm.scaled_to_raw(scaled as f64, width);
    let mut table = pssm.pv();
    let mut scaled = scaled as f64;
    if !prior.is_nan() {
        if let Some(prior_table) = pssm.prior_pv() {
            width += 1;
            score += prior_log_odds(prior, alpha);
            scaled = pssm.raw_to_scaled(score, width);
            table = prior_table;
        }
    }

    let last = table.len() - 1;
    // Truncation toward zero; `as` saturates infinities.
    let index = scaled.trunc() as i64;
    let index = if index > last as i64 {
        score = pssm.scaled_to_raw(last as f64, width);
        last
    } else if index < 0 {
        score = pssm.scaled_to_raw(0.0, width);
        0
    } else {
        index as usize
    };
    Some(SiteScore {
        score,
        pvalue: table[index],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus_motif() -> Motif {
        Motif::new(
            "acgt",
            None,
            Alphabet::Dna,
            20.0,
            vec![
                vec![0.7, 0.1, 0.1, 0.1],
                vec![0.1, 0.7, 0.1, 0.1],
                vec![0.1, 0.1, 0.7, 0.1],
                vec![0.1, 0.1, 0.1, 0.7],
            ],
        )
        .unwrap()
    }

    #[test]
    fn pv_table_is_a_tail_distribution() {
        let pssm = Pssm::build(
            &consensus_motif(),
            &Background::uniform(Alphabet::Dna),
            None,
            1.0,
            PSSM_RANGE,
        )
        .unwrap();
        let pv = pssm.pv();
        assert_eq!(pv.len(), 4 * PSSM_RANGE + 1);
        assert!((pv[0] - 1.0).abs() < 1e-9);
        assert!(pv.windows(2).all(|w| w[0] >= w[1]));
        let best = score_window(b"ACGT", f64::NAN, &pssm, 1.0).unwrap();
        assert!((best.pvalue - 1.0 / 256.0).abs() < 1e-9);
        let worst = score_window(b"TTTA", f64::NAN, &pssm, 1.0).unwrap();
        assert!(worst.score < best.score);
        assert!(worst.pvalue > best.pvalue);
    }

    #[test]
    fn raw_and_scaled_round_trip() {
        let pssm = Pssm::build(
            &consensus_motif(),
            &Background::uniform(Alphabet::Dna),
            None,
            1.0,
            PSSM_RANGE,
        )
        .unwrap();
        let raw = pssm.scaled_to_raw(1234.0, 4);
        assert_eq!(pssm.raw_to_scaled(raw, 4), 1234.0);
    }

    #[test]
    fn unknown_residue_is_not_scorable() {
        let pssm = Pssm::build(
            &consensus_motif(),
            &Background::uniform(Alphabet::Dna),
            None,
            1.0,
            PSSM_RANGE,
        )
        .unwrap();
        assert!(score_window(b"ACNT", f64::NAN, &pssm, 1.0).is_none());
    }

    #[test]
    fn scores_past_the_table_saturate() {
        let pssm = Pssm::from_parts(
            Alphabet::Dna,
            vec![vec![0, 1, 2, 10], vec![0, 1, 2, 10]],
            1.0,
            0.0,
            10,
            vec![1.0, 0.5, 0.25, 0.125],
            None,
        )
        .unwrap();
        let site = score_window(b"TT", f64::NAN, &pssm, 1.0).unwrap();
        assert_eq!(site.pvalue, 0.125);
        assert_eq!(site.score, 3.0);
        let low = score_window(b"AC", f64::NAN, &pssm, 1.0).unwrap();
        assert_eq!(low.pvalue, 0.5);
        assert_eq!(low.score, 1.0);
    }

    #[test]
    fn prior_shifts_score_and_uses_wider_table() {
        let dist = PriorDist::new(0.1, 0.9, 0.5, vec![0.5, 0.5]).unwrap();
        let pssm = Pssm::build(
            &consensus_motif(),
            &Background::uniform(Alphabet::Dna),
            Some(&dist),
            1.0,
            PSSM_RANGE,
        )
        .unwrap();
        let table = pssm.prior_pv().unwrap();
        assert_eq!(table.len(), 5 * PSSM_RANGE + 1);
        let plain = score_window(b"ACGT", f64::NAN, &pssm, 1.0).unwrap();
        let favoured = score_window(b"ACGT", 0.9, &pssm, 1.0).unwrap();
        let disfavoured = score_window(b"ACGT", 0.1, &pssm, 1.0).unwrap();
        assert!((favoured.score - plain.score - 0.9f64.log2() + 0.1f64.log2()).abs() < 1e-2);
        assert!(favoured.pvalue < disfavoured.pvalue);
    }

    #[test]
    fn lookup_dump_has_two_lines() {
        let pssm = Pssm::from_parts(
            Alphabet::Dna,
            vec![vec![0, 1, 1, 1]],
            1.0,
            0.0,
            1,
            vec![1.0, 0.75],
            None,
        )
        .unwrap();
        let mut out = Vec::new();
        pssm.write_pv_lookup(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 0.75\n0.25\n");
    }
}
