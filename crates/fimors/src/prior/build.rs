//! Building position-specific priors from a wiggle score track.
//!
//! Scores are mapped to priors with the affine transform
//! `prior(y) = y (1 - a) / y_max + a`, `a = (beta - 1) / (n - 1)`, where
//! `n` is the estimated sequence size. Priors are then normalized so that
//! they sum to `beta` over the whole sequence, with uncovered positions
//! assumed to carry the median score.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::io::TextSource;
use crate::prior::PriorDist;
use crate::reservoir::ReservoirSampler;
use crate::scan::output::format_general;
use crate::wiggle::{DEFAULT_SPAN, WiggleFormat, WiggleReader};
use crate::{Error, Result};

pub const PRIORS_WIG_FILENAME: &str = "priors.wig";
pub const PRIORS_DIST_FILENAME: &str = "priors.dist";
pub const PRIORS_PSP_FILENAME: &str = "create-priors.psp";

const MEDIAN_SAMPLES: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePriorsOptions {
    /// Expected number of sites; the normalized priors sum to this.
    pub beta: f64,
    /// Estimated total sequence length.
    pub seq_size: u64,
    pub num_bins: usize,
    pub write_psp: bool,
    pub seed: u64,
}

impl Default for CreatePriorsOptions {
    fn default() -> Self {
        Self {
            beta: 10_000.0,
            seq_size: 0,
            num_bins: 100,
            write_psp: false,
            seed: 0,
        }
    }
}

impl CreatePriorsOptions {
    pub fn validate(&self) -> Result<()> {
        if self.seq_size < 2 {
            return Err(Error::InvalidConfig(
                "the estimated sequence size must be at least 2".into(),
            ));
        }
        if !(self.beta >= 1.0 && self.beta < self.seq_size as f64) {
            return Err(Error::InvalidConfig(format!(
                "beta must be in [1, seq_size), got {}",
                self.beta
            )));
        }
        if self.num_bins == 0 {
            return Err(Error::InvalidConfig("number of bins must be positive".into()));
        }
        Ok(())
    }

    fn intercept(&self) -> f64 {
        (self.beta - 1.0) / (self.seq_size - 1) as f64
    }
}

/// Summary of the raw wiggle scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub sum: f64,
    /// Positions covered by wiggle records.
    pub covered: u64,
}

#[derive(Debug, Clone)]
pub struct CreatePriorsSummary {
    pub stats: ScoreStats,
    /// Sum of untransformed priors over `seq_size` positions.
    pub prior_sum: f64,
    /// Sum of normalized priors; equals `beta` up to rounding.
    pub normalized_sum: f64,
    pub dist: PriorDist,
    pub files: Vec<PathBuf>,
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// First pass: range, coverage, sum and sampled median of the scores.
pub fn score_stats(reader: &mut WiggleReader, seed: u64) -> Result<ScoreStats> {
    let mut sampler = ReservoirSampler::new(MEDIAN_SAMPLES, seed)?;
    let mut stats = ScoreStats {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        median: f64::NAN,
        sum: 0.0,
        covered: 0,
    };
    while reader.next_declaration()? {
        while let Some(record) = reader.next_record()? {
            stats.min = stats.min.min(record.value);
            stats.max = stats.max.max(record.value);
            stats.covered += record.span;
            stats.sum += record.span as f64 * record.value;
            for _ in 0..record.span {
                sampler.sample(record.value);
            }
        }
    }
    if stats.covered == 0 {
        return Err(Error::PriorData(format!(
            "{} contains no wiggle scores",
            reader.source_name()
        )));
    }
    stats.median = median(sampler.samples().to_vec());
    Ok(stats)
}

/// Maps raw scores to priors.
#[derive(Debug, Clone, Copy)]
struct Transform {
    intercept: f64,
    y_max: f64,
}

impl Transform {
    fn prior(&self, y: f64) -> f64 {
        y * (1.0 - self.intercept) / self.y_max + self.intercept
    }
}

/// Sum of priors over the full sequence, from the score sum.
fn prior_sum(stats: &ScoreStats, transform: Transform, seq_size: u64) -> f64 {
    let covered = transform.prior(stats.sum) + (stats.covered - 1) as f64 * transform.intercept;
    covered + (seq_size - stats.covered) as f64 * transform.prior(stats.median)
}

struct Binning {
    min: f64,
    scale: f64,
    last: usize,
}

impl Binning {
    fn new(min: f64, max: f64, num_bins: usize) -> Self {
        let scale = if max > min { (num_bins - 1) as f64 / (max - min) } else { 0.0 };
        Self { min, scale, last: num_bins - 1 }
    }

    fn index(&self, prior: f64) -> usize {
        let scaled = ((prior - self.min) * self.scale).round();
        (scaled.max(0.0) as usize).min(self.last)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Read the wiggle track twice and write `priors.wig`, `priors.dist` and,
/// when requested, `create-priors.psp` into `out_dir`.
pub fn create_priors(
    source: TextSource,
    out_dir: &Path,
    options: &CreatePriorsOptions,
) -> Result<CreatePriorsSummary> {
    options.validate()?;
    info!(beta = options.beta, "creating priors");
    let mut reader = WiggleReader::new(source)?;
    let stats = score_stats(&mut reader, options.seed)?;
    if stats.max <= 0.0 {
        return Err(Error::PriorData(
            "the maximum observed score is not positive; unable to compute priors".into(),
        ));
    }
    if stats.covered > options.seq_size {
        return Err(Error::InvalidConfig(format!(
            "scores cover {} positions but the sequence size is {}",
            stats.covered, options.seq_size
        )));
    }

    let transform = Transform {
        intercept: options.intercept(),
        y_max: stats.max,
    };
    let prior_sum = prior_sum(&stats, transform, options.seq_size);
    info!(
        seq_size = options.seq_size,
        covered = stats.covered,
        min = stats.min,
        median = stats.median,
        max = stats.max,
        score_sum = stats.sum,
        prior_sum,
        "wiggle score summary"
    );
    let normalize = |y: f64| transform.prior(y) * options.beta / prior_sum;
    let min_prior = normalize(stats.min);
    let max_prior = normalize(stats.max);
    let median_prior = normalize(stats.median);
    let binning = Binning::new(min_prior, max_prior, options.num_bins);
    let mut counts = vec![0u64; options.num_bins];

    reader.reset()?;
    let wig_path = out_dir.join(PRIORS_WIG_FILENAME);
    let mut wig_out = create(&wig_path)?;
    let psp_path = out_dir.join(PRIORS_PSP_FILENAME);
    let mut psp_out = if options.write_psp { Some(create(&psp_path)?) } else { None };
    let mut psp_chrom: Option<String> = None;
    let mut normalized_sum = 0.0;
    let mut num_priors = 0u64;

    while reader.next_declaration()? {
        let Some(declaration) = reader.declaration().cloned() else {
            break;
        };
        match declaration.format {
            WiggleFormat::VariableStep => write!(wig_out, "variableStep chrom={}", declaration.chrom)?,
            WiggleFormat::FixedStep => write!(
                wig_out,
                "fixedStep chrom={} start={} step={}",
                declaration.chrom, declaration.start, declaration.step
            )?,
        }
        if declaration.span != DEFAULT_SPAN {
            write!(wig_out, " span={}", declaration.span)?;
        }
        writeln!(wig_out)?;

        if let Some(psp) = psp_out.as_mut() {
            if declaration.format == WiggleFormat::FixedStep && declaration.step != declaration.span {
                return Err(Error::UnsupportedFeature(format!(
                    "PSP output needs step equal to span, found step={} span={}",
                    declaration.step, declaration.span
                )));
            }
            if psp_chrom.as_deref() != Some(declaration.chrom.as_str()) {
                writeln!(psp, ">{}", declaration.chrom)?;
                psp_chrom = Some(declaration.chrom.clone());
            }
        }

        while let Some(record) = reader.next_record()? {
            let prior = normalize(record.value);
            normalized_sum += record.span as f64 * prior;
            counts[binning.index(prior)] += record.span;
            num_priors += record.span;
            match declaration.format {
                WiggleFormat::VariableStep => {
                    writeln!(wig_out, "{} {}", record.start, format_general(prior, 6))?
                }
                WiggleFormat::FixedStep => writeln!(wig_out, "{}", format_general(prior, 6))?,
            }
            if let Some(psp) = psp_out.as_mut() {
                for _ in 0..record.span {
                    write!(psp, "{prior:.10} ")?;
                }
                writeln!(psp)?;
            }
        }
    }
    wig_out.flush()?;
    let mut files = vec![wig_path];
    if let Some(mut psp) = psp_out {
        psp.flush()?;
        files.push(psp_path);
    }

    let missing = options.seq_size.saturating_sub(num_priors);
    if missing > 0 {
        counts[binning.index(median_prior)] += missing;
        normalized_sum += missing as f64 * median_prior;
    }
    debug!(normalized_sum, "sum of normalized priors");

    let bins: Vec<f64> = counts
        .iter()
        .map(|&count| count as f64 / options.seq_size as f64)
        .collect();
    let dist_path = out_dir.join(PRIORS_DIST_FILENAME);
    let mut dist_out = create(&dist_path)?;
    for value in [min_prior, max_prior, median_prior].iter().chain(&bins) {
        writeln!(dist_out, "{}", format_general(*value, 6))?;
    }
    dist_out.flush()?;
    files.push(dist_path);

    let dist = PriorDist::new(min_prior, max_prior, median_prior, bins)?;
    Ok(CreatePriorsSummary {
        stats,
        prior_sum,
        normalized_sum,
        dist,
        files,
    })
}
