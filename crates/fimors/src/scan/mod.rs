//! The motif scanning driver.
//!
//! For every selected motif the sequence reader is walked window by
//! window; the prior reader, when present, is advanced in lockstep by
//! sequence name. Matches at or below the output threshold are either
//! streamed to a [`MatchSink`] (text mode) or kept in a bounded
//! [`MatchStore`] and given q-values once the motif is done.

use std::io::Write;

use tracing::{debug, info, warn};

use crate::alphabet::{Alphabet, reverse_complement};
use crate::block::{DataBlock, DataBlockReader, PriorReader};
use crate::matches::{MatchRecord, MatchStore, Strand};
use crate::motif::{Background, Motif, MotifSet};
use crate::prior::{PriorCursor, PriorDist};
use crate::pssm::{PSSM_RANGE, Pssm, SiteScore, score_window};
use crate::qvalue::compute_qvalues;
use crate::reservoir::ReservoirSampler;
use crate::{Error, Result};

pub mod output;

pub const DEFAULT_OUTPUT_THRESHOLD: f64 = 1e-4;
pub const DEFAULT_MAX_STORED_SCORES: usize = 100_000;
pub const DEFAULT_RESERVOIR_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThresholdType {
    #[default]
    PValue,
    QValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Scale applied to priors before taking their log-odds.
    pub alpha: f64,
    pub output_threshold: f64,
    pub threshold_type: ThresholdType,
    pub max_stored_scores: usize,
    pub scan_both_strands: bool,
    /// Report only the better strand of each window.
    pub max_strand: bool,
    pub compute_qvalues: bool,
    /// Stream matches as they are found instead of storing them.
    pub text_only: bool,
    pub reservoir_size: usize,
    pub pssm_range: usize,
    pub seed: u64,
    /// Motif ids to scan; empty scans every motif.
    pub selected_motifs: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            output_threshold: DEFAULT_OUTPUT_THRESHOLD,
            threshold_type: ThresholdType::PValue,
            max_stored_scores: DEFAULT_MAX_STORED_SCORES,
            scan_both_strands: true,
            max_strand: false,
            compute_qvalues: true,
            text_only: false,
            reservoir_size: DEFAULT_RESERVOIR_SIZE,
            pssm_range: PSSM_RANGE,
            seed: 0,
            selected_motifs: Vec::new(),
        }
    }
}

impl ScanOptions {
    pub fn validate(&self) -> Result<()> {
        if self.threshold_type == ThresholdType::QValue && !self.compute_qvalues {
            return Err(Error::InvalidConfig(
                "a q-value threshold cannot be used without computing q-values".into(),
            ));
        }
        if self.threshold_type == ThresholdType::QValue && self.text_only {
            return Err(Error::InvalidConfig(
                "a q-value threshold cannot be used in text mode".into(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.output_threshold) {
            return Err(Error::InvalidConfig(format!(
                "output threshold must be in [0, 1], got {}",
                self.output_threshold
            )));
        }
        if self.max_stored_scores == 0 || self.reservoir_size == 0 || self.pssm_range == 0 {
            return Err(Error::InvalidConfig(
                "max stored scores, reservoir size and PSSM range must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Text mode keeps no p-value sample, so it cannot compute q-values.
    pub fn normalize(&mut self) {
        if self.text_only && self.compute_qvalues {
            warn!("q-values are not computed in text mode");
            self.compute_qvalues = false;
        }
    }
}

/// Receives matches as soon as they are found (text mode).
pub trait MatchSink {
    fn accept(&mut self, record: MatchRecord) -> Result<()>;
}

impl MatchSink for Vec<MatchRecord> {
    fn accept(&mut self, record: MatchRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

/// Writes each match as a tab-separated row without a q-value.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MatchSink for TextSink<W> {
    fn accept(&mut self, record: MatchRecord) -> Result<()> {
        output::write_match(&mut self.out, &record, false)?;
        Ok(())
    }
}

/// Outcome of scanning one motif.
#[derive(Debug, Clone)]
pub struct MotifScanResult {
    pub motif_id: String,
    pub width: usize,
    /// Retained matches in scan order (empty in text mode).
    pub matches: Vec<MatchRecord>,
    pub complete: bool,
    pub max_pvalue_retained: f64,
    pub num_sequences: usize,
    /// Residues scanned, summed over sequences.
    pub num_positions: u64,
    /// Sites scored and sampled for q-values.
    pub num_scored: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub results: Vec<MotifScanResult>,
    /// Motifs whose matches were truncated, with the worst p-value kept.
    pub incomplete: Vec<(String, f64)>,
    pub num_sequences: usize,
    pub num_positions: u64,
}

/// Per-motif recording state.
struct Recorder<'r> {
    text_only: bool,
    threshold: f64,
    store: Option<MatchStore>,
    reservoir: Option<&'r mut ReservoirSampler>,
    sink: &'r mut dyn MatchSink,
}

struct Site<'w> {
    motif_id: &'w str,
    seq_name: &'w str,
    window: &'w [u8],
    start: u64,
    stop: u64,
    strand: Strand,
}

impl Recorder<'_> {
    fn record(&mut self, site: &Site<'_>, scored: SiteScore) -> Result<()> {
        if let Some(reservoir) = self.reservoir.as_deref_mut() {
            reservoir.sample(scored.pvalue);
        }
        if !(scored.pvalue <= self.threshold) {
            return Ok(());
        }
        let mut sequence = site.window.to_vec();
        if site.strand == Strand::Reverse {
            reverse_complement(&mut sequence);
        }
        let record = MatchRecord {
            motif_id: site.motif_id.to_string(),
            seq_name: site.seq_name.to_string(),
            sequence: String::from_utf8_lossy(&sequence).into_owned(),
            start: site.start,
            stop: site.stop,
            strand: site.strand,
            score: scored.score,
            pvalue: scored.pvalue,
            qvalue: f64::NAN,
        };
        if self.text_only {
            self.sink.accept(record)
        } else {
            if let Some(store) = self.store.as_mut() {
                store.offer(record);
            }
            Ok(())
        }
    }
}

/// Scans every selected motif of a [`MotifSet`] over a sequence source.
pub struct Scanner<'a> {
    options: ScanOptions,
    motifs: &'a MotifSet,
    background: Background,
    prior_dist: Option<&'a PriorDist>,
    pv_lookup: Option<&'a mut dyn Write>,
}

impl<'a> Scanner<'a> {
    pub fn new(mut options: ScanOptions, motifs: &'a MotifSet) -> Result<Self> {
        options.validate()?;
        options.normalize();
        if motifs.alphabet == Alphabet::Protein && options.scan_both_strands {
            info!("protein motifs are scanned on one strand only");
            options.scan_both_strands = false;
        }
        let mut background = motifs.background.clone();
        if options.scan_both_strands {
            background.average_with_complement();
        }
        Ok(Self {
            options,
            motifs,
            background,
            prior_dist: None,
            pv_lookup: None,
        })
    }

    pub fn with_prior_dist(mut self, prior_dist: &'a PriorDist) -> Self {
        self.prior_dist = Some(prior_dist);
        self
    }

    /// Dump each forward PSSM's p-value table to `out`.
    pub fn with_pv_lookup(mut self, out: &'a mut dyn Write) -> Self {
        self.pv_lookup = Some(out);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn is_selected(&self, motif: &Motif) -> bool {
        self.options.selected_motifs.is_empty()
            || self.options.selected_motifs.iter().any(|id| id == motif.id())
    }

    /// Scan all selected motifs.
    ///
    /// Readers are rewound before every motif but the first, so a source
    /// that cannot be rewound supports a single motif only.
    pub fn run(
        &mut self,
        seq_reader: &mut dyn DataBlockReader,
        mut prior_reader: Option<&mut (dyn PriorReader + '_)>,
        sink: &mut dyn MatchSink,
    ) -> Result<ScanSummary> {
        if prior_reader.is_some() && self.prior_dist.is_none() {
            return Err(Error::InvalidConfig(
                "position specific priors require a prior distribution".into(),
            ));
        }
        let mut reservoir = if self.options.text_only {
            None
        } else {
            Some(ReservoirSampler::new(self.options.reservoir_size, self.options.seed)?)
        };

        let motifs = self.motifs;
        let mut summary = ScanSummary::default();
        let mut first = true;
        for motif in &motifs.motifs {
            if !self.is_selected(motif) {
                info!("skipping motif {}", motif.id());
                continue;
            }
            if !first {
                seq_reader.reset()?;
                if let Some(reader) = prior_reader.as_deref_mut() {
                    reader.reset()?;
                }
            }
            first = false;

            info!("using motif {} of width {}", motif.id(), motif.width());
            let alpha = self.options.alpha;
            let range = self.options.pssm_range;
            let pssm = Pssm::build(motif, &self.background, self.prior_dist, alpha, range)?;
            if let Some(out) = self.pv_lookup.as_deref_mut() {
                pssm.write_pv_lookup(out)?;
            }
            let rev_pssm = if self.options.scan_both_strands {
                let rev = motif.reverse_complement()?;
                info!("using motif -{} of width {}", motif.id(), rev.width());
                Some(Pssm::build(&rev, &self.background, self.prior_dist, alpha, range)?)
            } else {
                None
            };

            if let Some(reservoir) = reservoir.as_mut() {
                reservoir.clear();
            }
            let result = self.scan_motif(
                motif,
                &pssm,
                rev_pssm.as_ref(),
                seq_reader,
                prior_reader.as_deref_mut(),
                reservoir.as_mut(),
                sink,
            )?;
            if !result.complete {
                summary
                    .incomplete
                    .push((result.motif_id.clone(), result.max_pvalue_retained));
            }
            summary.num_sequences = result.num_sequences;
            summary.num_positions += result.num_positions;
            summary.results.push(result);
        }

        if first {
            warn!("none of the selected motifs were found");
        }
        for (id, max_pvalue) in &summary.incomplete {
            warn!(
                "motif {id} reached the limit of stored matches; only matches with p-value below {} were kept",
                output::format_general(*max_pvalue, 3)
            );
        }
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_motif(
        &self,
        motif: &Motif,
        pssm: &Pssm,
        rev_pssm: Option<&Pssm>,
        seq_reader: &mut dyn DataBlockReader,
        mut prior_reader: Option<&mut (dyn PriorReader + '_)>,
        mut reservoir: Option<&mut ReservoirSampler>,
        sink: &mut dyn MatchSink,
    ) -> Result<MotifScanResult> {
        let text_only = self.options.text_only;
        let mut recorder = Recorder {
            text_only,
            threshold: self.options.output_threshold,
            store: (!text_only).then(|| {
                MatchStore::new(self.options.max_stored_scores, self.options.output_threshold)
            }),
            reservoir: reservoir.as_deref_mut(),
            sink,
        };

        let mut num_sequences = 0;
        let mut num_positions = 0;
        while seq_reader.go_to_next_sequence()? {
            let seq_name = seq_reader.seq_name().unwrap_or_default().to_string();
            if let Some(reader) = prior_reader.as_deref_mut() {
                if !reader.go_to_next_sequence()? {
                    return Err(Error::SequenceMismatch(format!(
                        "reached the end of the priors before sequence {seq_name}"
                    )));
                }
                let prior_name = reader.seq_name().unwrap_or_default();
                if prior_name != seq_name {
                    return Err(Error::SequenceMismatch(format!(
                        "prior sequence {prior_name} does not match sequence {seq_name}"
                    )));
                }
            }
            num_positions += self.scan_sequence(
                motif,
                &seq_name,
                pssm,
                rev_pssm,
                seq_reader,
                prior_reader.as_deref_mut(),
                &mut recorder,
            )?;
            num_sequences += 1;
        }

        let num_scored = recorder
            .reservoir
            .as_deref()
            .map_or(0, ReservoirSampler::num_seen);
        let (mut matches, complete, max_pvalue_retained) = match recorder.store.take() {
            Some(store) => {
                let complete = store.is_complete();
                let max_pvalue = store.max_pvalue_retained();
                (store.finish(), complete, max_pvalue)
            }
            None => (Vec::new(), true, self.options.output_threshold),
        };
        if self.options.compute_qvalues {
            if let Some(reservoir) = recorder.reservoir.as_deref() {
                let pvalues: Vec<f64> = matches.iter().map(|m| m.pvalue).collect();
                let qvalues =
                    compute_qvalues(&pvalues, num_scored, reservoir.samples(), self.options.seed);
                for (record, q) in matches.iter_mut().zip(qvalues) {
                    record.qvalue = q;
                }
            }
        }
        debug!(
            "motif {}: {num_sequences} sequences, {num_positions} positions, {} matches kept",
            motif.id(),
            matches.len()
        );

        Ok(MotifScanResult {
            motif_id: motif.id().to_string(),
            width: motif.width(),
            matches,
            complete,
            max_pvalue_retained,
            num_sequences,
            num_positions,
            num_scored,
        })
    }

    /// Scan one sequence and return its length.
    #[allow(clippy::too_many_arguments)]
    fn scan_sequence(
        &self,
        motif: &Motif,
        seq_name: &str,
        pssm: &Pssm,
        rev_pssm: Option<&Pssm>,
        seq_reader: &mut dyn DataBlockReader,
        mut prior_reader: Option<&mut (dyn PriorReader + '_)>,
        recorder: &mut Recorder<'_>,
    ) -> Result<u64> {
        let width = pssm.width();
        let alpha = self.options.alpha;
        let forward = if motif.alphabet().is_complementable() {
            Strand::Forward
        } else {
            Strand::Unstranded
        };
        let mut block = DataBlock::sequence(width);
        let mut cursor = PriorCursor::new();
        let mut num_windows = 0u64;

        while seq_reader.next_block(&mut block)? {
            num_windows += 1;
            let start = block.start();
            let stop = start + width as u64 - 1;
            let prior = match prior_reader.as_deref_mut() {
                Some(reader) => cursor.prior_at(reader, seq_name, start)?,
                None => f64::NAN,
            };

            let window = block.residues();
            let Some(fwd) = score_window(window, prior, pssm, alpha) else {
                continue;
            };
            let rev = match rev_pssm {
                Some(rev_pssm) => match score_window(window, prior, rev_pssm, alpha) {
                    Some(rev) => Some(rev),
                    None => continue,
                },
                None => None,
            };

            let fwd_site = Site {
                motif_id: motif.id(),
                seq_name,
                window,
                start,
                stop,
                strand: forward,
            };
            let rev_site = Site {
                start: stop,
                stop: start,
                strand: Strand::Reverse,
                ..fwd_site
            };
            match rev {
                Some(rev) if self.options.max_strand => {
                    if fwd.score < rev.score {
                        recorder.record(&rev_site, rev)?;
                    } else {
                        recorder.record(&fwd_site, fwd)?;
                    }
                }
                Some(rev) => {
                    recorder.record(&fwd_site, fwd)?;
                    recorder.record(&rev_site, rev)?;
                }
                None => recorder.record(&fwd_site, fwd)?,
            }
        }

        // The final partial window still holds the trailing residues.
        Ok(num_windows + block.count() as u64)
    }
}
