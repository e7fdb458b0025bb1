use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::info;

use fimors::block::PriorReader;
use fimors::fasta::SeqReaderFromFasta;
use fimors::io::TextSource;
use fimors::matches::MatchRecord;
use fimors::motif::{BackgroundSource, MotifLoadOptions, load_motifs};
use fimors::prior::{PriorDist, open_prior_reader};
use fimors::scan::output::{TEXT_FILENAME, write_header, write_results};
use fimors::scan::{ScanOptions, ScanSummary, Scanner, TextSink, ThresholdType};

use super::OutputDir;

pub const DEFAULT_OUT_DIR: &str = "fimo_out";

pub struct ScanArgs {
    pub out_dir: OutputDir,
    pub text: bool,
    pub thresh: f64,
    pub qv_thresh: bool,
    pub no_qvalue: bool,
    pub norc: bool,
    pub max_strand: bool,
    pub max_stored_scores: usize,
    pub motifs: Vec<String>,
    pub bgfile: String,
    pub motif_pseudo: f64,
    pub psp: Option<PathBuf>,
    pub prior_dist: Option<PathBuf>,
    pub alpha: f64,
    pub parse_genomic_coord: bool,
    pub pval_lookup: Option<PathBuf>,
    pub seed: u64,
    pub motif_file: PathBuf,
    pub sequence_file: PathBuf,
}

pub fn background_source(arg: &str) -> BackgroundSource {
    match arg {
        "motif-file" | "--motif--" => BackgroundSource::MotifFile,
        "uniform" | "--uniform--" => BackgroundSource::Uniform,
        path => BackgroundSource::File(PathBuf::from(path)),
    }
}

fn scan_options(args: &ScanArgs) -> Result<ScanOptions> {
    if args.qv_thresh && args.no_qvalue {
        return Err(anyhow!("--qv-thresh cannot be combined with --no-qvalue"));
    }
    if args.qv_thresh && args.text {
        return Err(anyhow!("--qv-thresh cannot be combined with --text"));
    }
    Ok(ScanOptions {
        alpha: args.alpha,
        output_threshold: args.thresh,
        threshold_type: if args.qv_thresh {
            ThresholdType::QValue
        } else {
            ThresholdType::PValue
        },
        max_stored_scores: args.max_stored_scores,
        scan_both_strands: !args.norc,
        max_strand: args.max_strand,
        compute_qvalues: !args.no_qvalue && !args.text,
        text_only: args.text,
        seed: args.seed,
        selected_motifs: args.motifs.clone(),
        ..ScanOptions::default()
    })
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|err| anyhow!("cannot create {}: {err}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn run(args: ScanArgs) -> Result<()> {
    let options = scan_options(&args)?;
    let threshold_type = options.threshold_type;
    let with_qvalue = options.compute_qvalues;

    let motif_set = load_motifs(
        &TextSource::from_arg(&args.motif_file),
        &MotifLoadOptions {
            pseudocount: args.motif_pseudo,
            background: background_source(&args.bgfile),
        },
    )
    .map_err(|err| anyhow!("reading motifs failed: {err}"))?;

    let prior_dist = args
        .prior_dist
        .as_deref()
        .map(PriorDist::load)
        .transpose()
        .map_err(|err| anyhow!("reading prior distribution failed: {err}"))?;
    let mut prior_reader: Option<Box<dyn PriorReader>> = match (&args.psp, &prior_dist) {
        (Some(path), Some(dist)) => Some(
            open_prior_reader(path, args.parse_genomic_coord, dist.median())
                .map_err(|err| anyhow!("reading priors failed: {err}"))?,
        ),
        (None, None) => None,
        _ => return Err(anyhow!("--psp and --prior-dist must be given together")),
    };

    let mut seq_reader = SeqReaderFromFasta::new(
        TextSource::from_arg(&args.sequence_file),
        motif_set.alphabet,
        args.parse_genomic_coord,
    )
    .map_err(|err| anyhow!("reading sequences failed: {err}"))?;

    let mut pv_out = args.pval_lookup.as_deref().map(create).transpose()?;

    let mut scanner =
        Scanner::new(options, &motif_set).map_err(|err| anyhow!("scan failed: {err}"))?;
    if let Some(dist) = prior_dist.as_ref() {
        scanner = scanner.with_prior_dist(dist);
    }
    if let Some(out) = pv_out.as_mut() {
        scanner = scanner.with_pv_lookup(out);
    }

    let summary: ScanSummary = if args.text {
        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        write_header(&mut out)?;
        let mut sink = TextSink::new(out);
        let summary = scanner
            .run(&mut seq_reader, prior_reader.as_deref_mut(), &mut sink)
            .map_err(|err| anyhow!("scan failed: {err}"))?;
        sink.into_inner().flush()?;
        summary
    } else {
        args.out_dir.prepare()?;
        let mut unused: Vec<MatchRecord> = Vec::new();
        let summary = scanner
            .run(&mut seq_reader, prior_reader.as_deref_mut(), &mut unused)
            .map_err(|err| anyhow!("scan failed: {err}"))?;
        let path = args.out_dir.path.join(TEXT_FILENAME);
        let mut out = create(&path)?;
        write_results(&mut out, &summary.results, threshold_type, args.thresh, with_qvalue)?;
        out.flush()?;
        info!("wrote {}", path.display());
        summary
    };
    drop(scanner);
    if let Some(mut out) = pv_out {
        out.flush()?;
    }

    info!(
        "scanned {} sequences with {} motifs ({} positions)",
        summary.num_sequences,
        summary.results.len(),
        summary.num_positions
    );
    Ok(())
}
