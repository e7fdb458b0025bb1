use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(
    name = "fimors-cli",
    version,
    about = "Scan sequences for motif occurrences with position specific priors"
)]
struct Cli {
    /// 1 errors only, 2 progress, 3 debug, 4 trace.
    #[arg(long, global = true, default_value_t = 2)]
    verbosity: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Version,
    #[command(about = "Scan FASTA sequences with the motifs of a MEME file")]
    Scan {
        /// Output directory; refuses to overwrite an existing one.
        #[arg(long = "o", conflicts_with = "oc")]
        out: Option<PathBuf>,
        /// Output directory; an existing one is overwritten.
        #[arg(long = "oc")]
        oc: Option<PathBuf>,
        /// Stream matches to standard output instead of writing fimo.txt.
        #[arg(long)]
        text: bool,
        #[arg(long, default_value_t = fimors::scan::DEFAULT_OUTPUT_THRESHOLD)]
        thresh: f64,
        /// Apply --thresh to q-values instead of p-values.
        #[arg(long)]
        qv_thresh: bool,
        #[arg(long)]
        no_qvalue: bool,
        /// Scan the given strand only.
        #[arg(long)]
        norc: bool,
        /// Report only the better scoring strand of each site.
        #[arg(long)]
        max_strand: bool,
        #[arg(long, default_value_t = fimors::scan::DEFAULT_MAX_STORED_SCORES)]
        max_stored_scores: usize,
        /// Scan only this motif id; may be repeated.
        #[arg(long = "motif")]
        motifs: Vec<String>,
        /// `motif-file`, `uniform` or a background model file.
        #[arg(long, default_value = "motif-file")]
        bgfile: String,
        #[arg(long, default_value_t = fimors::motif::DEFAULT_PSEUDOCOUNT)]
        motif_pseudo: f64,
        /// Position specific priors (PSP or wiggle).
        #[arg(long, requires = "prior_dist")]
        psp: Option<PathBuf>,
        /// Prior distribution written by create-priors.
        #[arg(long, requires = "psp")]
        prior_dist: Option<PathBuf>,
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,
        #[arg(long)]
        parse_genomic_coord: bool,
        #[arg(long, hide = true)]
        pval_lookup: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        motif_file: PathBuf,
        /// FASTA sequences; `-` reads standard input.
        sequence_file: PathBuf,
    },
    #[command(about = "Turn a wiggle score track into position specific priors")]
    CreatePriors {
        #[arg(long = "o", conflicts_with = "oc")]
        out: Option<PathBuf>,
        #[arg(long = "oc")]
        oc: Option<PathBuf>,
        /// Estimated total length of the scored sequences.
        #[arg(long)]
        seq_size: u64,
        #[arg(long, default_value_t = 10_000.0)]
        beta: f64,
        #[arg(long, default_value_t = 100)]
        num_bins: usize,
        /// Also write the priors in PSP format.
        #[arg(long)]
        psp: bool,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        wiggle_file: PathBuf,
    },
}

fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 | 1 => LevelFilter::ERROR,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_filter(level_filter(verbosity)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Scan {
            out,
            oc,
            text,
            thresh,
            qv_thresh,
            no_qvalue,
            norc,
            max_strand,
            max_stored_scores,
            motifs,
            bgfile,
            motif_pseudo,
            psp,
            prior_dist,
            alpha,
            parse_genomic_coord,
            pval_lookup,
            seed,
            motif_file,
            sequence_file,
        } => commands::scan::run(commands::scan::ScanArgs {
            out_dir: commands::OutputDir::from_flags(out, oc, commands::scan::DEFAULT_OUT_DIR),
            text,
            thresh,
            qv_thresh,
            no_qvalue,
            norc,
            max_strand,
            max_stored_scores,
            motifs,
            bgfile,
            motif_pseudo,
            psp,
            prior_dist,
            alpha,
            parse_genomic_coord,
            pval_lookup,
            seed,
            motif_file,
            sequence_file,
        }),
        Commands::CreatePriors {
            out,
            oc,
            seq_size,
            beta,
            num_bins,
            psp,
            seed,
            wiggle_file,
        } => commands::create_priors::run(commands::create_priors::CreatePriorsArgs {
            out_dir: commands::OutputDir::from_flags(
                out,
                oc,
                commands::create_priors::DEFAULT_OUT_DIR,
            ),
            seq_size,
            beta,
            num_bins,
            psp,
            seed,
            wiggle_file,
        }),
    }
}
