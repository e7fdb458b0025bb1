use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::info;

use fimors::io::TextSource;
use fimors::prior::build::{CreatePriorsOptions, create_priors};

use super::OutputDir;

pub const DEFAULT_OUT_DIR: &str = "create-priors_out";

pub struct CreatePriorsArgs {
    pub out_dir: OutputDir,
    pub seq_size: u64,
    pub beta: f64,
    pub num_bins: usize,
    pub psp: bool,
    pub seed: u64,
    pub wiggle_file: PathBuf,
}

pub fn run(args: CreatePriorsArgs) -> Result<()> {
    let options = CreatePriorsOptions {
        beta: args.beta,
        seq_size: args.seq_size,
        num_bins: args.num_bins,
        write_psp: args.psp,
        seed: args.seed,
    };
    options
        .validate()
        .map_err(|err| anyhow!("create-priors failed: {err}"))?;
    args.out_dir.prepare()?;

    let summary = create_priors(
        TextSource::from_arg(&args.wiggle_file),
        &args.out_dir.path,
        &options,
    )
    .map_err(|err| anyhow!("create-priors failed: {err}"))?;

    info!(
        "sum of normalized priors is {:.6}; prior distribution median {}",
        summary.normalized_sum,
        summary.dist.median()
    );
    for file in &summary.files {
        info!("wrote {}", file.display());
    }
    Ok(())
}
