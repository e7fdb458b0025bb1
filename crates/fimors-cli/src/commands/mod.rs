use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

pub mod create_priors;
pub mod scan;
pub mod version;

/// Output directory selected with `--o` (no clobbering) or `--oc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDir {
    pub path: PathBuf,
    pub allow_clobber: bool,
}

impl OutputDir {
    pub fn from_flags(out: Option<PathBuf>, oc: Option<PathBuf>, default: &str) -> Self {
        match (out, oc) {
            (Some(path), _) => Self {
                path,
                allow_clobber: false,
            },
            (None, Some(path)) => Self {
                path,
                allow_clobber: true,
            },
            (None, None) => Self {
                path: PathBuf::from(default),
                allow_clobber: true,
            },
        }
    }

    /// Create the directory, refusing an existing one unless clobbering
    /// is allowed.
    pub fn prepare(&self) -> Result<()> {
        if self.path.exists() {
            if !self.allow_clobber {
                return Err(anyhow!(
                    "output directory {} already exists; use --oc to overwrite it",
                    self.path.display()
                ));
            }
            if !self.path.is_dir() {
                return Err(anyhow!("{} is not a directory", self.path.display()));
            }
            return Ok(());
        }
        fs::create_dir_all(&self.path)
            .map_err(|err| anyhow!("cannot create {}: {err}", self.path.display()))
    }
}
