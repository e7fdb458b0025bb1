use std::path::PathBuf;

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("missing file: {0}")]
    MissingFile(PathBuf),
    #[error("{source_name} contains invalid prior value: {value}")]
    InvalidPrior { source_name: String, value: String },
    #[error("sequence mismatch: {0}")]
    SequenceMismatch(String),
    #[error("prior data error: {0}")]
    PriorData(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid reader state: {0}")]
    InvalidState(String),
}

impl Error {
    pub(crate) fn parse(source: &str, line_no: usize, message: impl std::fmt::Display) -> Self {
        Error::InvalidFormat(format!("{source}:{line_no}: {message}"))
    }
}
