//! Core library for fimors: scanning sequences with position-specific
//! scoring matrices, optionally weighted by position-specific priors.

pub mod alphabet;
pub mod block;
pub mod error;
pub mod fasta;
pub mod io;
pub mod matches;
pub mod motif;
pub mod prior;
pub mod psp;
pub mod pssm;
pub mod qvalue;
pub mod reservoir;
pub mod scan;
pub mod util;
pub mod wiggle;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
