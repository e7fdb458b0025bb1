#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::PathBuf;

use tempfile::TempDir;

/// Temporary directory holding the input files of one test.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }
}

pub fn make_seq(seed: usize, len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut state = 0x9e37_79b9_7f4a_7c15u64 ^ (seed as u64);
    for _ in 0..len {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let idx = (state >> 32) as usize & 3;
        seq.push(bases[idx]);
    }
    seq
}

pub fn fasta_text(records: &[(&str, &[u8])]) -> String {
    let mut out = String::new();
    for (name, seq) in records {
        out.push('>');
        out.push_str(name);
        out.push('\n');
        // Wrap at 60 columns like most FASTA writers.
        for line in seq.chunks(60) {
            out.push_str(std::str::from_utf8(line).unwrap_or(""));
            out.push('\n');
        }
    }
    out
}

pub fn psp_text(records: &[(&str, &[f64])]) -> String {
    let mut out = String::new();
    for (name, priors) in records {
        writeln!(out, ">{name}").unwrap();
        for chunk in priors.chunks(10) {
            let line: Vec<String> = chunk.iter().map(|p| p.to_string()).collect();
            writeln!(out, "{}", line.join(" ")).unwrap();
        }
    }
    out
}

/// A DNA motif strongly preferring `consensus`.
pub fn consensus_rows(consensus: &[u8]) -> Vec<[f64; 4]> {
    consensus
        .iter()
        .map(|&b| {
            let mut row = [0.01; 4];
            let idx = match b {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                _ => 3,
            };
            row[idx] = 0.97;
            row
        })
        .collect()
}

pub fn meme_text(motifs: &[(&str, Vec<[f64; 4]>)], background: Option<[f64; 4]>) -> String {
    let mut out = String::from("MEME version 4\n\nALPHABET= ACGT\n\nstrands: + -\n\n");
    if let Some(bg) = background {
        writeln!(out, "Background letter frequencies").unwrap();
        writeln!(out, "A {} C {} G {} T {}\n", bg[0], bg[1], bg[2], bg[3]).unwrap();
    }
    for (id, rows) in motifs {
        writeln!(out, "MOTIF {id}").unwrap();
        writeln!(
            out,
            "letter-probability matrix: alength= 4 w= {} nsites= 20 E= 0",
            rows.len()
        )
        .unwrap();
        for row in rows {
            writeln!(out, " {} {} {} {}", row[0], row[1], row[2], row[3]).unwrap();
        }
        out.push('\n');
    }
    out
}

pub fn dist_text(min: f64, max: f64, median: f64, bins: &[f64]) -> String {
    let mut out = String::new();
    for value in [min, max, median].iter().chain(bins) {
        writeln!(out, "{value}").unwrap();
    }
    out
}
