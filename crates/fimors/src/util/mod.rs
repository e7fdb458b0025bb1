//! Sequence header helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static UCSC_COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^\s:]+):([0-9]+)-([0-9]+)(\([+-]\))?(_\S+)?").expect("valid UCSC regex")
});

static GALAXY_COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^\s_]+_[^\s_]+)_([0-9]+)_([0-9]+)(_[+-])?").expect("valid Galaxy regex")
});

static PLAIN_COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^\s:]+):([0-9]+)-([0-9]+)").expect("valid coordinate regex")
});

/// Genomic location embedded in a sequence header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicCoordinates {
    pub chrom: String,
    /// 1-based first position.
    pub start: u64,
    /// 1-based last position.
    pub end: u64,
    pub strand: Option<char>,
}

/// Parse a UCSC/bedtools header (`chr1:1000-1010(-)_id`) or, failing that,
/// a Galaxy "fetch sequences" header (`mm9_chr18_75759530_75759729_+`).
pub fn parse_genomic_coordinates(header: &str) -> Option<GenomicCoordinates> {
    if let Some(caps) = UCSC_COORDINATES.captures(header) {
        let strand = caps
            .get(4)
            .and_then(|m| m.as_str().chars().nth(1));
        return Some(GenomicCoordinates {
            chrom: caps[1].to_string(),
            start: caps[2].parse().ok()?,
            end: caps[3].parse().ok()?,
            strand,
        });
    }
    let caps = GALAXY_COORDINATES.captures(header)?;
    let strand = caps.get(4).and_then(|m| m.as_str().chars().nth(1));
    Some(GenomicCoordinates {
        chrom: caps[1].to_string(),
        start: caps[2].parse().ok()?,
        end: caps[3].parse().ok()?,
        strand,
    })
}

/// Parse the `name:start-stop` form used by PSP headers.
pub fn parse_plain_coordinates(header: &str) -> Option<GenomicCoordinates> {
    let caps = PLAIN_COORDINATES.captures(header)?;
    Some(GenomicCoordinates {
        chrom: caps[1].to_string(),
        start: caps[2].parse().ok()?,
        end: caps[3].parse().ok()?,
        strand: None,
    })
}

/// Sequence name from a header line: text up to the first whitespace, and
/// also up to the first `:` when genomic coordinates are expected.
pub fn parse_seq_name(header: &str, stop_at_colon: bool) -> Option<&str> {
    let trimmed = header.trim_start();
    let end = trimmed
        .find(|c: char| c.is_whitespace() || (stop_at_colon && c == ':'))
        .unwrap_or(trimmed.len());
    let name = &trimmed[..end];
    if name.is_empty() { None } else { Some(name) }
}
