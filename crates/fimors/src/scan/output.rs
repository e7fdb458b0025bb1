//! Tab-separated match output.

use std::io::Write;

use crate::matches::MatchRecord;
use crate::scan::{MotifScanResult, ThresholdType};

pub const TEXT_HEADER: &str = "#pattern name\tsequence name\tstart\tstop\tstrand\tscore\tp-value\tq-value\tmatched sequence";

pub const TEXT_FILENAME: &str = "fimo.txt";

/// Format `value` like C's `%.{precision}g`.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

pub fn write_header(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{TEXT_HEADER}")
}

/// Write one match row. The q-value column is left empty when
/// `with_qvalue` is false.
pub fn write_match(out: &mut impl Write, record: &MatchRecord, with_qvalue: bool) -> std::io::Result<()> {
    let qvalue = if with_qvalue {
        format_general(record.qvalue, 3)
    } else {
        String::new()
    };
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        record.motif_id,
        record.seq_name,
        record.low(),
        record.high(),
        record.strand.symbol(),
        format_general(record.score, 6),
        format_general(record.pvalue, 3),
        qvalue,
        record.sequence
    )
}

/// Write the retained matches of every motif, filtered by q-value when
/// the threshold applies to q-values.
pub fn write_results(
    out: &mut impl Write,
    results: &[MotifScanResult],
    threshold_type: ThresholdType,
    threshold: f64,
    with_qvalue: bool,
) -> std::io::Result<()> {
    write_header(out)?;
    for result in results {
        for record in &result.matches {
            if threshold_type == ThresholdType::QValue && !(record.qvalue <= threshold) {
                continue;
            }
            write_match(out, record, with_qvalue)?;
        }
    }
    Ok(())
}
