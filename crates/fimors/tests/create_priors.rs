use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use fimors::alphabet::Alphabet;
use fimors::fasta::SeqReaderFromFasta;
use fimors::io::TextSource;
use fimors::matches::MatchRecord;
use fimors::motif::{MotifLoadOptions, load_motifs};
use fimors::prior::PriorDist;
use fimors::prior::build::{
    CreatePriorsOptions, PRIORS_DIST_FILENAME, PRIORS_WIG_FILENAME, create_priors,
};
use fimors::prior::open_prior_reader;
use fimors::scan::{ScanOptions, Scanner};

mod helpers;

fn scores_wig() -> String {
    let mut wig = String::from("track type=wiggle_0 name=conservation\n");
    wig.push_str("variableStep chrom=chr1\n");
    for pos in (1..=80).step_by(4) {
        wig.push_str(&format!("{pos} {}\n", (pos % 7) as f64 / 7.0 + 0.1));
    }
    wig.push_str("fixedStep chrom=chr2 start=1 step=1\n");
    for i in 0..40 {
        wig.push_str(&format!("{}\n", (i % 5) as f64 / 5.0));
    }
    wig
}

fn options() -> CreatePriorsOptions {
    CreatePriorsOptions {
        beta: 10.0,
        seq_size: 200,
        num_bins: 20,
        ..CreatePriorsOptions::default()
    }
}

#[test]
fn priors_sum_to_beta_over_the_sequence() {
    let fixture = helpers::Fixture::new();
    let wig = fixture.write("scores.wig", &scores_wig());
    let out = fixture.path("out");
    std::fs::create_dir(&out).unwrap();
    let summary = create_priors(TextSource::Path(wig), &out, &options()).unwrap();
    assert_eq!(summary.stats.covered, 60);
    assert!((summary.normalized_sum - 10.0).abs() < 1e-6);

    let dist = PriorDist::load(&out.join(PRIORS_DIST_FILENAME)).unwrap();
    assert_eq!(dist.bins().len(), 20);
    let total: f64 = dist.bins().iter().sum();
    assert!((total - 1.0).abs() < 1e-4, "{total}");
    assert!(dist.min() <= dist.median() && dist.median() <= dist.max());
}

#[test]
fn generated_priors_drive_a_scan() {
    let fixture = helpers::Fixture::new();
    let wig = fixture.write("scores.wig", &scores_wig());
    let out = fixture.path("out");
    std::fs::create_dir(&out).unwrap();
    create_priors(TextSource::Path(wig), &out, &options()).unwrap();

    let dist = PriorDist::load(&out.join(PRIORS_DIST_FILENAME)).unwrap();
    let mut priors =
        open_prior_reader(&out.join(PRIORS_WIG_FILENAME), false, dist.median()).unwrap();
    let seq1 = helpers::make_seq(21, 90);
    let seq2 = helpers::make_seq(22, 45);
    let mut reader = SeqReaderFromFasta::new(
        TextSource::memory(
            "seqs.fa",
            helpers::fasta_text(&[("chr1", &seq1), ("chr2", &seq2)]).into_bytes(),
        ),
        Alphabet::Dna,
        false,
    )
    .unwrap();
    let motif_text = helpers::meme_text(&[("m", helpers::consensus_rows(b"TACG"))], None);
    let set = load_motifs(
        &TextSource::memory("m.meme", motif_text.into_bytes()),
        &MotifLoadOptions::default(),
    )
    .unwrap();
    let options = ScanOptions {
        output_threshold: 1.0,
        ..ScanOptions::default()
    };
    let mut sink: Vec<MatchRecord> = Vec::new();
    let summary = Scanner::new(options, &set)
        .unwrap()
        .with_prior_dist(&dist)
        .run(&mut reader, Some(priors.as_mut()), &mut sink)
        .unwrap();
    let result = &summary.results[0];
    assert_eq!(result.num_sequences, 2);
    assert_eq!(result.num_positions, 135);
    assert_eq!(result.matches.len(), 2 * (87 + 42));
    assert!(result.matches.iter().all(|m| m.pvalue <= 1.0));
}

#[test]
fn gzipped_wiggle_input_is_read() {
    let fixture = helpers::Fixture::new();
    let path = fixture.path("scores.wig.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(scores_wig().as_bytes()).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let out = fixture.path("out");
    std::fs::create_dir(&out).unwrap();
    let summary = create_priors(TextSource::Path(path), &out, &options()).unwrap();
    assert_eq!(summary.stats.covered, 60);
}
