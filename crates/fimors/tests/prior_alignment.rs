use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fimors::block::{DataBlockReader, PriorReader, VecPriorReader};
use fimors::prior::{PriorCursor, fill_prior_array, open_prior_reader};

mod helpers;

const DEFAULT_PRIOR: f64 = 0.25;

fn random_layout(rng: &mut StdRng, len: u64) -> Vec<(u64, usize, f64)> {
    let mut blocks = Vec::new();
    let mut next = rng.gen_range(1..=4u64);
    while next <= len {
        let count = rng.gen_range(1..=5usize);
        let value = rng.gen_range(1..1000) as f64 / 1000.0;
        blocks.push((next, count, value));
        next += count as u64 + rng.gen_range(0..=3u64);
    }
    if blocks.is_empty() {
        blocks.push((1, 1, 0.5));
    }
    blocks
}

fn incremental(reader: &mut dyn PriorReader, name: &str, len: u64) -> Vec<f64> {
    let mut cursor = PriorCursor::new();
    (1..=len)
        .map(|pos| cursor.prior_at(reader, name, pos).unwrap())
        .collect()
}

#[test]
fn incremental_lookup_matches_bulk_fill() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let len = rng.gen_range(1..60u64);
        let layout = random_layout(&mut rng, len);

        let mut a = VecPriorReader::new(vec![("s".into(), layout.clone())], DEFAULT_PRIOR);
        a.go_to_next_sequence().unwrap();
        let stepwise = incremental(&mut a, "s", len);

        let mut b = VecPriorReader::new(vec![("s".into(), layout.clone())], DEFAULT_PRIOR);
        b.go_to_next_sequence().unwrap();
        let mut bulk = vec![0.0; len as usize];
        fill_prior_array(&mut b, "s", 1, &mut bulk).unwrap();

        assert_eq!(stepwise, bulk, "layout {layout:?}");
    }
}

#[test]
fn lookups_move_forward_through_blocks_and_gaps() {
    let layout = vec![(0, 5, 0.1), (5, 5, 0.2), (12, 3, 0.3)];
    let d = DEFAULT_PRIOR;

    let mut reader = VecPriorReader::new(vec![("s".into(), layout.clone())], d);
    reader.go_to_next_sequence().unwrap();
    let mut cursor = PriorCursor::new();
    let got: Vec<f64> = [0, 4, 5, 9, 10, 11, 12, 14]
        .into_iter()
        .map(|pos| cursor.prior_at(&mut reader, "s", pos).unwrap())
        .collect();
    assert_eq!(got, vec![0.1, 0.1, 0.2, 0.2, d, d, 0.3, 0.3]);

    let mut reader = VecPriorReader::new(vec![("s".into(), layout)], d);
    reader.go_to_next_sequence().unwrap();
    let mut bulk = vec![0.0; 15];
    fill_prior_array(&mut reader, "s", 0, &mut bulk).unwrap();
    let mut expected = vec![0.1; 5];
    expected.extend([0.2; 5]);
    expected.extend([d, d]);
    expected.extend([0.3; 3]);
    assert_eq!(bulk, expected);
}

#[test]
fn bulk_fill_in_pieces_matches_one_call() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let len = rng.gen_range(10..80u64);
        let layout = random_layout(&mut rng, len);

        let mut whole = VecPriorReader::new(vec![("s".into(), layout.clone())], DEFAULT_PRIOR);
        whole.go_to_next_sequence().unwrap();
        let mut expected = vec![0.0; len as usize];
        fill_prior_array(&mut whole, "s", 1, &mut expected).unwrap();

        let mut pieces = VecPriorReader::new(vec![("s".into(), layout.clone())], DEFAULT_PRIOR);
        pieces.go_to_next_sequence().unwrap();
        let mut got = Vec::new();
        let mut start = 1u64;
        while start <= len {
            let size = rng.gen_range(1..=7u64).min(len - start + 1);
            let mut chunk = vec![0.0; size as usize];
            fill_prior_array(&mut pieces, "s", start, &mut chunk).unwrap();
            got.extend(chunk);
            start += size;
        }
        assert_eq!(got, expected, "layout {layout:?}");
    }
}

#[test]
fn psp_and_wiggle_priors_agree() {
    let fixture = helpers::Fixture::new();
    let first: Vec<f64> = (1..=12).map(|i| i as f64 / 100.0).collect();
    let second = vec![0.5, 0.6, 0.7];
    let psp = fixture.write(
        "priors.psp",
        &helpers::psp_text(&[("chr1", &first), ("chr2", &second)]),
    );
    let mut wig = String::from("variableStep chrom=chr1\n");
    for (i, p) in first.iter().enumerate() {
        wig.push_str(&format!("{} {p}\n", i + 1));
    }
    wig.push_str("fixedStep chrom=chr2 start=1 step=1\n");
    for p in &second {
        wig.push_str(&format!("{p}\n"));
    }
    let wig = fixture.write("priors.wig", &wig);

    for path in [psp, wig] {
        let mut reader = open_prior_reader(&path, false, DEFAULT_PRIOR).unwrap();
        assert!(reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.seq_name(), Some("chr1"));
        assert_eq!(incremental(reader.as_mut(), "chr1", 14)[..12], first[..]);
        assert!(reader.go_to_next_sequence().unwrap());
        assert_eq!(reader.seq_name(), Some("chr2"));
        let got = incremental(reader.as_mut(), "chr2", 4);
        assert_eq!(got, vec![0.5, 0.6, 0.7, DEFAULT_PRIOR], "{}", path.display());
        assert!(!reader.go_to_next_sequence().unwrap());
    }
}

#[test]
fn wiggle_spans_cover_several_positions() {
    let fixture = helpers::Fixture::new();
    let path = fixture.write(
        "spans.wig",
        "track type=wiggle_0\nfixedStep chrom=c start=3 step=5 span=2\n0.1\n0.2\n",
    );
    let mut reader = open_prior_reader(&path, false, DEFAULT_PRIOR).unwrap();
    assert!(reader.go_to_next_sequence().unwrap());
    let d = DEFAULT_PRIOR;
    assert_eq!(
        incremental(reader.as_mut(), "c", 10),
        vec![d, d, 0.1, 0.1, d, d, d, 0.2, 0.2, d]
    );
}
