use fimors::reservoir::ReservoirSampler;

#[test]
fn short_stream_is_kept_whole() {
    let mut sampler = ReservoirSampler::new(50, 7).unwrap();
    for i in 0..20 {
        sampler.sample(i as f64);
    }
    assert_eq!(sampler.num_seen(), 20);
    assert_eq!(sampler.num_retained(), 20);
    assert_eq!(sampler.num_swapped(), 0);
    let expected: Vec<f64> = (0..20).map(|i| i as f64).collect();
    assert_eq!(sampler.samples(), expected.as_slice());
}

#[test]
fn every_item_is_equally_likely_to_survive() {
    let trials = 2000;
    let n = 100;
    let capacity = 10;
    let mut hits = vec![0usize; n];
    for seed in 0..trials {
        let mut sampler = ReservoirSampler::new(capacity, seed as u64).unwrap();
        for i in 0..n {
            sampler.sample(i);
        }
        assert_eq!(sampler.num_retained(), capacity);
        for &i in sampler.samples() {
            hits[i] += 1;
        }
    }
    // Expected 200 hits per item; allow six standard deviations.
    for (item, &count) in hits.iter().enumerate() {
        assert!((120..=280).contains(&count), "item {item} kept {count} times");
    }
    let early: usize = hits[..capacity].iter().sum();
    let late: usize = hits[n - capacity..].iter().sum();
    assert!(early.abs_diff(late) < 400, "early {early} late {late}");
}

#[test]
fn clear_starts_a_new_stream() {
    let mut sampler = ReservoirSampler::new(3, 1).unwrap();
    for i in 0..10 {
        sampler.sample(i);
    }
    assert!(sampler.num_swapped() <= 7);
    sampler.clear();
    assert_eq!(sampler.num_seen(), 0);
    assert!(sampler.samples().is_empty());
    sampler.sample(42);
    assert_eq!(sampler.samples(), &[42]);
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(ReservoirSampler::<f64>::new(0, 0).is_err());
}
