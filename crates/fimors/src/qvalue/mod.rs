//! Storey q-value estimation from a sample of the p-value distribution.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NUM_LAMBDAS: usize = 100;
const MAX_LAMBDA: f64 = 0.5;
const NUM_BOOTSTRAPS: usize = 100;

fn pi0_at(sorted: &[f64], lambda: f64) -> f64 {
    let above = sorted.len() - sorted.partition_point(|&p| p <= lambda);
    above as f64 / ((1.0 - lambda) * sorted.len() as f64)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Estimate the proportion of null p-values.
///
/// Evaluates `#{p > λ} / ((1 - λ) n)` on a grid of λ in `[0, 0.5)` and
/// keeps the λ whose bootstrap estimates have the smallest squared error
/// against the grid minimum. The result is capped at 1.
pub fn estimate_pi0(samples: &[f64], seed: u64) -> f64 {
    if samples.is_empty() {
        return 1.0;
    }
    let sorted = sorted_copy(samples);
    let lambdas: Vec<f64> = (0..NUM_LAMBDAS)
        .map(|i| i as f64 * MAX_LAMBDA / NUM_LAMBDAS as f64)
        .collect();
    let pi0s: Vec<f64> = lambdas.iter().map(|&l| pi0_at(&sorted, l)).collect();
    let min_pi0 = pi0s.iter().copied().fold(f64::INFINITY, f64::min);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut mse = vec![0.0; NUM_LAMBDAS];
    let mut resample = vec![0.0; sorted.len()];
    for _ in 0..NUM_BOOTSTRAPS {
        for slot in resample.iter_mut() {
            *slot = sorted[rng.gen_range(0..sorted.len())];
        }
        resample.sort_by(f64::total_cmp);
        for (err, &lambda) in mse.iter_mut().zip(&lambdas) {
            let diff = pi0_at(&resample, lambda) - min_pi0;
            *err += diff * diff;
        }
    }

    let best = mse
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i);
    pi0s[best].min(1.0)
}

/// Q-values for `pvalues`, returned in input order.
///
/// `samples` is a uniform sample of all p-values computed during the scan
/// and `num_observations` the number of p-values it was drawn from.
/// Without samples every q-value is NaN.
pub fn compute_qvalues(pvalues: &[f64], num_observations: usize, samples: &[f64], seed: u64) -> Vec<f64> {
    if samples.is_empty() || pvalues.is_empty() {
        return vec![f64::NAN; pvalues.len()];
    }
    let pi0 = estimate_pi0(samples, seed);
    let sorted_samples = sorted_copy(samples);
    let n = num_observations.max(pvalues.len()) as f64;

    let mut order: Vec<usize> = (0..pvalues.len()).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    let mut sorted_q: Vec<f64> = order
        .iter()
        .enumerate()
        .map(|(i, &idx)| {
            let p = pvalues[idx];
            let ecdf = sorted_samples.partition_point(|&s| s <= p) as f64
                / sorted_samples.len() as f64;
            let rank = ((i + 1) as f64).max(ecdf * n);
            pi0 * p * n / rank
        })
        .collect();

    for i in (0..sorted_q.len()).rev() {
        if i + 1 < sorted_q.len() {
            sorted_q[i] = sorted_q[i].min(sorted_q[i + 1]);
        }
        sorted_q[i] = sorted_q[i].min(1.0);
    }

    let mut qvalues = vec![f64::NAN; pvalues.len()];
    for (q, &idx) in sorted_q.into_iter().zip(&order) {
        qvalues[idx] = q;
    }
    qvalues
}
