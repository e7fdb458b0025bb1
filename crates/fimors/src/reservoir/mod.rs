//! Fixed-capacity uniform sampling of an unbounded stream (Algorithm R).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Result};

/// Keeps a uniform random sample of at most `capacity` items.
///
/// After `n` submissions every submitted item is resident with
/// probability `min(1, capacity / n)`.
#[derive(Debug, Clone)]
pub struct ReservoirSampler<T = f64> {
    capacity: usize,
    samples: Vec<T>,
    num_seen: usize,
    num_swapped: usize,
    rng: StdRng,
}

impl<T> ReservoirSampler<T> {
    pub fn new(capacity: usize, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "reservoir capacity must be positive".into(),
            ));
        }
        Ok(Self {
            capacity,
            samples: Vec::with_capacity(capacity),
            num_seen: 0,
            num_swapped: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn sample(&mut self, value: T) {
        self.num_seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(value);
            return;
        }
        let r = self.rng.gen_range(0..self.num_seen);
        if r < self.capacity {
            self.samples[r] = value;
            self.num_swapped += 1;
        }
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Forget all samples and counters. The random stream continues.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.num_seen = 0;
        self.num_swapped = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_seen(&self) -> usize {
        self.num_seen
    }

    pub fn num_retained(&self) -> usize {
        self.samples.len()
    }

    pub fn num_swapped(&self) -> usize {
        self.num_swapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ReservoirSampler::<f64>::new(0, 1),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn retained_count_tracks_capacity() {
        let mut reservoir = ReservoirSampler::new(4, 7).unwrap();
        for i in 0..3 {
            reservoir.sample(i);
        }
        assert_eq!(reservoir.num_retained(), 3);
        for i in 3..50 {
            reservoir.sample(i);
        }
        assert_eq!(reservoir.num_seen(), 50);
        assert_eq!(reservoir.num_retained(), 4);
        assert!(reservoir.num_swapped() > 0);
        assert!(reservoir.samples().iter().all(|v| (0..50).contains(v)));
    }

    #[test]
    fn clear_resets_counters() {
        let mut reservoir = ReservoirSampler::new(2, 3).unwrap();
        for v in [0.1, 0.2, 0.3, 0.4] {
            reservoir.sample(v);
        }
        reservoir.clear();
        assert_eq!(reservoir.num_seen(), 0);
        assert_eq!(reservoir.num_retained(), 0);
        assert_eq!(reservoir.num_swapped(), 0);
        assert_eq!(reservoir.capacity(), 2);
    }
}
