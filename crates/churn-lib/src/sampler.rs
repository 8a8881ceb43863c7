//! Random index sources for template and victim selection

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Source of uniformly distributed indices
///
/// The churn step never draws randomness on its own; it asks a `Sampler`,
/// so tests can script exactly which containers are picked.
pub trait Sampler: Send {
    /// Pick an index in `0..len`. `len` is always non-zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// How victims are drawn from the candidate pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Every draw is independent; a container may be drawn twice
    #[default]
    WithReplacement,
    /// Each container is drawn at most once per step
    WithoutReplacement,
}

impl SamplingMode {
    /// Draw `count` pool indices. `count` must not exceed `len`.
    pub fn draw(&self, sampler: &mut dyn Sampler, len: usize, count: usize) -> Vec<usize> {
        match self {
            SamplingMode::WithReplacement => (0..count).map(|_| sampler.pick(len)).collect(),
            SamplingMode::WithoutReplacement => {
                // partial Fisher-Yates
                let mut indices: Vec<usize> = (0..len).collect();
                for i in 0..count {
                    let j = i + sampler.pick(len - i);
                    indices.swap(i, j);
                }
                indices.truncate(count);
                indices
            }
        }
    }
}

/// `Sampler` backed by any `rand` generator
pub struct RngSampler<R> {
    rng: R,
}

impl<R: Rng + Send> RngSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSampler<StdRng> {
    /// Deterministic sampler when a seed is given, entropy-seeded otherwise
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng + Send> Sampler for RngSampler<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Replays a fixed list of picks, modulo the requested length
    struct Scripted(Vec<usize>, usize);

    impl Sampler for Scripted {
        fn pick(&mut self, len: usize) -> usize {
            let value = self.0[self.1 % self.0.len()];
            self.1 += 1;
            value % len
        }
    }

    #[test]
    fn test_rng_sampler_stays_in_range() {
        let mut sampler = RngSampler::from_seed(Some(7));
        for len in 1..50 {
            assert!(sampler.pick(len) < len);
        }
    }

    #[test]
    fn test_seeded_samplers_agree() {
        let mut a = RngSampler::from_seed(Some(42));
        let mut b = RngSampler::from_seed(Some(42));
        let xs: Vec<usize> = (0..20).map(|_| a.pick(10)).collect();
        let ys: Vec<usize> = (0..20).map(|_| b.pick(10)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_with_replacement_can_repeat() {
        let mut sampler = Scripted(vec![1, 1, 1], 0);
        let drawn = SamplingMode::WithReplacement.draw(&mut sampler, 3, 3);
        assert_eq!(drawn, vec![1, 1, 1]);
    }

    #[test]
    fn test_without_replacement_is_distinct() {
        let mut sampler = Scripted(vec![1, 1, 1], 0);
        let drawn = SamplingMode::WithoutReplacement.draw(&mut sampler, 3, 3);
        let unique: HashSet<usize> = drawn.iter().copied().collect();
        assert_eq!(drawn.len(), 3);
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_without_replacement_full_pool_with_rng() {
        let mut sampler = RngSampler::from_seed(Some(3));
        let drawn = SamplingMode::WithoutReplacement.draw(&mut sampler, 10, 10);
        let unique: HashSet<usize> = drawn.into_iter().collect();
        assert_eq!(unique, (0..10).collect());
    }

    #[test]
    fn test_draw_zero_is_empty() {
        let mut sampler = RngSampler::from_seed(Some(1));
        assert!(SamplingMode::WithReplacement.draw(&mut sampler, 5, 0).is_empty());
        assert!(SamplingMode::WithoutReplacement.draw(&mut sampler, 0, 0).is_empty());
    }
}
