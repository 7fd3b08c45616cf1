//! Seeded Lehmer pseudo-random stream.
//!
//! A multiplicative congruential generator (Park–Miller constants). Every
//! random decision in an experiment draws from one of these streams, which
//! is what makes whole runs reproducible from a single seed.

/// Modulus of the generator (a Mersenne prime).
const MODULUS: i64 = 2_147_483_647; // 2^31 - 1

/// Park–Miller multiplier.
const MULTIPLIER: i64 = 16_807;

/// A deterministic pseudo-random stream.
///
/// State transition `x <- x * 16807 mod (2^31 - 1)`, output mapped onto
/// `[0, 1)`. Streams with the same seed produce identical sequences.
#[derive(Debug, Clone)]
pub struct LehmerRng {
    state: i64,
}

impl LehmerRng {
    /// Create a stream from a seed.
    ///
    /// Seeds congruent to zero are shifted into the valid state range, so
    /// any `i64` is an acceptable seed.
    pub fn new(seed: i64) -> Self {
        let mut state = seed % MODULUS;
        if state <= 0 {
            state += MODULUS - 1;
        }
        Self { state }
    }

    /// Next value uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER) % MODULUS;
        (self.state - 1) as f64 / (MODULUS - 2) as f64
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform index in `[0, n)`. `n` must be non-zero.
    pub fn index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        let i = (self.next_f64() * n as f64) as usize;
        i.min(n - 1)
    }

    /// Uniform integer in `[lo, hi)`.
    pub fn range(&mut self, lo: u64, hi: u64) -> u64 {
        debug_assert!(lo < hi);
        lo + (self.next_f64() * (hi - lo) as f64) as u64
    }

    /// Gaussian sample via Box–Muller.
    pub fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + stddev * z
    }

    /// Poisson sample.
    ///
    /// Knuth's product method below `lambda = 30`, Gaussian approximation
    /// above (the product method underflows for large rates).
    pub fn poisson(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        if lambda < 30.0 {
            let limit = (-lambda).exp();
            let mut k = 0u64;
            let mut p = 1.0;
            loop {
                p *= self.next_f64();
                if p <= limit {
                    return k;
                }
                k += 1;
            }
        } else {
            let sample = self.gaussian(lambda, lambda.sqrt()).round();
            sample.max(0.0) as u64
        }
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = LehmerRng::new(42);
        let mut b = LehmerRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = LehmerRng::new(1);
        let mut b = LehmerRng::new(2);
        let diverged = (0..100).any(|_| a.next_f64() != b.next_f64());
        assert!(diverged);
    }

    #[test]
    fn output_in_unit_interval() {
        let mut rng = LehmerRng::new(7);
        for _ in 0..10_000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x), "out of range: {}", x);
        }
    }

    #[test]
    fn degenerate_seeds_are_normalized() {
        // 0, the modulus, and negative seeds all map into the valid range.
        for seed in [0, 2_147_483_647, -5] {
            let mut rng = LehmerRng::new(seed);
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn index_stays_in_bounds() {
        let mut rng = LehmerRng::new(3);
        for _ in 0..1000 {
            assert!(rng.index(7) < 7);
        }
        assert_eq!(rng.index(1), 0);
    }

    #[test]
    fn poisson_mean_tracks_lambda() {
        let mut rng = LehmerRng::new(11);
        for lambda in [0.5, 3.0, 12.0, 50.0] {
            let n = 2000;
            let total: u64 = (0..n).map(|_| rng.poisson(lambda)).sum();
            let mean = total as f64 / n as f64;
            assert!(
                (mean - lambda).abs() < lambda.sqrt(),
                "lambda {} gave mean {}",
                lambda,
                mean
            );
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = LehmerRng::new(5);
        let mut items: Vec<u32> = (0..50).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
