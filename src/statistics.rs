use crate::error::{Error, Result};
use num_traits::ToPrimitive;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use std::fmt;
use std::str::FromStr;

/// How an expected (mean) number of quanta is turned into an integer count.
///
/// Applies to electrons and photons per deposit, and to detected hits per
/// sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CountSampling {
    /// Round the mean down. Deterministic.
    #[default]
    Truncate,
    /// Draw the count from a Poisson distribution with the given mean.
    Poisson,
}

impl CountSampling {
    /// Realize an integer count from a mean.
    ///
    /// A negative or NaN mean is a model-consistency error.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use scint::statistics::CountSampling;
    ///
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    /// assert_eq!(CountSampling::Truncate.realize(41.9, &mut rng)?, 41);
    /// assert!(CountSampling::Truncate.realize(-1.0, &mut rng).is_err());
    /// # Ok::<(), scint::Error>(())
    /// ```
    pub fn realize<R: Rng + ?Sized>(self, mean: f64, rng: &mut R) -> Result<u64> {
        if !(mean >= 0.0) {
            return Err(Error::NegativeCount(mean));
        }
        let value = match self {
            CountSampling::Truncate => mean.floor(),
            CountSampling::Poisson if mean == 0.0 => 0.0,
            CountSampling::Poisson => Poisson::new(mean)
                .map_err(|e| Error::parameter("poisson mean", e.to_string()))?
                .sample(rng),
        };

        value.to_u64().ok_or(Error::NegativeCount(mean))
    }
}

impl fmt::Display for CountSampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountSampling::Truncate => write!(f, "truncate"),
            CountSampling::Poisson => write!(f, "poisson"),
        }
    }
}

impl FromStr for CountSampling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(CountSampling::Truncate),
            "poisson" => Ok(CountSampling::Poisson),
            other => Err(Error::parameter(
                "count sampling",
                format!("expected `truncate` or `poisson`, got `{other}`"),
            )),
        }
    }
}

/// Seed of the independent random stream used for a single event.
///
/// Mixes the run seed with the event index (SplitMix64), so every event gets a
/// reproducible stream regardless of which worker processes it.
pub fn stream_seed(run_seed: u64, index: u64) -> u64 {
    const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

    let mut z = (run_seed ^ index.wrapping_mul(GOLDEN_GAMMA)).wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw from an exponential distribution with mean `tau`, truncated to
/// `[0, window)`.
///
/// Uses the inverse CDF directly so no draw is ever rejected.
pub(crate) fn truncated_exponential<R: Rng + ?Sized>(tau: f64, window: f64, rng: &mut R) -> f64 {
    let accept = -(-window / tau).exp_m1();
    let u: f64 = rng.random();

    (-tau * (-u * accept).ln_1p()).min(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn truncate_floors_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(CountSampling::Truncate.realize(0.0, &mut rng).unwrap(), 0);
        assert_eq!(CountSampling::Truncate.realize(0.99, &mut rng).unwrap(), 0);
        assert_eq!(CountSampling::Truncate.realize(7.0, &mut rng).unwrap(), 7);
    }

    #[test]
    fn realize_rejects_invalid_means() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for sampling in [CountSampling::Truncate, CountSampling::Poisson] {
            assert!(matches!(
                sampling.realize(-0.5, &mut rng),
                Err(Error::NegativeCount(_))
            ));
            assert!(sampling.realize(f64::NAN, &mut rng).is_err());
        }
    }

    #[test]
    fn poisson_mean_converges() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let n = 20_000;
        let total: u64 = (0..n)
            .map(|_| CountSampling::Poisson.realize(12.5, &mut rng).unwrap())
            .sum();
        let mean = total as f64 / f64::from(n);
        assert!((mean - 12.5).abs() < 0.15, "mean = {mean}");
        assert_eq!(CountSampling::Poisson.realize(0.0, &mut rng).unwrap(), 0);
    }

    #[test]
    fn count_sampling_from_str() {
        assert_eq!(
            "Poisson".parse::<CountSampling>().unwrap(),
            CountSampling::Poisson
        );
        assert_eq!(
            CountSampling::Truncate
                .to_string()
                .parse::<CountSampling>()
                .unwrap(),
            CountSampling::Truncate
        );
        assert!("round".parse::<CountSampling>().is_err());
    }

    #[test]
    fn stream_seeds_differ_per_event() {
        let seeds: Vec<_> = (0..100).map(|i| stream_seed(42, i)).collect();
        for (i, a) in seeds.iter().enumerate() {
            for b in &seeds[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(stream_seed(42, 7), stream_seed(42, 7));
        assert_ne!(stream_seed(42, 7), stream_seed(43, 7));
    }

    #[test]
    fn truncated_exponential_within_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 50_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let t = truncated_exponential(2.0, 100.0, &mut rng);
            assert!((0.0..=100.0).contains(&t));
            sum += t;
        }
        // The window is far in the tail, so the mean is essentially tau.
        let mean = sum / f64::from(n);
        assert!((mean - 2.0).abs() < 0.05, "mean = {mean}");

        for _ in 0..1000 {
            assert!(truncated_exponential(10.0, 1.0, &mut rng) <= 1.0);
        }
    }
}
