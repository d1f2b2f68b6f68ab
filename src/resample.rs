//! Bootstrap Resampling
//!
//! Draws with-replacement resamples for the calibration and power
//! estimators, and derives the per-trial seeds that give every trial its
//! own deterministic RNG stream.

use rand::Rng;

use crate::error::Error;

/// Draw a bootstrap resample: `sample.len()` elements chosen independently
/// and uniformly at random from `sample`, with replacement.
///
/// The draw always has exactly the length of its source and is independent
/// across calls; all determinism comes from the RNG handed in.
///
/// # Examples
///
/// ```ignore
/// # use abgauge::bootstrap_resample;
/// use rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256PlusPlus;
///
/// let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
/// let draw = bootstrap_resample(&[1.0, 2.0, 3.0], &mut rng)?;
/// assert_eq!(draw.len(), 3);
/// ```
pub fn bootstrap_resample<R: Rng>(sample: &[f64], rng: &mut R) -> Result<Vec<f64>, Error> {
    if sample.is_empty() {
        return Err(Error::invalid_input("cannot resample an empty sample"));
    }
    Ok(draw_with_replacement(sample, rng))
}

/// Resampling path for trial loops that validated their inputs up front.
pub(crate) fn draw_with_replacement<R: Rng>(sample: &[f64], rng: &mut R) -> Vec<f64> {
    (0..sample.len())
        .map(|_| sample[rng.gen_range(0..sample.len())])
        .collect()
}

/// Derive the seed for one trial from a base seed and a trial counter.
///
/// SplitMix64 finalizer over the combined words: adjacent counters map to
/// well-separated seeds, so every trial can own an independent
/// `Xoshiro256PlusPlus` stream and parallel execution reproduces serial
/// results exactly. Public so callers chunking trials across their own
/// workers get the same numbers this crate would produce.
pub fn trial_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
