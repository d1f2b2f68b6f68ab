//! Randomized Bucket Aggregation
//!
//! Assigns each experimental unit to one of `k` buckets uniformly at
//! random and averages within buckets. The aggregate trades per-unit
//! resolution for lower variance: with average occupancy `m`, bucket means
//! have roughly `1/m` of the original variance. This is the benchmark that
//! CUPED adjustments are compared against.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Mean and occupancy of one bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketMean {
    /// Bucket id in `[0, k)`.
    pub bucket: usize,
    /// Mean of the elements assigned to this bucket.
    pub mean: f64,
    /// Number of elements assigned to this bucket.
    pub count: usize,
}

/// Randomly partition a sample into `buckets` groups and average each.
///
/// Every element is assigned independently and uniformly; sums accumulate
/// in input order, so `buckets == 1` reproduces the overall sample mean
/// exactly. Buckets that receive no elements are omitted from the output,
/// and `count` makes occupancy explicit. `buckets` may exceed the sample
/// size. The output is sorted by bucket id.
pub fn bucketize<R: Rng>(
    sample: &[f64],
    buckets: usize,
    rng: &mut R,
) -> Result<Vec<BucketMean>, Error> {
    if buckets == 0 {
        return Err(Error::configuration("bucket count must be positive"));
    }
    if sample.is_empty() {
        return Err(Error::invalid_input("cannot bucketize an empty sample"));
    }
    if let Some(index) = sample.iter().position(|v| !v.is_finite()) {
        return Err(Error::invalid_input(format!(
            "sample contains a non-finite value at index {index}"
        )));
    }

    let mut sums = vec![0.0; buckets];
    let mut counts = vec![0usize; buckets];
    for &value in sample {
        let bucket = rng.gen_range(0..buckets);
        sums[bucket] += value;
        counts[bucket] += 1;
    }

    let mut aggregate = Vec::with_capacity(buckets.min(sample.len()));
    for (bucket, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
        if count > 0 {
            aggregate.push(BucketMean {
                bucket,
                mean: sum / count as f64,
                count,
            });
        }
    }
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_single_bucket_reproduces_sample_mean_exactly() {
        let sample = vec![0.1, 0.2, 0.3, 10.5, -4.4, 7.7];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let aggregate = bucketize(&sample, 1, &mut rng).unwrap();

        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate[0].bucket, 0);
        assert_eq!(aggregate[0].count, sample.len());
        assert_eq!(
            aggregate[0].mean,
            sample.iter().sum::<f64>() / sample.len() as f64
        );
    }

    #[test]
    fn test_counts_sum_to_sample_size() {
        let sample: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);

        let aggregate = bucketize(&sample, 16, &mut rng).unwrap();

        let total: usize = aggregate.iter().map(|b| b.count).sum();
        assert_eq!(total, sample.len());
    }

    #[test]
    fn test_output_is_sorted_by_bucket_id() {
        let sample: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        let aggregate = bucketize(&sample, 8, &mut rng).unwrap();

        for pair in aggregate.windows(2) {
            assert!(pair[0].bucket < pair[1].bucket);
        }
    }

    #[test]
    fn test_more_buckets_than_elements_omits_empty_buckets() {
        let sample = vec![1.0, 2.0, 3.0];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);

        let aggregate = bucketize(&sample, 1000, &mut rng).unwrap();

        // At most one bucket per element; nothing reported empty.
        assert!(aggregate.len() <= sample.len());
        for bucket in &aggregate {
            assert!(bucket.count >= 1);
            assert!(bucket.bucket < 1000);
        }
    }

    #[test]
    fn test_weighted_bucket_means_recover_overall_mean() {
        let sample: Vec<f64> = (0..500).map(|i| (i % 23) as f64 * 0.5).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);

        let aggregate = bucketize(&sample, 10, &mut rng).unwrap();

        let weighted: f64 = aggregate.iter().map(|b| b.mean * b.count as f64).sum();
        let overall = sample.iter().sum::<f64>() / sample.len() as f64;
        assert!(((weighted / sample.len() as f64) - overall).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_variance_shrinks() {
        // 1000 elements into 10 buckets: occupancy ~100, so bucket means
        // should be far tighter than the raw elements.
        let sample: Vec<f64> = (0..1000).map(|i| (i % 97) as f64).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);

        let aggregate = bucketize(&sample, 10, &mut rng).unwrap();

        let raw_mean = sample.iter().sum::<f64>() / sample.len() as f64;
        let raw_var = sample.iter().map(|v| (v - raw_mean).powi(2)).sum::<f64>()
            / (sample.len() - 1) as f64;

        let means: Vec<f64> = aggregate.iter().map(|b| b.mean).collect();
        let agg_mean = means.iter().sum::<f64>() / means.len() as f64;
        let agg_var = means.iter().map(|v| (v - agg_mean).powi(2)).sum::<f64>()
            / (means.len() - 1) as f64;

        assert!(agg_var < raw_var / 10.0, "raw = {raw_var}, agg = {agg_var}");
    }

    #[test]
    fn test_zero_buckets_is_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let result = bucketize(&[1.0, 2.0], 0, &mut rng);
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_empty_sample_is_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let result = bucketize(&[], 4, &mut rng);
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_non_finite_sample_is_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let result = bucketize(&[1.0, f64::NAN], 4, &mut rng);
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let sample: Vec<f64> = (0..64).map(|i| i as f64).collect();

        let mut rng_a = Xoshiro256PlusPlus::seed_from_u64(10);
        let mut rng_b = Xoshiro256PlusPlus::seed_from_u64(10);

        let first = bucketize(&sample, 7, &mut rng_a).unwrap();
        let second = bucketize(&sample, 7, &mut rng_b).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.bucket, b.bucket);
            assert_eq!(a.mean, b.mean);
            assert_eq!(a.count, b.count);
        }
    }
}
