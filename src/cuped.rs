//! CUPED Covariate Adjustment
//!
//! Reduces the variance of an experiment metric using a correlated
//! pre-period covariate: subtract `theta * (x - mean(x))` from each
//! observation, where `theta = cov(y, x) / var(x)`. The adjusted series
//! keeps the metric's mean while shedding the variance the covariate
//! explains (roughly the squared correlation between the two series).
//!
//! Reference: Deng et al. (2013), "Improving the Sensitivity of Online
//! Controlled Experiments by Utilizing Pre-Experiment Data".

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Covariate variances below this are treated as zero; the adjustment
/// coefficient is undefined there.
const VARIANCE_FLOOR: f64 = 1e-15;

/// Result of a CUPED adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CupedAdjustment {
    /// The adjusted series, same length and mean as the treated input.
    pub adjusted: Vec<f64>,
    /// The linear adjustment coefficient `cov(y, x) / var(x)`.
    pub theta: f64,
    /// Realized variance reduction `1 - var(adjusted) / var(treated)`.
    /// Near the squared correlation for well-behaved inputs; near zero for
    /// an uncorrelated covariate.
    pub variance_reduction: f64,
}

/// Adjust a metric series against an index-aligned pre-period covariate.
///
/// Both inputs must be the same length, complete (no NaN), finite, and at
/// least two observations long. A covariate with (numerically) zero
/// variance makes `theta` undefined and fails loudly instead of leaking
/// NaN into the output.
///
/// # Examples
///
/// ```ignore
/// # use abgauge::cuped_adjust;
/// let treated = vec![3.0, 5.0, 4.0, 6.0];
/// let covariate = vec![1.0, 2.0, 1.5, 2.5];
/// let result = cuped_adjust(&treated, &covariate)?;
/// assert_eq!(result.adjusted.len(), 4);
/// ```
pub fn cuped_adjust(treated: &[f64], covariate: &[f64]) -> Result<CupedAdjustment, Error> {
    if treated.len() != covariate.len() {
        return Err(Error::invalid_input(format!(
            "length mismatch: treated has {}, covariate has {}",
            treated.len(),
            covariate.len()
        )));
    }
    if treated.len() < 2 {
        return Err(Error::invalid_input(
            "need at least two paired observations",
        ));
    }
    require_complete("treated", treated)?;
    require_complete("covariate", covariate)?;

    let n = treated.len() as f64;
    let mean_y = treated.iter().sum::<f64>() / n;
    let mean_x = covariate.iter().sum::<f64>() / n;

    let var_x = covariate
        .iter()
        .map(|x| (x - mean_x).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    if var_x < VARIANCE_FLOOR {
        return Err(Error::degenerate(
            "covariate variance is zero; the adjustment coefficient is undefined",
        ));
    }

    let cov_yx = treated
        .iter()
        .zip(covariate)
        .map(|(y, x)| (y - mean_y) * (x - mean_x))
        .sum::<f64>()
        / (n - 1.0);
    let theta = cov_yx / var_x;

    let adjusted: Vec<f64> = treated
        .iter()
        .zip(covariate)
        .map(|(y, x)| y - theta * (x - mean_x))
        .collect();

    let var_y = treated.iter().map(|y| (y - mean_y).powi(2)).sum::<f64>() / (n - 1.0);
    let variance_reduction = if var_y > 0.0 {
        let mean_adj = adjusted.iter().sum::<f64>() / n;
        let var_adj = adjusted
            .iter()
            .map(|y| (y - mean_adj).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        1.0 - var_adj / var_y
    } else {
        0.0
    };

    Ok(CupedAdjustment {
        adjusted,
        theta,
        variance_reduction,
    })
}

fn require_complete(name: &str, values: &[f64]) -> Result<(), Error> {
    for (index, value) in values.iter().enumerate() {
        if value.is_nan() {
            return Err(Error::incomplete_data(format!(
                "{name} has a missing value at index {index}"
            )));
        }
        if value.is_infinite() {
            return Err(Error::invalid_input(format!(
                "{name} has an infinite value at index {index}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn sample_variance(values: &[f64]) -> f64 {
        let m = mean(values);
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    }

    #[test]
    fn test_mean_is_preserved() {
        let treated: Vec<f64> = (0..50).map(|i| 10.0 + (i % 7) as f64 * 1.3).collect();
        let covariate: Vec<f64> = treated.iter().map(|y| 0.8 * y + 2.0).collect();

        let result = cuped_adjust(&treated, &covariate).unwrap();

        let before = mean(&treated);
        let after = mean(&result.adjusted);
        assert!(
            ((after - before) / before).abs() < 1e-9,
            "before = {before}, after = {after}"
        );
    }

    #[test]
    fn test_correlated_covariate_reduces_variance() {
        // Treated = covariate plus noise; most variance is explained.
        let covariate: Vec<f64> = (0..80).map(|i| (i % 13) as f64).collect();
        let treated: Vec<f64> = covariate
            .iter()
            .enumerate()
            .map(|(i, x)| 2.0 * x + (i % 3) as f64 * 0.2)
            .collect();

        let result = cuped_adjust(&treated, &covariate).unwrap();

        assert!(sample_variance(&result.adjusted) < sample_variance(&treated));
        assert!(result.variance_reduction > 0.5, "reduction = {}", result.variance_reduction);
        assert!(result.theta > 0.0);
    }

    #[test]
    fn test_perfectly_correlated_covariate_flattens_the_series() {
        let covariate: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let treated: Vec<f64> = covariate.iter().map(|x| 3.0 * x + 1.0).collect();

        let result = cuped_adjust(&treated, &covariate).unwrap();

        assert!((result.theta - 3.0).abs() < 1e-12);
        assert!(result.variance_reduction > 0.999_999);
        // Every adjusted value collapses onto the mean.
        let m = mean(&treated);
        for value in &result.adjusted {
            assert!((value - m).abs() < 1e-9);
        }
    }

    #[test]
    fn test_orthogonal_covariate_changes_nothing() {
        // cov(y, x) is exactly zero by construction, so theta is zero and
        // the series passes through untouched.
        let treated = vec![1.0, 2.0, 3.0, 4.0];
        let covariate = vec![1.0, -1.0, -1.0, 1.0];

        let result = cuped_adjust(&treated, &covariate).unwrap();

        assert_eq!(result.theta, 0.0);
        assert_eq!(result.adjusted, treated);
        assert_eq!(result.variance_reduction, 0.0);
    }

    #[test]
    fn test_missing_value_is_rejected() {
        let result = cuped_adjust(&[1.0, 2.0, f64::NAN], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(Error::IncompleteData { .. })));

        let result = cuped_adjust(&[1.0, 2.0, 3.0], &[f64::NAN, 2.0, 3.0]);
        assert!(matches!(result, Err(Error::IncompleteData { .. })));
    }

    #[test]
    fn test_infinite_value_is_rejected() {
        let result = cuped_adjust(&[1.0, f64::INFINITY, 3.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let result = cuped_adjust(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_constant_covariate_is_degenerate() {
        let result = cuped_adjust(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]);
        assert!(matches!(result, Err(Error::Degenerate { .. })));
    }

    #[test]
    fn test_single_observation_is_rejected() {
        let result = cuped_adjust(&[1.0], &[2.0]);
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }
}
