//! Two-Sample Hypothesis Tests
//!
//! Evaluates the two significance tests the estimators calibrate: a
//! rank-based Mann-Whitney U test (normal approximation with tie
//! correction) and Welch's unequal-variance mean comparison.
//!
//! `compare_groups` is a total function. Degenerate inputs never produce
//! NaN; they resolve to the documented p-value policy below.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Two-sided p-values for one pair of groups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TestPValues {
    /// Mann-Whitney U test p-value.
    pub p_rank: f64,
    /// Welch's t-test p-value.
    pub p_mean: f64,
}

/// Run both tests on two independent groups.
///
/// Degenerate-case policy, applied uniformly so repeated trials stay
/// comparable:
/// - a group with fewer than 2 elements, zero pooled rank variance (every
///   observation tied), or any non-finite value → p = 1.0 (the test
///   abstains rather than reject);
/// - zero standard error with equal means → p = 1.0;
/// - zero standard error with unequal means → p = 0.0 (the mean difference
///   is exact, the naive t-statistic would be infinite).
///
/// No side effects; safe to call concurrently from independent trials.
pub fn compare_groups(group_a: &[f64], group_b: &[f64]) -> TestPValues {
    let finite = group_a.iter().chain(group_b).all(|v| v.is_finite());
    if !finite {
        return TestPValues {
            p_rank: 1.0,
            p_mean: 1.0,
        };
    }

    TestPValues {
        p_rank: mann_whitney_p(group_a, group_b),
        p_mean: welch_p(group_a, group_b),
    }
}

/// Two-sided Mann-Whitney U p-value via the tie-corrected normal
/// approximation.
///
/// Heavy tie structure shrinks the rank variance and distorts the null
/// distribution; that sensitivity is intentionally left in place, since it
/// is one of the miscalibrations the false-positive estimator exists to
/// surface.
fn mann_whitney_p(a: &[f64], b: &[f64]) -> f64 {
    let n1 = a.len();
    let n2 = b.len();
    if n1 < 2 || n2 < 2 {
        return 1.0;
    }

    let n = n1 + n2;
    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let nf = n as f64;

    // Combine and sort, remembering group membership.
    let mut combined: Vec<(f64, bool)> = Vec::with_capacity(n);
    combined.extend(a.iter().map(|&v| (v, true)));
    combined.extend(b.iter().map(|&v| (v, false)));
    combined.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal));

    let ranks = average_ranks(&combined);

    // Rank sum of the first group, then U.
    let r1: f64 = combined
        .iter()
        .zip(&ranks)
        .filter(|((_, in_a), _)| *in_a)
        .map(|(_, &rank)| rank)
        .sum();
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;

    let mu = n1f * n2f / 2.0;
    let tie_term = tie_correction(&combined);
    let sigma_sq = n1f * n2f / 12.0 * (nf + 1.0 - tie_term / (nf * (nf - 1.0)));
    if sigma_sq <= 0.0 {
        // Every observation tied across both groups.
        return 1.0;
    }

    let z = (u1 - mu) / sigma_sq.sqrt();
    two_sided_normal_p(z)
}

/// Two-sided Welch's t-test p-value (unequal variances,
/// Welch–Satterthwaite degrees of freedom).
fn welch_p(a: &[f64], b: &[f64]) -> f64 {
    let n1 = a.len();
    let n2 = b.len();
    if n1 < 2 || n2 < 2 {
        return 1.0;
    }

    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let (mean_a, var_a) = sample_moments(a);
    let (mean_b, var_b) = sample_moments(b);

    let se_sq = var_a / n1f + var_b / n2f;
    if se_sq <= 0.0 {
        // Both groups constant: the mean difference is exact.
        return if mean_a == mean_b { 1.0 } else { 0.0 };
    }

    let t = (mean_a - mean_b) / se_sq.sqrt();

    let df_denom =
        (var_a / n1f).powi(2) / (n1f - 1.0) + (var_b / n2f).powi(2) / (n2f - 1.0);
    if df_denom <= 0.0 {
        return 1.0;
    }
    let df = se_sq.powi(2) / df_denom;
    if !df.is_finite() || df <= 0.0 {
        return 1.0;
    }

    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Assign average ranks to sorted (value, group) pairs; tied runs share the
/// average of the ranks they span.
fn average_ranks(sorted: &[(f64, bool)]) -> Vec<f64> {
    let n = sorted.len();
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && sorted[j].0 == sorted[i].0 {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for rank in ranks.iter_mut().take(j).skip(i) {
            *rank = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Tie correction term Σ t(t² − 1) over all tied runs.
fn tie_correction(sorted: &[(f64, bool)]) -> f64 {
    let n = sorted.len();
    let mut correction = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && sorted[j].0 == sorted[i].0 {
            j += 1;
        }
        let t = (j - i) as f64;
        if t > 1.0 {
            correction += t * (t * t - 1.0);
        }
        i = j;
    }
    correction
}

fn sample_moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

fn two_sided_normal_p(z: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0)
}
