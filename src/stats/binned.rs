//! Binned Poisson likelihood-ratio test against the saturated model.
//!
//! `T(k) = Σ 2 [(μ_i − n_i) + n_i ln(n_i / μ_i)]` with `μ_i = k s_i + b_i`.
//! `T` is convex in `k`. Limits and p-values use the profile statistic
//! `T(k) − T(k̂)` against the χ²₁ quantile, where `k̂ ≥ 0` is the best fit.

use statrs::function::erf::{erf_inv, erfc};

use super::poisson::check_confidence_level;
use crate::error::AppError;
use crate::math::{Bisection, Direction};

/// `-2 ln(L(n; μ) / L(n; n))` summed over bins.
pub fn likelihood_ratio_statistic(observed: &[u64], expected: &[f64]) -> f64 {
    observed
        .iter()
        .zip(expected)
        .map(|(&n, &mu)| {
            let n = n as f64;
            if n == 0.0 {
                2.0 * mu
            } else if mu <= 0.0 {
                f64::INFINITY
            } else {
                2.0 * ((mu - n) + n * (n / mu).ln())
            }
        })
        .sum()
}

/// Statistic of the scaled signal hypothesis `k · s + b`.
pub fn binned_statistic(observed: &[u64], signal: &[f64], background: &[f64], scale: f64) -> f64 {
    let expected: Vec<f64> = signal.iter().zip(background).map(|(s, b)| scale * s + b).collect();
    likelihood_ratio_statistic(observed, &expected)
}

/// `dT/dk`; bins without signal do not contribute. An empty bin adds `2s`
/// whatever its expectation; a filled bin with nothing expected pulls to −∞.
fn statistic_slope(observed: &[u64], signal: &[f64], background: &[f64], scale: f64) -> f64 {
    observed
        .iter()
        .zip(signal)
        .zip(background)
        .filter(|((_, s), _)| **s > 0.0)
        .map(|((&n, &s), &b)| {
            if n == 0 {
                return 2.0 * s;
            }
            let mu = scale * s + b;
            if mu <= 0.0 { f64::NEG_INFINITY } else { 2.0 * s * (1.0 - n as f64 / mu) }
        })
        .sum()
}

/// Minimizer `k̂ ≥ 0` of `T`, with `T(k̂)`.
fn best_fit(observed: &[u64], signal: &[f64], background: &[f64]) -> Result<(f64, f64), AppError> {
    let total_signal: f64 = signal.iter().filter(|s| **s > 0.0).sum();
    let scale = if total_signal > 0.0 && statistic_slope(observed, signal, background, 0.0) < 0.0 {
        Bisection::default().find_crossing(
            |k| statistic_slope(observed, signal, background, k),
            0.0,
            0.0,
            Direction::Up,
            1.0 / total_signal,
            None,
        )?
    } else {
        0.0
    };
    let statistic = binned_statistic(observed, signal, background, scale);
    if !statistic.is_finite() {
        return Err(AppError::numerical(format!(
            "Observed counts fall in bins with no expected events at any signal scale (best fit {scale:e})."
        )));
    }
    Ok((scale, statistic))
}

fn check_lengths(observed: &[u64], signal: &[f64], background: &[f64]) -> Result<(), AppError> {
    if observed.is_empty() {
        return Err(AppError::empty("Binned Poisson test needs at least one bin."));
    }
    if signal.len() != observed.len() || background.len() != observed.len() {
        return Err(AppError::config(format!(
            "Binned Poisson test got {} observed, {} signal and {} background bins.",
            observed.len(),
            signal.len(),
            background.len()
        )));
    }
    Ok(())
}

/// χ²₁ upper-tail probability of `T(1) − T(k̂)`; 1 when the best fit is at
/// or above the nominal signal.
pub fn binned_p_value(observed: &[u64], signal: &[f64], background: &[f64]) -> Result<f64, AppError> {
    check_lengths(observed, signal, background)?;
    let (scale, at_best_fit) = best_fit(observed, signal, background)?;
    if scale >= 1.0 {
        return Ok(1.0);
    }
    let profile = binned_statistic(observed, signal, background, 1.0) - at_best_fit;
    Ok(chi_squared_one_tail(profile.max(0.0)))
}

/// Scale `k ≥ k̂` at which `T(k) − T(k̂)` reaches the χ²₁ quantile at `cl`.
pub fn binned_upper_limit_scale(
    observed: &[u64],
    signal: &[f64],
    background: &[f64],
    cl: f64,
) -> Result<f64, AppError> {
    check_lengths(observed, signal, background)?;
    check_confidence_level(cl)?;
    let total_signal: f64 = signal.iter().sum();
    if !(total_signal > 0.0) || signal.iter().any(|s| *s < 0.0) {
        return Err(AppError::numerical(format!(
            "Binned signal must be non-negative with a positive sum, got total {total_signal:e}."
        )));
    }
    let target = chi_squared_one_quantile(cl);
    let (scale, at_best_fit) = best_fit(observed, signal, background)?;
    Bisection::default().find_crossing(
        |k| binned_statistic(observed, signal, background, k) - at_best_fit,
        target,
        scale,
        Direction::Up,
        1.0 / total_signal,
        None,
    )
}

/// One degree of freedom: `P(χ² ≤ x) = erf(√(x/2))`, inverted exactly.
fn chi_squared_one_quantile(cl: f64) -> f64 {
    let z = erf_inv(cl);
    2.0 * z * z
}

fn chi_squared_one_tail(x: f64) -> f64 {
    erfc((x / 2.0).sqrt())
}
