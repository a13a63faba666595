//! Yellin's maximum-gap method.
//!
//! Gaps are measured in expected signal counts between consecutive observed
//! events, including the two gaps to the edges of the analysis window. No
//! background is subtracted.

use std::collections::VecDeque;

use statrs::function::factorial::ln_factorial;

use super::poisson::check_confidence_level;
use crate::error::AppError;
use crate::math::{Bisection, Direction};

/// Grid nodes per gap length when integrating the delay equation.
const NODES_PER_GAP: usize = 256;
/// Largest accumulated rounding error accepted from the alternating sum.
const SUM_ROUNDING_LIMIT: f64 = 1e-12;
/// The sum must exceed its rounding error by this factor to be trusted.
const SUM_RESOLUTION: f64 = 1e3;

/// `C₀(x, μ)`: probability that the largest gap of a Poisson process with
/// total expectation `μ` is smaller than `x`.
///
/// For few gaps per window this is the closed form
/// `Σ_{k=0}^{⌊μ/x⌋} e^{−kx} / k! · [(kx − μ)^k − k (kx − μ)^{k−1}]`,
/// which stays finite when `kx = μ`. Once its terms grow large enough that
/// cancellation would eat the result, `C₀` is integrated from its delay
/// equation instead.
pub fn max_gap_c0(x: f64, mu: f64) -> f64 {
    if !(x > 0.0 && mu > 0.0) {
        return 0.0;
    }
    // No gap exceeds the whole window. x = μ (no events) goes through the sum.
    if x > mu {
        return 1.0;
    }
    alternating_sum(x, mu).unwrap_or_else(|| delay_equation(x, mu))
}

/// The closed form, or `None` when the accumulated rounding error of the
/// terms exceeds `SUM_ROUNDING_LIMIT` or is not small against the result.
fn alternating_sum(x: f64, mu: f64) -> Option<f64> {
    let m = (mu / x).floor() as u64;
    let per_term = (m + 1) as f64 * f64::EPSILON;
    let mut sum = 1.0;
    let mut largest: f64 = 1.0;
    for k in 1..=m {
        let kf = k as f64;
        let d = kf * x - mu;
        let log_scale = -kf * x - ln_factorial(k);
        let term = signed_power(d, k, log_scale) - kf * signed_power(d, k - 1, log_scale);
        largest = largest.max(term.abs());
        if largest * per_term > SUM_ROUNDING_LIMIT {
            return None;
        }
        sum += term;
    }
    let rounding = largest * per_term;
    (rounding <= SUM_ROUNDING_LIMIT && sum > SUM_RESOLUTION * rounding).then_some(sum)
}

/// `C₀` as a function of the window `t` obeys `C(t) = 1` for `t < x`,
/// `C(x) = 1 − e^{−x}` and `C'(t) = −e^{−x} C(t − x)` beyond. Trapezoidal
/// steps on a grid aligned with the delay; only one delay of history is kept.
fn delay_equation(x: f64, mu: f64) -> f64 {
    let n = NODES_PER_GAP;
    let h = x / n as f64;
    let decay = (-x).exp();

    // history[i] = C((j − n + i) h) for the current node j.
    let mut history: VecDeque<f64> = std::iter::repeat_n(1.0, n).collect();
    history.push_back(1.0 - decay);
    let mut j = n;
    loop {
        let current = history[n];
        let lagged = history[0];
        // The integrand C(t − x) approaches the jump at t − x = x from below.
        let lagged_next = if j + 1 == 2 * n { 1.0 } else { history[1] };
        let remainder = mu - j as f64 * h;
        if remainder < h {
            let r = remainder.max(0.0);
            let lagged_end = lagged + (lagged_next - lagged) * r / h;
            return (current - decay * r * 0.5 * (lagged + lagged_end)).max(0.0);
        }
        let next = current - decay * h * 0.5 * (lagged + lagged_next);
        if next <= 0.0 {
            return 0.0;
        }
        history.pop_front();
        history.push_back(next);
        j += 1;
    }
}

/// `d^n · e^{log_scale}` without overflow for large `|d|^n`; `0⁰ = 1`.
fn signed_power(d: f64, n: u64, log_scale: f64) -> f64 {
    if n == 0 {
        return log_scale.exp();
    }
    if d == 0.0 {
        return 0.0;
    }
    let magnitude = (n as f64 * d.abs().ln() + log_scale).exp();
    if d < 0.0 && n % 2 == 1 { -magnitude } else { magnitude }
}

pub fn maximum_gap(gaps: &[f64]) -> f64 {
    gaps.iter().copied().fold(0.0, f64::max)
}

/// `1 − C₀(x_max, μ)` for the given gap expectations.
pub fn max_gap_p_value(gaps: &[f64]) -> Result<f64, AppError> {
    if gaps.is_empty() {
        return Err(AppError::empty("Maximum-gap test needs at least one gap."));
    }
    let mu: f64 = gaps.iter().sum();
    Ok(1.0 - max_gap_c0(maximum_gap(gaps), mu))
}

/// Factor `k` on the whole signal with `C₀(k x_max, k μ) = cl`.
pub fn max_gap_upper_limit_scale(gaps: &[f64], cl: f64) -> Result<f64, AppError> {
    check_confidence_level(cl)?;
    if gaps.is_empty() {
        return Err(AppError::empty("Maximum-gap test needs at least one gap."));
    }
    let x = maximum_gap(gaps);
    let mu: f64 = gaps.iter().sum();
    if !(x > 0.0) {
        return Err(AppError::numerical(format!(
            "Expected signal {mu:e} vanishes in every gap: no exclusion possible."
        )));
    }
    Bisection::default().find_crossing(|k| max_gap_c0(k * x, k * mu), cl, 0.0, Direction::Up, 1.0 / mu, None)
}
