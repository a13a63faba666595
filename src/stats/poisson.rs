//! Single-bin Poisson test with known background.

use statrs::distribution::{DiscreteCDF, Poisson};

use crate::error::AppError;
use crate::math::{Bisection, Direction};

/// `P(N ≤ observed)` for a Poisson variable of mean `mean` (1 for a zero mean).
pub fn poisson_cdf(observed: u64, mean: f64) -> f64 {
    if mean <= 0.0 {
        return 1.0;
    }
    match Poisson::new(mean) {
        Ok(p) => p.cdf(observed),
        Err(_) => 0.0,
    }
}

/// Probability of observing at most `observed` events if the signal is real.
pub fn poisson_p_value(observed: u64, signal: f64, background: f64) -> f64 {
    poisson_cdf(observed, signal + background)
}

/// Smallest factor `k` with `P(N ≤ observed | k · signal + background) = 1 − cl`.
pub fn poisson_upper_limit_scale(observed: u64, signal: f64, background: f64, cl: f64) -> Result<f64, AppError> {
    check_confidence_level(cl)?;
    if !(signal > 0.0) {
        return Err(AppError::numerical(format!(
            "Expected signal {signal:e} vanishes: no exclusion possible."
        )));
    }
    let target = 1.0 - cl;
    if poisson_cdf(observed, background) <= target {
        return Err(AppError::numerical(format!(
            "Background {background} alone is excluded at {cl} CL with {observed} observed events."
        )));
    }
    Bisection::default().find_crossing(
        |k| poisson_cdf(observed, k * signal + background),
        target,
        0.0,
        Direction::Up,
        1.0 / signal,
        None,
    )
}

pub(crate) fn check_confidence_level(cl: f64) -> Result<(), AppError> {
    if !(cl > 0.0 && cl < 1.0) {
        return Err(AppError::config(format!("Confidence level must lie in (0, 1), got {cl}.")));
    }
    Ok(())
}
