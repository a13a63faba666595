//! Monotone root finding with geometric bracket expansion.
//!
//! One primitive serves two jobs:
//!
//! - solving `statistic(scale) = target` for the exclusion scale (the bracket is
//!   grown geometrically from a seed because the answer can sit anywhere over
//!   many decades), and
//! - locating effective integration bounds, i.e. the point where an integrand
//!   falls below a fraction of its peak.
//!
//! Only a sign change of `f(x) - target` relative to its value at the origin is
//! assumed, so the same code handles increasing and decreasing functions.

use crate::error::AppError;

/// Which way [`Bisection::find_crossing`] walks away from its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

/// Bracketing and bisection settings.
#[derive(Debug, Clone, Copy)]
pub struct Bisection {
    /// Relative width of the final bracket.
    pub rel_tol: f64,
    /// Absolute width of the final bracket (useful when the root may be ~0).
    pub abs_tol: f64,
    /// Maximum number of bisection steps.
    pub max_iter: usize,
    /// Step growth factor during bracket expansion.
    pub growth: f64,
    /// Maximum number of expansion steps.
    pub max_expansions: usize,
}

impl Default for Bisection {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            abs_tol: 0.0,
            max_iter: 200,
            growth: 10.0,
            max_expansions: 60,
        }
    }
}

impl Bisection {
    /// Walk from `origin` in `direction` (first probe at distance `first_step`,
    /// then growing geometrically) until `f(x) - target` changes sign relative
    /// to `f(origin) - target`, then refine the bracket by bisection.
    ///
    /// `limit`, if given, caps the walk; reaching it without a sign change is an
    /// error.
    pub fn find_crossing<F: Fn(f64) -> f64>(
        &self,
        f: F,
        target: f64,
        origin: f64,
        direction: Direction,
        first_step: f64,
        limit: Option<f64>,
    ) -> Result<f64, AppError> {
        if !(first_step.is_finite() && first_step > 0.0) {
            return Err(AppError::config(format!(
                "Bracket expansion needs a positive first step, got {first_step}."
            )));
        }
        let g0 = f(origin) - target;
        if g0.is_nan() {
            return Err(AppError::numerical(format!("Function is NaN at bracket origin {origin:e}.")));
        }
        if g0 == 0.0 {
            return Ok(origin);
        }

        let sign = direction.sign();
        let mut inner = origin;
        let mut step = first_step;
        for _ in 0..self.max_expansions {
            let mut x = origin + sign * step;
            let mut at_limit = false;
            if let Some(l) = limit {
                if (x - l) * sign >= 0.0 {
                    x = l;
                    at_limit = true;
                }
            }

            let g = f(x) - target;
            if g.is_nan() {
                return Err(AppError::numerical(format!("Function is NaN at {x:e} during bracketing.")));
            }
            if g == 0.0 {
                return Ok(x);
            }
            if g.signum() != g0.signum() {
                return self.refine(&f, target, inner, x);
            }
            if at_limit {
                return Err(AppError::numerical(format!(
                    "No crossing of target {target:e} between {origin:e} and limit {x:e}."
                )));
            }
            inner = x;
            step *= self.growth;
        }

        Err(AppError::numerical(format!(
            "Failed to bracket target {target:e} within {} expansions from {origin:e}.",
            self.max_expansions
        )))
    }

    /// Bisect a bracket `[a, b]` (in either order) across which `f - target`
    /// changes sign.
    pub fn refine<F: Fn(f64) -> f64>(&self, f: &F, target: f64, a: f64, b: f64) -> Result<f64, AppError> {
        let mut lo = a;
        let mut hi = b;
        let mut g_lo = f(lo) - target;
        let g_hi = f(hi) - target;
        if g_lo == 0.0 {
            return Ok(lo);
        }
        if g_hi == 0.0 {
            return Ok(hi);
        }
        if g_lo.signum() == g_hi.signum() {
            return Err(AppError::numerical(format!(
                "Bisection bracket [{a:e}, {b:e}] does not enclose target {target:e}."
            )));
        }

        for _ in 0..self.max_iter {
            let mid = 0.5 * (lo + hi);
            let width = (hi - lo).abs();
            if width <= self.abs_tol + self.rel_tol * mid.abs() || mid == lo || mid == hi {
                return Ok(mid);
            }
            let g_mid = f(mid) - target;
            if g_mid == 0.0 {
                return Ok(mid);
            }
            if g_mid.signum() == g_lo.signum() {
                lo = mid;
                g_lo = g_mid;
            } else {
                hi = mid;
            }
        }

        Err(AppError::numerical(format!(
            "Bisection did not converge within {} iterations (bracket [{lo:e}, {hi:e}]).",
            self.max_iter
        )))
    }
}

const PEAK_SAMPLES: usize = 64;

/// Location and value of the largest `|f|` on a uniform sample of `[a, b]`.
pub fn sampled_peak<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> (f64, f64) {
    let mut best = (a, f(a).abs());
    for i in 1..=PEAK_SAMPLES {
        let x = a + (b - a) * i as f64 / PEAK_SAMPLES as f64;
        let y = f(x).abs();
        if y > best.1 {
            best = (x, y);
        }
    }
    best
}

fn bound_search() -> Bisection {
    Bisection {
        rel_tol: 1e-6,
        growth: 2.0,
        ..Bisection::default()
    }
}

/// Largest `x ≤ b` beyond which `|f|` stays below `cutoff` times its peak.
///
/// Returns `a` when `f` vanishes on the whole sample.
pub fn effective_upper_bound<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, cutoff: f64) -> Result<f64, AppError> {
    let (x_peak, peak) = sampled_peak(f, a, b);
    if peak == 0.0 {
        return Ok(a);
    }
    let threshold = cutoff * peak;
    if f(b).abs() >= threshold || x_peak >= b {
        return Ok(b);
    }
    let first_step = (b - x_peak) / PEAK_SAMPLES as f64;
    bound_search().find_crossing(|x| f(x).abs(), threshold, x_peak, Direction::Up, first_step, Some(b))
}

/// Smallest `x ≥ a` below which `|f|` stays below `cutoff` times its peak.
///
/// Returns `b` when `f` vanishes on the whole sample.
pub fn effective_lower_bound<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, cutoff: f64) -> Result<f64, AppError> {
    let (x_peak, peak) = sampled_peak(f, a, b);
    if peak == 0.0 {
        return Ok(b);
    }
    let threshold = cutoff * peak;
    if f(a).abs() >= threshold || x_peak <= a {
        return Ok(a);
    }
    let first_step = (x_peak - a) / PEAK_SAMPLES as f64;
    bound_search().find_crossing(|x| f(x).abs(), threshold, x_peak, Direction::Down, first_step, Some(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solves_increasing_function_from_far_seed() {
        let f = |x: f64| x * x * x;
        let root = Bisection::default()
            .find_crossing(f, 1.0e6, 0.0, Direction::Up, 1e-3, None)
            .unwrap();
        assert_relative_eq!(f(root), 1.0e6, max_relative = 1e-5);
    }

    #[test]
    fn solves_decreasing_function() {
        let f = |x: f64| (-x).exp();
        let root = Bisection::default()
            .find_crossing(f, 0.1, 0.0, Direction::Up, 1.0e3, None)
            .unwrap();
        assert_relative_eq!(root, 10f64.ln(), max_relative = 1e-5);
    }

    #[test]
    fn solution_is_unique_for_strictly_increasing_function() {
        let f = |x: f64| 2.0 * x + x.sqrt();
        let target = 7.3;
        let bis = Bisection::default();
        let a = bis.find_crossing(f, target, 0.0, Direction::Up, 1e-4, None).unwrap();
        let b = bis.find_crossing(f, target, 0.0, Direction::Up, 1e4, None).unwrap();
        assert_relative_eq!(a, b, max_relative = 2e-6);
        assert_relative_eq!(f(a), target, max_relative = 1e-5);
    }

    #[test]
    fn missing_crossing_before_limit_is_an_error() {
        let err = Bisection::default()
            .find_crossing(|x| x, 5.0, 0.0, Direction::Up, 0.1, Some(1.0))
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn effective_bounds_bracket_a_gaussian_bump() {
        let f = |x: f64| (-(x - 5.0) * (x - 5.0) / 2.0).exp();
        let hi = effective_upper_bound(&f, 0.0, 20.0, 1e-4).unwrap();
        let lo = effective_lower_bound(&f, 0.0, 20.0, 1e-4).unwrap();
        let width = (2.0 * 1e4f64.ln()).sqrt();
        assert_relative_eq!(hi, 5.0 + width, max_relative = 1e-4);
        assert_relative_eq!(lo, 5.0 - width, max_relative = 1e-4);
    }
}
