//! Gaussian energy resolution.

use statrs::distribution::{Continuous, Normal};

use crate::error::AppError;
use crate::math::{Quadrature, DEFAULT_TAIL_CUTOFF};
use crate::units::EV;

/// Resolutions below this are treated as perfect.
pub const NEGLIGIBLE_RESOLUTION: f64 = 1e-6 * EV;

/// Observed spectrum at `observed` for true spectrum `raw`, smeared with a
/// Gaussian of width `sigma`.
///
/// True energies are integrated over
/// `[max(observed − 6σ, threshold − 2σ, 0), observed + 6σ]`.
pub fn smeared_rate<F: Fn(f64) -> Result<f64, AppError>>(
    observed: f64,
    sigma: f64,
    threshold: f64,
    raw: F,
) -> Result<f64, AppError> {
    if sigma < NEGLIGIBLE_RESOLUTION {
        return raw(observed);
    }
    let lower = (observed - 6.0 * sigma).max(threshold - 2.0 * sigma).max(0.0);
    let upper = observed + 6.0 * sigma;
    if upper <= lower {
        return Ok(0.0);
    }
    let response = Normal::new(observed, sigma)
        .map_err(|err| AppError::config(format!("Invalid energy resolution {sigma:e}: {err}")))?;
    Quadrature::default().try_integrate_truncated(
        |true_energy| Ok(response.pdf(true_energy) * raw(true_energy)?),
        lower,
        upper,
        DEFAULT_TAIL_CUTOFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::KEV;
    use approx::assert_relative_eq;

    #[test]
    fn negligible_resolution_is_identity() {
        let raw = |e: f64| Ok(3.0 * e);
        assert_eq!(smeared_rate(2.0 * KEV, 0.0, 1.0 * KEV, raw).unwrap(), 6.0 * KEV);
    }

    #[test]
    fn smearing_preserves_linear_spectra_away_from_threshold() {
        let raw = |e: f64| Ok(5.0 - e / KEV);
        let v = smeared_rate(2.0 * KEV, 0.05 * KEV, 0.5 * KEV, raw).unwrap();
        assert_relative_eq!(v, 3.0, max_relative = 1e-4);
    }

    #[test]
    fn threshold_cuts_the_window() {
        let raw = |_e: f64| Ok(1.0);
        let sigma = 0.1 * KEV;
        let at_threshold = smeared_rate(1.0 * KEV, sigma, 1.0 * KEV, raw).unwrap();
        // Lower edge at threshold − 2σ: Φ(2) of the Gaussian weight survives.
        assert_relative_eq!(at_threshold, 0.977_25, max_relative = 1e-3);
    }
}
