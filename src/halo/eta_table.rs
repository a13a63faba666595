//! Tabulated eta function and speed CDF for distributions without closed forms.

use crate::math::{gauss_legendre_rule, geometric_to_cutoff, Interpolation, OutOfRange};

/// Panels of the fixed rule used on each table segment.
const SEGMENT_PANELS: usize = 2;

/// Eta function and speed CDF of one speed density, tabulated on a grid that
/// densifies towards the cutoff speed `v_max`.
///
/// - `eta(v_max) = 0`, and `eta` is non-increasing (segment integrals of a
///   non-negative density are accumulated from the top).
/// - Queries below the first node clamp to the boundary value; queries at or
///   beyond `v_max` return `0` (eta) or the total weight (CDF).
#[derive(Debug, Clone)]
pub struct EtaTable {
    v_max: f64,
    eta: Interpolation,
    cdf: Interpolation,
}

impl EtaTable {
    /// Tabulate `pdf_speed` on `nodes` geometric nodes over `[0, v_max]`.
    ///
    /// `kinks` are speeds where the density has a derivative discontinuity;
    /// they are inserted into the grid so that no segment straddles one.
    pub fn build<F: Fn(f64) -> f64>(pdf_speed: F, v_max: f64, nodes: usize, kinks: &[f64]) -> Self {
        let mut speeds = geometric_to_cutoff(v_max, nodes, 1e-3);
        for &k in kinks {
            if k > 0.0 && k < v_max {
                speeds.push(k);
            }
        }
        speeds.sort_by(f64::total_cmp);
        speeds.dedup_by(|a, b| (*a - *b).abs() <= 1e-12 * v_max);

        let segments = speeds.len() - 1;
        let mut eta = vec![0.0; speeds.len()];
        let mut cdf = vec![0.0; speeds.len()];
        let mut eta_pieces = vec![0.0; segments];
        let mut cdf_pieces = vec![0.0; segments];
        for i in 0..segments {
            for (v, w) in gauss_legendre_rule(speeds[i], speeds[i + 1], SEGMENT_PANELS) {
                let f = pdf_speed(v).max(0.0);
                eta_pieces[i] += w * f / v;
                cdf_pieces[i] += w * f;
            }
        }
        for i in (0..segments).rev() {
            eta[i] = eta[i + 1] + eta_pieces[i];
        }
        for i in 0..segments {
            cdf[i + 1] = cdf[i] + cdf_pieces[i];
        }

        Self {
            v_max,
            eta: Interpolation::from_sorted(speeds.clone(), eta, OutOfRange::Clamp),
            cdf: Interpolation::from_sorted(speeds, cdf, OutOfRange::Clamp),
        }
    }

    pub fn speeds(&self) -> &[f64] {
        self.eta.nodes()
    }

    pub fn eta(&self, v_min: f64) -> f64 {
        if v_min >= self.v_max {
            return 0.0;
        }
        self.eta.eval(v_min)
    }

    pub fn cdf(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        self.cdf.eval(v)
    }

    /// Total tabulated weight, `cdf(v_max)`.
    pub fn total(&self) -> f64 {
        self.cdf.eval(self.v_max)
    }
}
