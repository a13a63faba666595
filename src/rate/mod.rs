//! Differential event rates: a velocity distribution coupled to a
//! cross-section model for a given target material.
//!
//! Rates are per unit target mass, time and deposited energy (or per unit
//! target mass and time for quantized spectra). Nothing here is cached: every
//! call recomputes from the model it is handed.

pub mod ionization;
pub mod nucleus;
pub mod resolution;
pub mod semiconductor;

pub use ionization::*;
pub use nucleus::*;
pub use resolution::*;
pub use semiconductor::*;

use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::math::{Quadrature, DEFAULT_TAIL_CUTOFF};
use crate::particle::CrossSectionProvider;
use crate::target::{Atom, NuclearTarget, Semiconductor};

/// Speed at which `v² dσ` is evaluated on the factorized path; any value
/// gives the same result when factorization is allowed.
pub const REFERENCE_SPEED: f64 = 1.0e-3;

/// Target a rate is computed for.
#[derive(Debug, Clone, Copy)]
pub enum TargetMaterial<'a> {
    Nuclear(&'a NuclearTarget),
    Atom(&'a Atom),
    Crystal(&'a Semiconductor),
}

/// Whether the velocity integral collapses into the eta function; both the
/// model and the distribution have to allow it.
pub fn uses_eta_factorization(model: &dyn CrossSectionProvider, distribution: &dyn VelocityDistribution) -> bool {
    model.supports_eta_factorization() && distribution.supports_eta_factorization()
}

/// `∫_{v_min}^{v_max} flux(v) · cross_section(v) dv` with negligible tails trimmed.
pub(crate) fn flux_integral<F: Fn(f64) -> f64>(
    distribution: &dyn VelocityDistribution,
    dm_mass: f64,
    v_min: f64,
    cross_section: F,
) -> Result<f64, AppError> {
    let v_max = distribution.maximum_speed();
    if v_min >= v_max {
        return Ok(0.0);
    }
    Quadrature::default().integrate_truncated(
        |v| distribution.differential_flux(v, dm_mass) * cross_section(v),
        v_min,
        v_max,
        DEFAULT_TAIL_CUTOFF,
    )
}

/// Differential rate at deposited energy `energy`.
pub fn differential_rate(
    energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    target: TargetMaterial<'_>,
) -> Result<f64, AppError> {
    match target {
        TargetMaterial::Nuclear(t) => differential_rate_nucleus(energy, model, distribution, t),
        TargetMaterial::Atom(a) => differential_rate_atom(energy, model, distribution, a),
        TargetMaterial::Crystal(c) => differential_rate_crystal(energy, model, distribution, c),
    }
}

/// `∫ dR/dE dE` over `[e_min, e_max]`.
pub fn integrated_rate(
    e_min: f64,
    e_max: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    target: TargetMaterial<'_>,
) -> Result<f64, AppError> {
    if e_max <= e_min {
        return Ok(0.0);
    }
    Quadrature::default().try_integrate_truncated(
        |e| differential_rate(e, model, distribution, target),
        e_min,
        e_max,
        DEFAULT_TAIL_CUTOFF,
    )
}
