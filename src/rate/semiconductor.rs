//! Electron-hole pair spectra of semiconductor crystals.

use super::{flux_integral, uses_eta_factorization, REFERENCE_SPEED};
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::particle::{CrossSectionProvider, ElectronTarget};
use crate::target::{v_min_electron, Semiconductor};
use crate::units::{ALPHA_EM, M_ELECTRON};

/// `dR/dE_e` per unit crystal mass, summed over the form factor's momentum grid.
pub fn differential_rate_crystal(
    energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    crystal: &Semiconductor,
) -> Result<f64, AppError> {
    if energy <= 0.0 {
        return Ok(0.0);
    }
    let dm_mass = model.mass();
    let v_max = distribution.maximum_speed();
    let dq = crystal.form_factor.momentum_step();
    let factorized = uses_eta_factorization(model, distribution);
    let target = ElectronTarget::Crystal(crystal);

    let mut sum = 0.0;
    for &q in crystal.form_factor.momentum_nodes() {
        let v_min = v_min_electron(q, energy, dm_mass);
        if v_min >= v_max {
            continue;
        }
        let form_factor = crystal.crystal_form_factor(q, energy);
        if form_factor == 0.0 {
            continue;
        }
        let velocity_part = if factorized {
            let v = REFERENCE_SPEED;
            distribution.local_density() / dm_mass
                * distribution.eta(v_min)
                * v
                * v
                * model.differential_cross_section_electron(q, energy, v, target)
        } else {
            flux_integral(distribution, dm_mass, v_min, |v| {
                model.differential_cross_section_electron(q, energy, v, target)
            })?
        };
        sum += dq / (q * q) * form_factor * velocity_part;
    }
    let prefactor = 4.0 / crystal.cell_mass * ALPHA_EM * M_ELECTRON * M_ELECTRON;
    Ok(prefactor * sum)
}

/// `Σ dE · dR/dE` over the crystal's energy nodes in `(lower, upper]`.
fn summed_rate(
    lower: f64,
    upper: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    crystal: &Semiconductor,
) -> Result<f64, AppError> {
    let de = crystal.form_factor.energy_step();
    let mut sum = 0.0;
    for &e in crystal.form_factor.energy_nodes() {
        if e <= lower {
            continue;
        }
        if e > upper {
            break;
        }
        sum += de * differential_rate_crystal(e, model, distribution, crystal)?;
    }
    Ok(sum)
}

/// Rate of events with exactly `pairs` electron-hole pairs.
pub fn pair_rate(
    pairs: u32,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    crystal: &Semiconductor,
) -> Result<f64, AppError> {
    if pairs == 0 {
        return Ok(0.0);
    }
    summed_rate(
        crystal.minimum_energy(pairs),
        crystal.minimum_energy(pairs + 1),
        model,
        distribution,
        crystal,
    )
}

/// Rate of events with at least `threshold` pairs.
pub fn pair_rate_above(
    threshold: u32,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    crystal: &Semiconductor,
) -> Result<f64, AppError> {
    summed_rate(crystal.minimum_energy(threshold), f64::INFINITY, model, distribution, crystal)
}
