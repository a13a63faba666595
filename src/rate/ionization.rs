//! Ionization spectra of isolated atoms: recoil-electron energy, electron
//! number, and photo-electron (S2) spectra.

use statrs::distribution::{Binomial, Continuous, Discrete, Normal};

use super::{flux_integral, uses_eta_factorization, REFERENCE_SPEED};
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::math::{log_space, Grid2d};
use crate::particle::{CrossSectionProvider, ElectronTarget};
use crate::target::{v_min_electron, Atom, AtomicShell};

/// Momentum-transfer nodes of the outer (log-spaced) integral.
const MOMENTUM_NODES: usize = 100;

/// `dR/dE_e` per unit target mass for ionizing `shell` of an atom whose
/// nucleus has mass `nucleus_mass`.
pub fn differential_rate_shell(
    electron_energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    nucleus_mass: f64,
    shell: &AtomicShell,
) -> Result<f64, AppError> {
    let dm_mass = model.mass();
    let v_max = distribution.maximum_speed();
    if 0.5 * dm_mass * v_max * v_max < shell.binding_energy {
        return Ok(0.0);
    }

    // Momentum transfers kinematically allowed for the binding energy alone.
    let p = dm_mass * v_max;
    let root = (p * p - 2.0 * dm_mass * shell.binding_energy).max(0.0).sqrt();
    let q_min = p - root;
    let q_max = (p + root).min(shell.q_max);
    if q_min <= 0.0 || q_min >= q_max {
        return Ok(0.0);
    }

    let q_grid = log_space(q_min, q_max, MOMENTUM_NODES)?;
    let d_ln_q = (q_grid[1] / q_grid[0]).ln();
    let energy_transfer = shell.binding_energy + electron_energy;
    let factorized = uses_eta_factorization(model, distribution);
    let target = ElectronTarget::Shell(shell);

    let mut integral = 0.0;
    for &q in &q_grid {
        let v_min = v_min_electron(q, energy_transfer, dm_mass);
        if v_min >= v_max {
            continue;
        }
        let velocity_part = if factorized {
            let v = REFERENCE_SPEED;
            v * v
                * model.differential_cross_section_electron(q, electron_energy, v, target)
                * distribution.local_density()
                / dm_mass
                * distribution.eta(v_min)
        } else {
            flux_integral(distribution, dm_mass, v_min, |v| {
                model.differential_cross_section_electron(q, electron_energy, v, target)
            })?
        };
        // dq² = 2 q² d ln q
        integral += 2.0 * d_ln_q * q * q * velocity_part;
    }
    Ok(integral / nucleus_mass)
}

/// Sum over the atom's shells.
pub fn differential_rate_atom(
    electron_energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    atom: &Atom,
) -> Result<f64, AppError> {
    let mut rate = 0.0;
    for shell in &atom.shells {
        rate += differential_rate_shell(electron_energy, model, distribution, atom.nucleus_mass, shell)?;
    }
    Ok(rate)
}

/// `P(n_e | E_e)`: the primary electron plus a binomial share of the
/// `⌊E_e / W⌋ + extra` secondary quanta that end up as electrons.
pub fn electron_number_probability(electrons: u32, electron_energy: f64, shell: &AtomicShell, atom: &Atom) -> f64 {
    if electrons == 0 {
        return 0.0;
    }
    let secondary = (electron_energy / atom.quantum_energy).floor().max(0.0) as u64 + shell.extra_quanta as u64;
    let k = (electrons - 1) as u64;
    if k > secondary {
        return 0.0;
    }
    Binomial::new(atom.electron_fraction, secondary)
        .map(|b| b.pmf(k))
        .unwrap_or(0.0)
}

/// Rate of events with exactly `electrons` electrons from one shell,
/// integrated over the shell's tabulated electron energies.
pub fn electron_rate_shell(
    electrons: u32,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    atom: &Atom,
    shell: &AtomicShell,
) -> Result<f64, AppError> {
    let energies = shell.form_factor.energy_nodes();
    let widths = Grid2d::node_widths(energies);
    let mut rate = 0.0;
    for (&e, &w) in energies.iter().zip(&widths) {
        let p = electron_number_probability(electrons, e, shell, atom);
        if p == 0.0 {
            continue;
        }
        rate += w * p * differential_rate_shell(e, model, distribution, atom.nucleus_mass, shell)?;
    }
    Ok(rate)
}

/// Electron-number spectrum `[R(1), …, R(n_max)]` summed over shells.
pub fn electron_spectrum(
    max_electrons: u32,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    atom: &Atom,
) -> Result<Vec<f64>, AppError> {
    let mut spectrum = vec![0.0; max_electrons as usize];
    for shell in &atom.shells {
        let energies = shell.form_factor.energy_nodes();
        let widths = Grid2d::node_widths(energies);
        for (&e, &w) in energies.iter().zip(&widths) {
            let rate = differential_rate_shell(e, model, distribution, atom.nucleus_mass, shell)?;
            if rate == 0.0 {
                continue;
            }
            for (i, slot) in spectrum.iter_mut().enumerate() {
                *slot += w * rate * electron_number_probability(i as u32 + 1, e, shell, atom);
            }
        }
    }
    Ok(spectrum)
}

/// Photo-electron count probability for `electrons` extracted electrons:
/// `Gauss(n_PE; n_e μ, √n_e σ)`.
pub fn photoelectron_probability(photoelectrons: u32, electrons: u32, mu_pe: f64, sigma_pe: f64) -> f64 {
    if electrons == 0 {
        return 0.0;
    }
    let n = electrons as f64;
    Normal::new(n * mu_pe, n.sqrt() * sigma_pe)
        .map(|g| g.pdf(photoelectrons as f64))
        .unwrap_or(0.0)
}

/// Rate at `photoelectrons` PE given the electron-number spectrum
/// (`electron_rates[i]` is the rate for `i + 1` electrons).
pub fn photoelectron_rate(photoelectrons: u32, electron_rates: &[f64], mu_pe: f64, sigma_pe: f64) -> f64 {
    electron_rates
        .iter()
        .enumerate()
        .map(|(i, r)| r * photoelectron_probability(photoelectrons, i as u32 + 1, mu_pe, sigma_pe))
        .sum()
}
