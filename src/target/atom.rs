//! Isolated atoms ionized by electron scattering (liquid noble-gas targets).

use super::FormFactorTable;
use crate::error::AppError;

/// One bound shell with its tabulated ionization form factor
/// `|f_ion(q, E_e)|²` on a (momentum, recoil-electron energy) grid.
#[derive(Debug, Clone)]
pub struct AtomicShell {
    pub name: String,
    pub binding_energy: f64,
    /// Largest tabulated momentum transfer.
    pub q_max: f64,
    /// Secondary quanta released by de-excitation, on top of `⌊E_e / W⌋`.
    pub extra_quanta: u32,
    pub form_factor: FormFactorTable,
}

impl AtomicShell {
    pub fn new(
        name: impl Into<String>,
        binding_energy: f64,
        extra_quanta: u32,
        form_factor: FormFactorTable,
    ) -> Result<Self, AppError> {
        let name = name.into();
        if !(binding_energy.is_finite() && binding_energy > 0.0) {
            return Err(AppError::config(format!("Shell {name}: binding energy must be positive.")));
        }
        Ok(Self {
            name,
            binding_energy,
            q_max: form_factor.max_momentum(),
            extra_quanta,
            form_factor,
        })
    }

    pub fn ionization_form_factor(&self, q: f64, electron_energy: f64) -> f64 {
        self.form_factor.eval(q, electron_energy)
    }
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub name: String,
    pub nucleus_mass: f64,
    pub shells: Vec<AtomicShell>,
    /// Mean energy `W` to create one quantum (electron or photon).
    pub quantum_energy: f64,
    /// Probability `f_e` that a secondary quantum is an electron.
    pub electron_fraction: f64,
}

impl Atom {
    pub fn new(
        name: impl Into<String>,
        nucleus_mass: f64,
        shells: Vec<AtomicShell>,
        quantum_energy: f64,
        electron_fraction: f64,
    ) -> Result<Self, AppError> {
        let name = name.into();
        if shells.is_empty() {
            return Err(AppError::empty(format!("Atom {name} has no shells.")));
        }
        if !(nucleus_mass > 0.0 && quantum_energy > 0.0) {
            return Err(AppError::config(format!(
                "Atom {name}: nucleus mass and energy per quantum must be positive."
            )));
        }
        if !(0.0..=1.0).contains(&electron_fraction) {
            return Err(AppError::config(format!(
                "Atom {name}: electron fraction must lie in [0, 1], got {electron_fraction}."
            )));
        }
        Ok(Self {
            name,
            nucleus_mass,
            shells,
            quantum_energy,
            electron_fraction,
        })
    }

    pub fn lowest_binding_energy(&self) -> f64 {
        self.shells
            .iter()
            .map(|s| s.binding_energy)
            .fold(f64::INFINITY, f64::min)
    }
}
