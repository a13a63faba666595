//! Spin-independent scattering with a contact or light mediator.

use serde::{Deserialize, Serialize};

use super::{CrossSectionProvider, ElectronTarget};
use crate::error::AppError;
use crate::target::Isotope;
use crate::units::{reduced_mass, ALPHA_EM, M_ELECTRON, M_PROTON};

/// Mediator of the electron interaction, via the dark-matter form factor
/// `F_DM(q)` with reference momentum `α m_e`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mediator {
    /// `F_DM = 1`.
    Contact,
    /// `F_DM = (α m_e / q)²`.
    Light,
}

/// Isospin-conserving spin-independent interaction.
///
/// - nuclei: `dσ/dE_R = m_N σ_p A² F_Helm² / (2 μ_p² v²)`
/// - electrons: `dσ/dq² = σ_e F_DM² / (4 μ_e² v²)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinIndependent {
    pub mass: f64,
    pub sigma_proton: f64,
    pub sigma_electron: f64,
    pub mediator: Mediator,
}

impl SpinIndependent {
    pub fn nuclear(mass: f64, sigma_proton: f64) -> Result<Self, AppError> {
        Self::new(mass, sigma_proton, 0.0, Mediator::Contact)
    }

    pub fn electronic(mass: f64, sigma_electron: f64, mediator: Mediator) -> Result<Self, AppError> {
        Self::new(mass, 0.0, sigma_electron, mediator)
    }

    pub fn new(mass: f64, sigma_proton: f64, sigma_electron: f64, mediator: Mediator) -> Result<Self, AppError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(AppError::config(format!("Dark-matter mass must be positive, got {mass:e}.")));
        }
        if sigma_proton < 0.0 || sigma_electron < 0.0 {
            return Err(AppError::config("Cross sections must be non-negative."));
        }
        Ok(Self {
            mass,
            sigma_proton,
            sigma_electron,
            mediator,
        })
    }

    /// Same couplings, different mass.
    pub fn with_mass(&self, mass: f64) -> Self {
        Self { mass, ..self.clone() }
    }

    fn dm_form_factor(&self, q: f64) -> f64 {
        match self.mediator {
            Mediator::Contact => 1.0,
            Mediator::Light => {
                let q_ref = ALPHA_EM * M_ELECTRON;
                (q_ref / q).powi(2)
            }
        }
    }

    /// `dσ/dq²` for a free electron.
    pub fn dsigma_dq2_electron(&self, q: f64, speed: f64) -> f64 {
        let mu = reduced_mass(self.mass, M_ELECTRON);
        let f = self.dm_form_factor(q);
        self.sigma_electron / (4.0 * mu * mu * speed * speed) * f * f
    }
}

impl CrossSectionProvider for SpinIndependent {
    fn mass(&self) -> f64 {
        self.mass
    }

    fn interaction_strength(&self) -> f64 {
        if self.sigma_proton > 0.0 { self.sigma_proton } else { self.sigma_electron }
    }

    fn differential_cross_section_nucleus(&self, recoil_energy: f64, isotope: &Isotope, speed: f64) -> f64 {
        let mu_p = reduced_mass(self.mass, M_PROTON);
        let a = isotope.a as f64;
        let q = (2.0 * isotope.mass * recoil_energy).sqrt();
        let ff = isotope.helm_form_factor(q);
        isotope.mass * self.sigma_proton * a * a * ff * ff / (2.0 * mu_p * mu_p * speed * speed)
    }

    fn total_cross_section_nucleus(&self, isotope: &Isotope, _speed: f64) -> f64 {
        let mu_p = reduced_mass(self.mass, M_PROTON);
        let mu_n = reduced_mass(self.mass, isotope.mass);
        let a = isotope.a as f64;
        self.sigma_proton * (mu_n / mu_p).powi(2) * a * a
    }

    fn differential_cross_section_electron(
        &self,
        q: f64,
        energy: f64,
        speed: f64,
        target: ElectronTarget<'_>,
    ) -> f64 {
        let free = self.dsigma_dq2_electron(q, speed);
        match target {
            ElectronTarget::Crystal(_) => free,
            ElectronTarget::Shell(shell) => free / (4.0 * energy) * shell.ionization_form_factor(q, energy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{CM, GEV, KEV, KM_PER_SEC, MEV};
    use approx::assert_relative_eq;

    #[test]
    fn nuclear_cross_section_scales_like_a_squared_times_v_inverse_squared() {
        let model = SpinIndependent::nuclear(100.0 * GEV, 1e-45 * CM * CM).unwrap();
        let xe = Isotope::new(54, 131, 1.0);
        let v = 300.0 * KM_PER_SEC;
        let at_v = model.differential_cross_section_nucleus(1.0 * KEV, &xe, v);
        let at_2v = model.differential_cross_section_nucleus(1.0 * KEV, &xe, 2.0 * v);
        assert_relative_eq!(at_v / at_2v, 4.0, max_relative = 1e-12);

        // Integrating dσ/dE_R over [0, E_max] with F = 1 recovers σ_N.
        let mu = reduced_mass(model.mass, xe.mass);
        let e_max = 2.0 * mu * mu * v * v / xe.mass;
        let flat = xe.mass * model.sigma_proton * 131.0f64.powi(2)
            / (2.0 * reduced_mass(model.mass, M_PROTON).powi(2) * v * v);
        assert_relative_eq!(flat * e_max, model.total_cross_section_nucleus(&xe, v), max_relative = 1e-12);
    }

    #[test]
    fn light_mediator_suppresses_large_momentum_transfer() {
        let model = SpinIndependent::electronic(100.0 * MEV, 1e-37 * CM * CM, Mediator::Light).unwrap();
        let q_ref = ALPHA_EM * M_ELECTRON;
        let v = 1e-3;
        assert_relative_eq!(
            model.dsigma_dq2_electron(2.0 * q_ref, v) / model.dsigma_dq2_electron(q_ref, v),
            1.0 / 16.0,
            max_relative = 1e-12
        );
        assert_eq!(model.interaction_strength(), 1e-37 * CM * CM);
    }

    #[test]
    fn rejects_unphysical_parameters() {
        assert!(SpinIndependent::nuclear(0.0, 1.0).is_err());
        assert!(SpinIndependent::nuclear(1.0, -1.0).is_err());
        let model = SpinIndependent::nuclear(10.0, 1.0).unwrap();
        assert_eq!(model.with_mass(20.0).mass, 20.0);
    }
}
