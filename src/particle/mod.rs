//! Dark-matter interaction models.
//!
//! The rate layer only needs the [`CrossSectionProvider`] capability: a mass,
//! differential cross sections for nuclear and electronic targets, and whether
//! the velocity integral may be factorized into the eta function.

pub mod standard;

pub use standard::*;

use crate::target::{AtomicShell, Isotope, Semiconductor};

/// Electronic target a cross section is evaluated for.
#[derive(Debug, Clone, Copy)]
pub enum ElectronTarget<'a> {
    /// Bound atomic shell: the provider returns `d²σ / (dq² dE_e)` including
    /// the ionization form factor.
    Shell(&'a AtomicShell),
    /// Crystal: the provider returns `dσ / dq²` of a free electron; the rate
    /// layer applies the crystal form factor.
    Crystal(&'a Semiconductor),
}

pub trait CrossSectionProvider {
    /// Dark-matter particle mass.
    fn mass(&self) -> f64;

    /// Reference interaction strength the exclusion scale multiplies
    /// (a reference cross section).
    fn interaction_strength(&self) -> f64;

    /// `dσ / dE_R` for recoil energy `recoil_energy` off `isotope` at relative
    /// speed `speed`.
    fn differential_cross_section_nucleus(&self, recoil_energy: f64, isotope: &Isotope, speed: f64) -> f64;

    /// Total nuclear cross section without form-factor suppression; zero marks
    /// isotopes the model does not couple to.
    fn total_cross_section_nucleus(&self, isotope: &Isotope, speed: f64) -> f64;

    /// Electron cross section at momentum transfer `q` and energy deposit
    /// `energy`; see [`ElectronTarget`] for what each variant returns.
    fn differential_cross_section_electron(
        &self,
        q: f64,
        energy: f64,
        speed: f64,
        target: ElectronTarget<'_>,
    ) -> f64;

    /// Whether `v² · dσ` is independent of `v`, so the velocity integral
    /// reduces to the eta function.
    fn supports_eta_factorization(&self) -> bool {
        true
    }
}
