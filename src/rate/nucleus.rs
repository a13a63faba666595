//! Nuclear recoil spectra.

use super::{flux_integral, uses_eta_factorization, REFERENCE_SPEED};
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::particle::CrossSectionProvider;
use crate::target::{v_min_nucleus, Element, Isotope, NuclearTarget};

/// `dR/dE_R` per unit mass of a target made of `isotope` only.
pub fn differential_rate_isotope(
    recoil_energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    isotope: &Isotope,
) -> Result<f64, AppError> {
    if recoil_energy < 0.0 {
        return Ok(0.0);
    }
    let dm_mass = model.mass();
    let v_min = v_min_nucleus(recoil_energy, dm_mass, isotope.mass);
    if v_min >= distribution.maximum_speed() {
        return Ok(0.0);
    }

    let targets_per_mass = 1.0 / isotope.mass;
    if uses_eta_factorization(model, distribution) {
        let v = REFERENCE_SPEED;
        let v2_sigma = v * v * model.differential_cross_section_nucleus(recoil_energy, isotope, v);
        Ok(targets_per_mass * distribution.local_density() / dm_mass * v2_sigma * distribution.eta(v_min))
    } else {
        let integral = flux_integral(distribution, dm_mass, v_min, |v| {
            model.differential_cross_section_nucleus(recoil_energy, isotope, v)
        })?;
        Ok(targets_per_mass * integral)
    }
}

/// Abundance-weighted sum over the element's isotopes.
pub fn differential_rate_element(
    recoil_energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    element: &Element,
) -> Result<f64, AppError> {
    let mut rate = 0.0;
    for isotope in &element.isotopes {
        rate += isotope.abundance * differential_rate_isotope(recoil_energy, model, distribution, isotope)?;
    }
    Ok(rate)
}

/// Mass-fraction-weighted sum over the target's elements.
pub fn differential_rate_nucleus(
    recoil_energy: f64,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    target: &NuclearTarget,
) -> Result<f64, AppError> {
    let mut rate = 0.0;
    for (element, fraction) in target.elements().iter().zip(target.mass_fractions()) {
        rate += fraction * differential_rate_element(recoil_energy, model, distribution, element)?;
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halo::StandardHaloModel;
    use crate::particle::{ElectronTarget, SpinIndependent};
    use crate::units::{CM, GEV, KEV};
    use approx::assert_relative_eq;

    /// Same physics, but refuses eta factorization.
    struct Unfactorized(SpinIndependent);

    impl CrossSectionProvider for Unfactorized {
        fn mass(&self) -> f64 {
            self.0.mass()
        }
        fn interaction_strength(&self) -> f64 {
            self.0.interaction_strength()
        }
        fn differential_cross_section_nucleus(&self, e: f64, iso: &Isotope, v: f64) -> f64 {
            self.0.differential_cross_section_nucleus(e, iso, v)
        }
        fn total_cross_section_nucleus(&self, iso: &Isotope, v: f64) -> f64 {
            self.0.total_cross_section_nucleus(iso, v)
        }
        fn differential_cross_section_electron(&self, q: f64, e: f64, v: f64, t: ElectronTarget<'_>) -> f64 {
            self.0.differential_cross_section_electron(q, e, v, t)
        }
        fn supports_eta_factorization(&self) -> bool {
            false
        }
    }

    fn model() -> SpinIndependent {
        SpinIndependent::nuclear(50.0 * GEV, 1e-45 * CM * CM).unwrap()
    }

    #[test]
    fn eta_and_flux_paths_agree() {
        let shm = StandardHaloModel::default();
        let xe = Element::natural("Xe").unwrap();
        let slow = Unfactorized(model());
        for e in [1.0 * KEV, 10.0 * KEV, 40.0 * KEV] {
            let fast = differential_rate_element(e, &model(), &shm, &xe).unwrap();
            let reference = differential_rate_element(e, &slow, &shm, &xe).unwrap();
            assert_relative_eq!(fast, reference, max_relative = 1e-3);
        }
    }

    #[test]
    fn rate_vanishes_beyond_kinematic_reach() {
        let shm = StandardHaloModel::default();
        let xe = Isotope::new(54, 131, 1.0);
        let light = SpinIndependent::nuclear(5.0 * GEV, 1e-40 * CM * CM).unwrap();
        assert_eq!(differential_rate_isotope(10.0 * KEV, &light, &shm, &xe).unwrap(), 0.0);
        assert!(differential_rate_isotope(0.1 * KEV, &light, &shm, &xe).unwrap() > 0.0);
        assert_eq!(differential_rate_isotope(-1.0, &light, &shm, &xe).unwrap(), 0.0);
    }

    #[test]
    fn two_element_mixture_is_linear_in_mass_fractions() {
        let shm = StandardHaloModel::default();
        let ge = Element::natural("Ge").unwrap();
        let si = Element::natural("Si").unwrap();
        let e = 5.0 * KEV;
        let r_ge = differential_rate_element(e, &model(), &shm, &ge).unwrap();
        let r_si = differential_rate_element(e, &model(), &shm, &si).unwrap();

        let even = NuclearTarget::new(vec![ge.clone(), si.clone()], &[0.5, 0.5]).unwrap();
        let skewed = NuclearTarget::new(vec![ge, si], &[0.25, 0.75]).unwrap();
        let r_even = differential_rate_nucleus(e, &model(), &shm, &even).unwrap();
        let r_skewed = differential_rate_nucleus(e, &model(), &shm, &skewed).unwrap();
        assert_relative_eq!(r_even, 0.5 * r_ge + 0.5 * r_si, max_relative = 1e-12);
        assert_relative_eq!(r_skewed, 0.25 * r_ge + 0.75 * r_si, max_relative = 1e-12);
        assert_relative_eq!(r_skewed - r_even, 0.25 * (r_si - r_ge), max_relative = 1e-9);
    }

    #[test]
    fn rate_is_linear_in_cross_section() {
        let shm = StandardHaloModel::default();
        let xe = Isotope::new(54, 131, 1.0);
        let weak = differential_rate_isotope(5.0 * KEV, &model(), &shm, &xe).unwrap();
        let strong_model = SpinIndependent::nuclear(50.0 * GEV, 3e-45 * CM * CM).unwrap();
        let strong = differential_rate_isotope(5.0 * KEV, &strong_model, &shm, &xe).unwrap();
        assert_relative_eq!(strong, 3.0 * weak, max_relative = 1e-12);
    }
}
