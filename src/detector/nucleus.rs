//! Nuclear-recoil detectors.

use tracing::debug;

use super::{DetectorBase, DetectorModel};
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::math::Interpolation;
use crate::particle::CrossSectionProvider;
use crate::rate::{differential_rate_element, differential_rate_nucleus, smeared_rate, REFERENCE_SPEED};
use crate::target::{maximum_nuclear_recoil_energy, v_min_nucleus, NuclearTarget};

/// Energy-dependent efficiency, evaluated at the observed energy.
#[derive(Debug, Clone, Default)]
pub enum RecoilEfficiency {
    #[default]
    None,
    /// One curve for every element.
    Shared(Interpolation),
    /// One curve per target element, in target order.
    PerElement(Vec<Interpolation>),
}

#[derive(Debug, Clone)]
pub struct NuclearDetector {
    base: DetectorBase,
    target: NuclearTarget,
    resolution: f64,
    efficiency: RecoilEfficiency,
}

impl NuclearDetector {
    pub fn new(name: impl Into<String>, target: NuclearTarget, exposure: f64) -> Result<Self, AppError> {
        Ok(Self {
            base: DetectorBase::new(name, exposure)?,
            target,
            resolution: 0.0,
            efficiency: RecoilEfficiency::None,
        })
    }

    pub fn target(&self) -> &NuclearTarget {
        &self.target
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Gaussian energy resolution σ; `0` disables smearing.
    pub fn set_resolution(&mut self, sigma: f64) -> Result<(), AppError> {
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(AppError::config(format!("Energy resolution must be non-negative, got {sigma:e}.")));
        }
        self.resolution = sigma;
        Ok(())
    }

    pub fn set_efficiency(&mut self, curve: Interpolation) {
        self.efficiency = RecoilEfficiency::Shared(curve);
    }

    pub fn set_element_efficiencies(&mut self, curves: Vec<Interpolation>) -> Result<(), AppError> {
        let elements = self.target.elements().len();
        if curves.len() != elements {
            return Err(AppError::config(format!(
                "Got {} efficiency curves for {elements} target elements.",
                curves.len()
            )));
        }
        self.efficiency = RecoilEfficiency::PerElement(curves);
        Ok(())
    }

    /// Smallest true recoil energy that can still be observed above threshold.
    fn lowest_relevant_energy(&self) -> f64 {
        (self.base.energy_threshold() - 2.0 * self.resolution).max(0.0)
    }

    /// Nuclear masses of isotopes the model couples to.
    fn coupled_masses<'a>(&'a self, model: &'a dyn CrossSectionProvider) -> impl Iterator<Item = f64> + 'a {
        self.target
            .isotopes()
            .filter(move |(_, iso)| model.total_cross_section_nucleus(iso, REFERENCE_SPEED) > 0.0)
            .map(|(_, iso)| iso.mass)
    }
}

impl DetectorModel for NuclearDetector {
    fn base(&self) -> &DetectorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DetectorBase {
        &mut self.base
    }

    fn minimum_dm_speed(&self, model: &dyn CrossSectionProvider) -> f64 {
        let energy = self.lowest_relevant_energy();
        self.coupled_masses(model)
            .map(|m_n| v_min_nucleus(energy, model.mass(), m_n))
            .fold(f64::INFINITY, f64::min)
    }

    fn minimum_dm_mass(&self, model: &dyn CrossSectionProvider, distribution: &dyn VelocityDistribution) -> f64 {
        let energy = self.lowest_relevant_energy();
        if energy <= 0.0 {
            return 0.0;
        }
        let v_max = distribution.maximum_speed();
        self.coupled_masses(model)
            .map(|m_n| {
                let denominator = (2.0 * m_n / energy).sqrt() * v_max - 1.0;
                if denominator > 0.0 { m_n / denominator } else { f64::INFINITY }
            })
            .fold(f64::INFINITY, f64::min)
    }

    fn maximum_energy_deposit(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> f64 {
        let v_max = distribution.maximum_speed();
        let reach = self
            .coupled_masses(model)
            .map(|m_n| maximum_nuclear_recoil_energy(v_max, model.mass(), m_n))
            .fold(0.0, f64::max);
        reach + 6.0 * self.resolution
    }

    fn differential_rate(
        &self,
        energy: f64,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<f64, AppError> {
        let threshold = self.base.energy_threshold();
        let flat = self.base.flat_efficiency();
        match &self.efficiency {
            RecoilEfficiency::None => {
                let rate = smeared_rate(energy, self.resolution, threshold, |e| {
                    differential_rate_nucleus(e, model, distribution, &self.target)
                })?;
                Ok(flat * rate)
            }
            RecoilEfficiency::Shared(curve) => {
                let efficiency = curve.eval(energy);
                if efficiency == 0.0 {
                    return Ok(0.0);
                }
                let rate = smeared_rate(energy, self.resolution, threshold, |e| {
                    differential_rate_nucleus(e, model, distribution, &self.target)
                })?;
                Ok(flat * efficiency * rate)
            }
            RecoilEfficiency::PerElement(curves) => {
                let mut total = 0.0;
                for ((element, fraction), curve) in self
                    .target
                    .elements()
                    .iter()
                    .zip(self.target.mass_fractions())
                    .zip(curves)
                {
                    let efficiency = curve.eval(energy);
                    if efficiency == 0.0 {
                        continue;
                    }
                    let rate = smeared_rate(energy, self.resolution, threshold, |e| {
                        differential_rate_element(e, model, distribution, element)
                    })?;
                    total += efficiency * fraction * rate;
                }
                debug!(energy, total, "per-element efficiency rate");
                Ok(flat * total)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Binning;
    use crate::halo::StandardHaloModel;
    use crate::math::OutOfRange;
    use crate::particle::SpinIndependent;
    use crate::rate::integrated_rate;
    use crate::rate::TargetMaterial;
    use crate::target::Element;
    use crate::units::{CM, DAY, GEV, KEV, KG};
    use approx::assert_relative_eq;

    fn xenon(exposure: f64) -> NuclearDetector {
        let target = NuclearTarget::single(Element::natural("Xe").unwrap());
        NuclearDetector::new("xenon", target, exposure).unwrap()
    }

    fn model() -> SpinIndependent {
        SpinIndependent::nuclear(50.0 * GEV, 1e-45 * CM * CM).unwrap()
    }

    #[test]
    fn threshold_signal_is_exposure_times_integrated_rate() {
        let shm = StandardHaloModel::default();
        let exposure = 1000.0 * KG * DAY;
        let mut det = xenon(exposure);
        det.base_mut().use_energy_threshold(5.0 * KEV, 40.0 * KEV).unwrap();
        let signal = det.total_signal(&model(), &shm).unwrap();
        let rate = integrated_rate(
            5.0 * KEV,
            40.0 * KEV,
            &model(),
            &shm,
            TargetMaterial::Nuclear(det.target()),
        )
        .unwrap();
        assert!(signal > 0.0);
        assert_relative_eq!(signal, exposure * rate, max_relative = 1e-9);
    }

    #[test]
    fn bins_partition_the_threshold_signal() {
        let shm = StandardHaloModel::default();
        let mut det = xenon(1000.0 * KG * DAY);
        det.base_mut().use_energy_threshold(5.0 * KEV, 40.0 * KEV).unwrap();
        let total = det.total_signal(&model(), &shm).unwrap();

        det.base_mut().use_energy_bins(vec![5.0 * KEV, 10.0 * KEV, 20.0 * KEV, 40.0 * KEV]).unwrap();
        let bins = det.binned_signal(&model(), &shm).unwrap();
        assert_eq!(bins.len(), 3);
        assert!(bins[0] > bins[2]);
        assert_relative_eq!(bins.iter().sum::<f64>(), total, max_relative = 1e-4);
        assert_relative_eq!(det.total_signal(&model(), &shm).unwrap(), bins.iter().sum::<f64>(), max_relative = 1e-12);
    }

    #[test]
    fn binned_signal_outside_binned_modes_is_a_configuration_error() {
        let shm = StandardHaloModel::default();
        let mut det = xenon(1.0 * KG * DAY);
        assert_eq!(det.total_signal(&model(), &shm).unwrap_err().exit_code(), 2);
        det.base_mut().use_energy_threshold(5.0 * KEV, 40.0 * KEV).unwrap();
        assert_eq!(det.binned_signal(&model(), &shm).unwrap_err().exit_code(), 2);
        assert_eq!(det.quantum_signals(&model(), &shm).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn efficiencies_scale_the_signal() {
        let shm = StandardHaloModel::default();
        let mut det = xenon(1000.0 * KG * DAY);
        det.base_mut().use_energy_bins(vec![5.0 * KEV, 10.0 * KEV, 20.0 * KEV]).unwrap();
        let plain = det.binned_signal(&model(), &shm).unwrap();

        det.base_mut().set_flat_efficiency(0.5).unwrap();
        det.base_mut().set_bin_efficiencies(vec![1.0, 0.2]).unwrap();
        let half = Interpolation::new(vec![0.0, 100.0 * KEV], vec![0.8, 0.8], OutOfRange::Zero).unwrap();
        det.set_efficiency(half.clone());
        let scaled = det.binned_signal(&model(), &shm).unwrap();
        assert_relative_eq!(scaled[0], 0.4 * plain[0], max_relative = 1e-6);
        assert_relative_eq!(scaled[1], 0.08 * plain[1], max_relative = 1e-6);

        det.set_element_efficiencies(vec![half]).unwrap();
        let per_element = det.binned_signal(&model(), &shm).unwrap();
        assert_relative_eq!(per_element[0], scaled[0], max_relative = 1e-6);
        assert!(det.set_element_efficiencies(Vec::new()).is_err());
    }

    #[test]
    fn resolution_moves_events_across_threshold() {
        let shm = StandardHaloModel::default();
        let mut det = xenon(1000.0 * KG * DAY);
        det.base_mut().use_energy_threshold(5.0 * KEV, 40.0 * KEV).unwrap();
        let sharp = det.total_signal(&model(), &shm).unwrap();
        det.set_resolution(1.0 * KEV).unwrap();
        let smeared = det.total_signal(&model(), &shm).unwrap();
        // A falling spectrum gains more events from below threshold than it loses.
        assert!(smeared > sharp);
        assert!(smeared < 1.5 * sharp);
    }

    #[test]
    fn minimum_mass_sits_at_the_kinematic_edge() {
        let shm = StandardHaloModel::default();
        let mut det = xenon(1.0 * KG * DAY);
        det.base_mut().use_energy_threshold(3.0 * KEV, 40.0 * KEV).unwrap();
        let m_min = det.minimum_dm_mass(&model(), &shm);
        let edge = model().with_mass(m_min);
        assert_relative_eq!(det.maximum_energy_deposit(&edge, &shm), 3.0 * KEV, max_relative = 1e-9);

        let heavy = model().with_mass(1.1 * m_min);
        assert!(det.minimum_dm_speed(&heavy) < shm.maximum_speed());
        let light = model().with_mass(0.9 * m_min);
        assert!(det.minimum_dm_speed(&light) > shm.maximum_speed());
    }

    #[test]
    fn uncoupled_targets_are_out_of_reach() {
        let shm = StandardHaloModel::default();
        let mut det = xenon(1.0 * KG * DAY);
        det.base_mut().use_energy_threshold(3.0 * KEV, 40.0 * KEV).unwrap();
        let blind = SpinIndependent::nuclear(50.0 * GEV, 0.0).unwrap();
        assert_eq!(det.minimum_dm_speed(&blind), f64::INFINITY);
        assert_eq!(det.minimum_dm_mass(&blind, &shm), f64::INFINITY);
        assert!(matches!(det.base().binning(), Binning::EnergyThreshold { .. }));
    }
}
