//! Ionization detectors with isolated target atoms (liquid noble gases).
//!
//! Signals are counted either as extracted electrons or as photo-electrons of
//! the proportional scintillation (S2) signal.

use super::{Binning, DetectorBase, DetectorModel};
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::math::Interpolation;
use crate::particle::CrossSectionProvider;
use crate::rate::{differential_rate_atom, electron_spectrum, photoelectron_rate};
use crate::target::Atom;

/// What the quantum modes count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargeReadout {
    Electrons,
    /// Photo-electrons per extracted electron: Gaussian with mean `mu`, width `sigma`.
    Photoelectrons { mu: f64, sigma: f64 },
}

#[derive(Debug, Clone)]
pub struct IonizationDetector {
    base: DetectorBase,
    atom: Atom,
    readout: ChargeReadout,
    trigger_efficiency: Option<Interpolation>,
    acceptance_efficiency: Option<Interpolation>,
}

impl IonizationDetector {
    pub fn new(name: impl Into<String>, atom: Atom, exposure: f64) -> Result<Self, AppError> {
        Ok(Self {
            base: DetectorBase::new(name, exposure)?,
            atom,
            readout: ChargeReadout::Electrons,
            trigger_efficiency: None,
            acceptance_efficiency: None,
        })
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    pub fn readout(&self) -> ChargeReadout {
        self.readout
    }

    /// Largest electron number any shell's form factor table can produce.
    pub fn max_electrons(&self) -> u32 {
        self.atom
            .shells
            .iter()
            .map(|shell| {
                let e_max = shell.form_factor.energy_nodes().last().copied().unwrap_or(0.0);
                (e_max / self.atom.quantum_energy).floor() as u32 + shell.extra_quanta + 1
            })
            .max()
            .unwrap_or(1)
    }

    /// Count events with at least `threshold` electrons, up to `maximum`
    /// (default: [`Self::max_electrons`]).
    pub fn use_electron_threshold(&mut self, threshold: u32, maximum: Option<u32>) -> Result<(), AppError> {
        let maximum = maximum.unwrap_or_else(|| self.max_electrons());
        if threshold == 0 {
            return Err(AppError::config("Electron threshold must be at least one electron."));
        }
        self.base.use_quantum_threshold(threshold, maximum)?;
        self.readout = ChargeReadout::Electrons;
        Ok(())
    }

    /// One bin per electron number: `threshold, threshold + 1, …`.
    pub fn use_electron_bins(&mut self, threshold: u32, bins: u32) -> Result<(), AppError> {
        if threshold == 0 || bins == 0 {
            return Err(AppError::config("Electron bins need a threshold and at least one bin."));
        }
        self.base.use_quantum_bins((threshold..=threshold + bins).collect())?;
        self.readout = ChargeReadout::Electrons;
        Ok(())
    }

    pub fn use_pe_threshold(&mut self, mu: f64, sigma: f64, threshold: u32, maximum: u32) -> Result<(), AppError> {
        check_gain(mu, sigma)?;
        self.base.use_quantum_threshold(threshold, maximum)?;
        self.readout = ChargeReadout::Photoelectrons { mu, sigma };
        Ok(())
    }

    /// PE bins `[edges[i], edges[i + 1])`.
    pub fn use_pe_bins(&mut self, mu: f64, sigma: f64, edges: Vec<u32>) -> Result<(), AppError> {
        check_gain(mu, sigma)?;
        self.base.use_quantum_bins(edges)?;
        self.readout = ChargeReadout::Photoelectrons { mu, sigma };
        Ok(())
    }

    /// Trigger efficiency as a function of the PE number.
    pub fn set_trigger_efficiency(&mut self, curve: Interpolation) {
        self.trigger_efficiency = Some(curve);
    }

    /// Acceptance efficiency as a function of the PE number.
    pub fn set_acceptance_efficiency(&mut self, curve: Interpolation) {
        self.acceptance_efficiency = Some(curve);
    }

    fn pe_efficiency(&self, photoelectrons: u32) -> f64 {
        let n = photoelectrons as f64;
        let trigger = self.trigger_efficiency.as_ref().map_or(1.0, |c| c.eval(n));
        let acceptance = self.acceptance_efficiency.as_ref().map_or(1.0, |c| c.eval(n));
        trigger * acceptance
    }

    /// Rate per unit exposure at quantum number `n` given the electron spectrum.
    fn quantum_rate(&self, n: u32, electron_rates: &[f64]) -> f64 {
        match self.readout {
            ChargeReadout::Electrons => {
                if n == 0 {
                    0.0
                } else {
                    electron_rates.get(n as usize - 1).copied().unwrap_or(0.0)
                }
            }
            ChargeReadout::Photoelectrons { mu, sigma } => {
                self.pe_efficiency(n) * photoelectron_rate(n, electron_rates, mu, sigma)
            }
        }
    }

    /// Minimal energy transfer above threshold: the lowest binding energy plus
    /// the recoil-electron threshold in energy modes.
    fn threshold_energy(&self) -> f64 {
        self.atom.lowest_binding_energy() + self.base.energy_threshold()
    }
}

fn check_gain(mu: f64, sigma: f64) -> Result<(), AppError> {
    if !(mu > 0.0 && sigma > 0.0) {
        return Err(AppError::config(format!(
            "Photo-electron gain needs positive mean and width, got {mu} and {sigma}."
        )));
    }
    Ok(())
}

impl DetectorModel for IonizationDetector {
    fn base(&self) -> &DetectorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DetectorBase {
        &mut self.base
    }

    fn minimum_dm_speed(&self, model: &dyn CrossSectionProvider) -> f64 {
        (2.0 * self.threshold_energy() / model.mass()).sqrt()
    }

    fn minimum_dm_mass(&self, _model: &dyn CrossSectionProvider, distribution: &dyn VelocityDistribution) -> f64 {
        let v_max = distribution.maximum_speed();
        2.0 * self.threshold_energy() / (v_max * v_max)
    }

    fn maximum_energy_deposit(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> f64 {
        let v_max = distribution.maximum_speed();
        (0.5 * model.mass() * v_max * v_max - self.atom.lowest_binding_energy()).max(0.0)
    }

    fn differential_rate(
        &self,
        energy: f64,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<f64, AppError> {
        Ok(self.base.flat_efficiency() * differential_rate_atom(energy, model, distribution, &self.atom)?)
    }

    fn quantum_signals(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<Vec<f64>, AppError> {
        let scale = self.base.exposure() * self.base.flat_efficiency();
        match self.base.binning() {
            Binning::QuantumThreshold { threshold, maximum } => {
                let spectrum = electron_spectrum(self.max_electrons(), model, distribution, &self.atom)?;
                let total: f64 = (*threshold..=*maximum).map(|n| self.quantum_rate(n, &spectrum)).sum();
                Ok(vec![scale * total])
            }
            Binning::QuantumBins { edges } => {
                let spectrum = electron_spectrum(self.max_electrons(), model, distribution, &self.atom)?;
                Ok(edges
                    .windows(2)
                    .enumerate()
                    .map(|(i, w)| {
                        let bin: f64 = (w[0]..w[1]).map(|n| self.quantum_rate(n, &spectrum)).sum();
                        scale * self.base.bin_efficiency(i) * bin
                    })
                    .collect())
            }
            other => Err(AppError::config(format!(
                "Detector {}: quantum signals requested in {} mode.",
                self.base.name,
                other.label()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Analysis;
    use crate::halo::StandardHaloModel;
    use crate::math::OutOfRange;
    use crate::particle::{Mediator, SpinIndependent};
    use crate::rate::electron_spectrum;
    use crate::target::{AtomicShell, FormFactorTable};
    use crate::units::{ALPHA_EM, CM, EV, GEV, KG, M_ELECTRON, MEV, YEAR};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn toy_atom() -> Atom {
        let dq = 0.5 * ALPHA_EM * M_ELECTRON;
        let table = FormFactorTable::uniform(dq, 1.0 * EV, DMatrix::from_fn(60, 100, |i, j| {
            1.0 / (1.0 + 0.05 * i as f64 + 0.02 * j as f64)
        }))
        .unwrap();
        let shell = AtomicShell::new("outer", 12.0 * EV, 0, table).unwrap();
        Atom::new("Toy", 131.0 * GEV, vec![shell], 13.8 * EV, 0.83).unwrap()
    }

    fn model() -> SpinIndependent {
        SpinIndependent::electronic(100.0 * MEV, 1e-37 * CM * CM, Mediator::Contact).unwrap()
    }

    fn detector() -> IonizationDetector {
        IonizationDetector::new("toy", toy_atom(), 1.0 * KG * YEAR).unwrap()
    }

    #[test]
    fn max_electrons_follows_the_energy_grid() {
        // ⌊100 eV / 13.8 eV⌋ + 1
        assert_eq!(detector().max_electrons(), 8);
    }

    #[test]
    fn electron_bins_partition_the_threshold_signal() {
        let shm = StandardHaloModel::default();
        let mut det = detector();
        det.use_electron_threshold(2, None).unwrap();
        assert_eq!(det.base().analysis().unwrap(), Analysis::Poisson);
        let total = det.total_signal(&model(), &shm).unwrap();

        det.use_electron_bins(2, 7).unwrap();
        assert_eq!(det.base().analysis().unwrap(), Analysis::BinnedPoisson);
        let bins = det.binned_signal(&model(), &shm).unwrap();
        assert_eq!(bins.len(), 7);
        assert!(total > 0.0);
        assert_relative_eq!(bins.iter().sum::<f64>(), total, max_relative = 1e-12);

        let spectrum = electron_spectrum(8, &model(), &shm, det.atom()).unwrap();
        assert_relative_eq!(bins[0], det.base().exposure() * spectrum[1], max_relative = 1e-12);
    }

    #[test]
    fn photoelectron_threshold_recovers_the_electron_count() {
        let shm = StandardHaloModel::default();
        let mut det = detector();
        det.use_electron_threshold(1, None).unwrap();
        let electrons = det.total_signal(&model(), &shm).unwrap();

        det.use_pe_threshold(30.0, 5.0, 0, 600).unwrap();
        let photoelectrons = det.total_signal(&model(), &shm).unwrap();
        assert_relative_eq!(photoelectrons, electrons, max_relative = 1e-3);

        let half = Interpolation::new(vec![0.0, 1000.0], vec![0.5, 0.5], OutOfRange::Clamp).unwrap();
        det.set_trigger_efficiency(half.clone());
        det.set_acceptance_efficiency(half);
        let triggered = det.total_signal(&model(), &shm).unwrap();
        assert_relative_eq!(triggered, 0.25 * photoelectrons, max_relative = 1e-12);
    }

    #[test]
    fn photoelectron_bins_respect_bin_efficiencies() {
        let shm = StandardHaloModel::default();
        let mut det = detector();
        det.use_pe_bins(30.0, 5.0, vec![10, 45, 75, 600]).unwrap();
        let plain = det.binned_signal(&model(), &shm).unwrap();
        det.base_mut().set_bin_efficiencies(vec![1.0, 0.5, 0.0]).unwrap();
        let cut = det.binned_signal(&model(), &shm).unwrap();
        assert_eq!(cut[0], plain[0]);
        assert_relative_eq!(cut[1], 0.5 * plain[1], max_relative = 1e-12);
        assert_eq!(cut[2], 0.0);
        assert!(det.use_pe_bins(0.0, 5.0, vec![1, 2]).is_err());
    }

    #[test]
    fn kinematic_reach_is_set_by_the_binding_energy() {
        let shm = StandardHaloModel::default();
        let det = detector();
        let m_min = det.minimum_dm_mass(&model(), &shm);
        let v_max = shm.maximum_speed();
        assert_relative_eq!(0.5 * m_min * v_max * v_max, 12.0 * EV, max_relative = 1e-12);
        let edge = model().with_mass(m_min);
        assert_relative_eq!(det.minimum_dm_speed(&edge), v_max, max_relative = 1e-12);
        assert!(det.maximum_energy_deposit(&edge, &shm) < 1e-9 * EV);
    }
}
