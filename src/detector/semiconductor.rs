//! Electron-hole pair counting detectors (Si, Ge crystals).

use super::{Binning, DetectorBase, DetectorModel};
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::particle::CrossSectionProvider;
use crate::rate::{differential_rate_crystal, pair_rate, pair_rate_above};
use crate::target::Semiconductor;

#[derive(Debug, Clone)]
pub struct SemiconductorDetector {
    base: DetectorBase,
    crystal: Semiconductor,
}

impl SemiconductorDetector {
    pub fn new(name: impl Into<String>, crystal: Semiconductor, exposure: f64) -> Result<Self, AppError> {
        Ok(Self {
            base: DetectorBase::new(name, exposure)?,
            crystal,
        })
    }

    pub fn crystal(&self) -> &Semiconductor {
        &self.crystal
    }

    /// Count events with at least `threshold` pairs.
    pub fn use_q_threshold(&mut self, threshold: u32) -> Result<(), AppError> {
        self.check_pair_threshold(threshold)?;
        self.base.use_quantum_threshold(threshold, self.crystal.max_pairs)
    }

    /// One bin per pair number starting at `threshold`; `bins = 0` runs up to
    /// the crystal's maximal pair number.
    pub fn use_q_bins(&mut self, threshold: u32, bins: u32) -> Result<(), AppError> {
        self.check_pair_threshold(threshold)?;
        let last = if bins == 0 { self.crystal.max_pairs } else { threshold + bins - 1 };
        self.base.use_quantum_bins((threshold..=last + 1).collect())
    }

    fn check_pair_threshold(&self, threshold: u32) -> Result<(), AppError> {
        if threshold == 0 || threshold > self.crystal.max_pairs {
            return Err(AppError::config(format!(
                "Pair threshold {threshold} outside [1, {}] for {}.",
                self.crystal.max_pairs, self.crystal.name
            )));
        }
        Ok(())
    }

    fn threshold_energy(&self) -> f64 {
        match self.base.binning() {
            Binning::QuantumThreshold { threshold, .. } => self.crystal.minimum_energy(*threshold),
            Binning::QuantumBins { edges } => self.crystal.minimum_energy(edges[0]),
            _ => self.base.energy_threshold().max(self.crystal.energy_gap),
        }
    }
}

impl DetectorModel for SemiconductorDetector {
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
        0.5 * model.mass() * v_max * v_max
    }

    fn differential_rate(
        &self,
        energy: f64,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<f64, AppError> {
        Ok(self.base.flat_efficiency() * differential_rate_crystal(energy, model, distribution, &self.crystal)?)
    }

    fn quantum_signals(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<Vec<f64>, AppError> {
        let scale = self.base.exposure() * self.base.flat_efficiency();
        match self.base.binning() {
            Binning::QuantumThreshold { threshold, .. } => {
                Ok(vec![scale * pair_rate_above(*threshold, model, distribution, &self.crystal)?])
            }
            Binning::QuantumBins { edges } => edges
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    let mut bin = 0.0;
                    for q in w[0]..w[1] {
                        bin += pair_rate(q, model, distribution, &self.crystal)?;
                    }
                    Ok(scale * self.base.bin_efficiency(i) * bin)
                })
                .collect(),
            other => Err(AppError::config(format!(
                "Detector {}: pair signals requested in {} mode.",
                self.base.name,
                other.label()
            ))),
        }
    }
}
