//! Detector models: exposure, efficiencies and one active binning mode,
//! producing expected signal counts from a rate model.
//!
//! - [`DetectorBase`] holds the state every detector shares and owns the
//!   binning state machine ([`Binning`]).
//! - [`DetectorModel`] is the capability the statistics layer consumes; the
//!   nuclear, ionization and semiconductor detectors implement it.

pub mod ionization;
pub mod nucleus;
pub mod semiconductor;

pub use ionization::*;
pub use nucleus::*;
pub use semiconductor::*;

use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::math::{Quadrature, DEFAULT_TAIL_CUTOFF};
use crate::particle::CrossSectionProvider;

/// The active binning mode and its payload.
///
/// Bins are half-open, `[edges[i], edges[i + 1])`.
#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    Unconfigured,
    EnergyThreshold { threshold: f64, maximum: f64 },
    EnergyBins { edges: Vec<f64> },
    /// Quantum numbers (electrons, photo-electrons, e-h pairs) in `[threshold, maximum]`.
    QuantumThreshold { threshold: u32, maximum: u32 },
    QuantumBins { edges: Vec<u32> },
    /// Sorted observed energies in `[threshold, maximum]`.
    MaximumGap { events: Vec<f64>, threshold: f64, maximum: f64 },
}

/// Statistical analysis implied by a binning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Poisson,
    BinnedPoisson,
    MaximumGap,
}

impl Binning {
    pub fn label(&self) -> &'static str {
        match self {
            Binning::Unconfigured => "unconfigured",
            Binning::EnergyThreshold { .. } => "energy threshold",
            Binning::EnergyBins { .. } => "energy bins",
            Binning::QuantumThreshold { .. } => "quantum threshold",
            Binning::QuantumBins { .. } => "quantum bins",
            Binning::MaximumGap { .. } => "maximum gap",
        }
    }

    pub fn analysis(&self) -> Option<Analysis> {
        match self {
            Binning::Unconfigured => None,
            Binning::EnergyThreshold { .. } | Binning::QuantumThreshold { .. } => Some(Analysis::Poisson),
            Binning::EnergyBins { .. } | Binning::QuantumBins { .. } => Some(Analysis::BinnedPoisson),
            Binning::MaximumGap { .. } => Some(Analysis::MaximumGap),
        }
    }

    /// Number of observed-count slots the mode carries.
    pub fn bin_count(&self) -> usize {
        match self {
            Binning::Unconfigured => 0,
            Binning::EnergyThreshold { .. } | Binning::QuantumThreshold { .. } | Binning::MaximumGap { .. } => 1,
            Binning::EnergyBins { edges } => edges.len() - 1,
            Binning::QuantumBins { edges } => edges.len() - 1,
        }
    }
}

/// State shared by every detector.
#[derive(Debug, Clone)]
pub struct DetectorBase {
    pub name: String,
    exposure: f64,
    flat_efficiency: f64,
    binning: Binning,
    observed: Vec<u64>,
    background: Vec<f64>,
    bin_efficiencies: Option<Vec<f64>>,
}

impl DetectorBase {
    pub fn new(name: impl Into<String>, exposure: f64) -> Result<Self, AppError> {
        let name = name.into();
        if !(exposure.is_finite() && exposure > 0.0) {
            return Err(AppError::config(format!("Detector {name}: exposure must be positive.")));
        }
        Ok(Self {
            name,
            exposure,
            flat_efficiency: 1.0,
            binning: Binning::Unconfigured,
            observed: Vec::new(),
            background: Vec::new(),
            bin_efficiencies: None,
        })
    }

    pub fn exposure(&self) -> f64 {
        self.exposure
    }

    pub fn flat_efficiency(&self) -> f64 {
        self.flat_efficiency
    }

    pub fn set_flat_efficiency(&mut self, efficiency: f64) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&efficiency) {
            return Err(AppError::config(format!("Flat efficiency must lie in [0, 1], got {efficiency}.")));
        }
        self.flat_efficiency = efficiency;
        Ok(())
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn analysis(&self) -> Result<Analysis, AppError> {
        self.binning
            .analysis()
            .ok_or_else(|| AppError::config(format!("Detector {}: no binning mode configured.", self.name)))
    }

    /// Switch modes; per-bin data of the previous mode is dropped.
    fn switch_to(&mut self, binning: Binning) {
        let n = binning.bin_count();
        self.binning = binning;
        self.observed = vec![0; n];
        self.background = vec![0.0; n];
        self.bin_efficiencies = None;
    }

    pub fn use_energy_threshold(&mut self, threshold: f64, maximum: f64) -> Result<(), AppError> {
        if !(threshold >= 0.0 && maximum > threshold) {
            return Err(AppError::config(format!(
                "Energy window [{threshold:e}, {maximum:e}] is empty."
            )));
        }
        self.switch_to(Binning::EnergyThreshold { threshold, maximum });
        Ok(())
    }

    pub fn use_energy_bins(&mut self, edges: Vec<f64>) -> Result<(), AppError> {
        if edges.len() < 2 {
            return Err(AppError::config("Energy bins need at least two edges."));
        }
        if edges[0] < 0.0 || edges.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(AppError::config("Energy bin edges must be non-negative and increasing."));
        }
        self.switch_to(Binning::EnergyBins { edges });
        Ok(())
    }

    /// `bins` equal-width bins on `[threshold, maximum]`.
    pub fn use_uniform_energy_bins(&mut self, threshold: f64, maximum: f64, bins: usize) -> Result<(), AppError> {
        if bins == 0 || !(maximum > threshold) {
            return Err(AppError::config("Uniform energy bins need a non-empty range and at least one bin."));
        }
        let width = (maximum - threshold) / bins as f64;
        let mut edges: Vec<f64> = (0..=bins).map(|i| threshold + width * i as f64).collect();
        edges[bins] = maximum;
        self.use_energy_bins(edges)
    }

    /// Maximum-gap analysis on the observed `events`; events outside
    /// `[threshold, maximum]` are dropped.
    pub fn use_maximum_gap(&mut self, mut events: Vec<f64>, threshold: f64, maximum: f64) -> Result<(), AppError> {
        if !(threshold >= 0.0 && maximum > threshold) {
            return Err(AppError::config(format!(
                "Maximum-gap window [{threshold:e}, {maximum:e}] is empty."
            )));
        }
        if events.iter().any(|e| !e.is_finite()) {
            return Err(AppError::config("Observed event energies must be finite."));
        }
        events.retain(|e| (threshold..=maximum).contains(e));
        events.sort_by(f64::total_cmp);
        let count = events.len() as u64;
        self.switch_to(Binning::MaximumGap {
            events,
            threshold,
            maximum,
        });
        self.observed = vec![count];
        Ok(())
    }

    pub(crate) fn use_quantum_threshold(&mut self, threshold: u32, maximum: u32) -> Result<(), AppError> {
        if maximum < threshold {
            return Err(AppError::config(format!(
                "Quantum window [{threshold}, {maximum}] is empty."
            )));
        }
        self.switch_to(Binning::QuantumThreshold { threshold, maximum });
        Ok(())
    }

    pub(crate) fn use_quantum_bins(&mut self, edges: Vec<u32>) -> Result<(), AppError> {
        if edges.len() < 2 || edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::config("Quantum bin edges must be increasing, with at least two edges."));
        }
        self.switch_to(Binning::QuantumBins { edges });
        Ok(())
    }

    pub fn observed(&self) -> &[u64] {
        &self.observed
    }

    pub fn set_observed_events(&mut self, observed: Vec<u64>) -> Result<(), AppError> {
        self.check_len("observed counts", observed.len())?;
        if matches!(self.binning, Binning::MaximumGap { .. }) {
            return Err(AppError::config(
                "Maximum-gap detectors take their observed events from the event list.",
            ));
        }
        self.observed = observed;
        Ok(())
    }

    pub fn background(&self) -> &[f64] {
        &self.background
    }

    pub fn set_background(&mut self, background: Vec<f64>) -> Result<(), AppError> {
        self.check_len("background expectations", background.len())?;
        if background.iter().any(|b| !(b.is_finite() && *b >= 0.0)) {
            return Err(AppError::config("Background expectations must be finite and non-negative."));
        }
        self.background = background;
        Ok(())
    }

    pub fn set_bin_efficiencies(&mut self, efficiencies: Vec<f64>) -> Result<(), AppError> {
        if !matches!(self.binning, Binning::EnergyBins { .. } | Binning::QuantumBins { .. }) {
            return Err(AppError::config(format!(
                "Detector {}: bin efficiencies need a binned mode, not {}.",
                self.name,
                self.binning.label()
            )));
        }
        self.check_len("bin efficiencies", efficiencies.len())?;
        if efficiencies.iter().any(|e| !(0.0..=1.0).contains(e)) {
            return Err(AppError::config("Bin efficiencies must lie in [0, 1]."));
        }
        self.bin_efficiencies = Some(efficiencies);
        Ok(())
    }

    /// Efficiency of bin `i` relative to the flat efficiency (1 if none set).
    pub fn bin_efficiency(&self, i: usize) -> f64 {
        self.bin_efficiencies
            .as_ref()
            .and_then(|e| e.get(i).copied())
            .unwrap_or(1.0)
    }

    /// Lower edge of the energy window in energy modes, else 0.
    pub fn energy_threshold(&self) -> f64 {
        match &self.binning {
            Binning::EnergyThreshold { threshold, .. } | Binning::MaximumGap { threshold, .. } => *threshold,
            Binning::EnergyBins { edges } => edges[0],
            _ => 0.0,
        }
    }

    fn check_len(&self, what: &str, len: usize) -> Result<(), AppError> {
        let expected = self.binning.bin_count();
        if expected == 0 {
            return Err(AppError::config(format!(
                "Detector {}: configure a binning mode before setting {what}.",
                self.name
            )));
        }
        if len != expected {
            return Err(AppError::config(format!(
                "Detector {}: got {len} {what} for {expected} bins ({}).",
                self.name,
                self.binning.label()
            )));
        }
        Ok(())
    }
}

/// Expected signal counts of a detector for one dark-matter model.
pub trait DetectorModel {
    fn base(&self) -> &DetectorBase;

    fn base_mut(&mut self) -> &mut DetectorBase;

    /// Smallest speed able to produce a signal above threshold.
    fn minimum_dm_speed(&self, model: &dyn CrossSectionProvider) -> f64;

    /// Lightest dark-matter mass able to produce a signal above threshold.
    fn minimum_dm_mass(&self, model: &dyn CrossSectionProvider, distribution: &dyn VelocityDistribution) -> f64;

    /// Largest deposit reachable at the distribution's cutoff speed.
    fn maximum_energy_deposit(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> f64;

    /// Observed spectrum per unit exposure at energy `energy`, including
    /// efficiencies and resolution.
    fn differential_rate(
        &self,
        energy: f64,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<f64, AppError>;

    /// Signals of the quantum modes: one entry in threshold mode, one per bin
    /// in bin mode.
    fn quantum_signals(
        &self,
        _model: &dyn CrossSectionProvider,
        _distribution: &dyn VelocityDistribution,
    ) -> Result<Vec<f64>, AppError> {
        Err(AppError::config(format!(
            "Detector {} does not support quantum binning.",
            self.base().name
        )))
    }

    /// `exposure · ∫ dR/dE` over `[e_min, e_max]`.
    fn energy_window_signal(
        &self,
        e_min: f64,
        e_max: f64,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<f64, AppError> {
        if e_max <= e_min {
            return Ok(0.0);
        }
        let integral = Quadrature::default().try_integrate_truncated(
            |e| self.differential_rate(e, model, distribution),
            e_min,
            e_max,
            DEFAULT_TAIL_CUTOFF,
        )?;
        Ok(self.base().exposure() * integral)
    }

    /// Total expected signal of the active mode. In maximum-gap mode this is
    /// the expectation over the whole window.
    fn total_signal(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<f64, AppError> {
        match self.base().binning() {
            Binning::EnergyThreshold { threshold, maximum } | Binning::MaximumGap { threshold, maximum, .. } => {
                self.energy_window_signal(*threshold, *maximum, model, distribution)
            }
            Binning::QuantumThreshold { .. } => Ok(self.quantum_signals(model, distribution)?.iter().sum()),
            Binning::EnergyBins { .. } | Binning::QuantumBins { .. } => {
                Ok(self.binned_signal(model, distribution)?.iter().sum())
            }
            Binning::Unconfigured => Err(AppError::config(format!(
                "Detector {}: no binning mode configured.",
                self.base().name
            ))),
        }
    }

    /// Per-bin expected signals; a configuration error outside the binned modes.
    fn binned_signal(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<Vec<f64>, AppError> {
        let base = self.base();
        match base.binning() {
            Binning::EnergyBins { edges } => edges
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    Ok(base.bin_efficiency(i) * self.energy_window_signal(w[0], w[1], model, distribution)?)
                })
                .collect(),
            Binning::QuantumBins { .. } => self.quantum_signals(model, distribution),
            other => Err(AppError::config(format!(
                "Detector {}: binned signal requested in {} mode.",
                base.name,
                other.label()
            ))),
        }
    }

    /// Expected signal in each gap between consecutive observed events,
    /// including the gaps next to the window edges.
    fn gap_signals(
        &self,
        model: &dyn CrossSectionProvider,
        distribution: &dyn VelocityDistribution,
    ) -> Result<Vec<f64>, AppError> {
        let base = self.base();
        let Binning::MaximumGap {
            events,
            threshold,
            maximum,
        } = base.binning()
        else {
            return Err(AppError::config(format!(
                "Detector {}: gap signals requested in {} mode.",
                base.name,
                base.binning().label()
            )));
        };
        let mut edges = Vec::with_capacity(events.len() + 2);
        edges.push(*threshold);
        edges.extend_from_slice(events);
        edges.push(*maximum);
        edges
            .windows(2)
            .map(|w| self.energy_window_signal(w[0], w[1], model, distribution))
            .collect()
    }
}
