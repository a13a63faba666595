use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::halo::HaloConfig;

/// Halo model selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaloChoice {
    /// Standard Halo Model.
    Shm,
    /// SHM plus the anisotropic "sausage" component.
    #[value(name = "shm++")]
    ShmPlusPlus,
}

impl HaloChoice {
    pub fn default_config(self) -> HaloConfig {
        match self {
            HaloChoice::Shm => HaloConfig::default(),
            HaloChoice::ShmPlusPlus => HaloConfig::shm_plus_plus(),
        }
    }
}

/// Binning of a nuclear-recoil detector document; energies in keV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BinningSpec {
    Threshold {
        threshold_kev: f64,
        maximum_kev: f64,
    },
    Bins {
        edges_kev: Vec<f64>,
    },
    /// `bins` equal-width bins between threshold and maximum.
    UniformBins {
        threshold_kev: f64,
        maximum_kev: f64,
        bins: usize,
    },
    MaximumGap {
        threshold_kev: f64,
        maximum_kev: f64,
        #[serde(default)]
        events_kev: Vec<f64>,
    },
}

/// JSON description of a nuclear-recoil experiment.
///
/// Efficiency files are two-column tables (recoil energy in keV, efficiency),
/// resolved relative to the document's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSpec {
    pub name: String,
    /// Element symbols, e.g. `["Ca", "W", "O"]`.
    pub elements: Vec<String>,
    /// Mass fractions or stoichiometric ratios; empty means one of each.
    #[serde(default)]
    pub proportions: Vec<f64>,
    pub exposure_kg_days: f64,
    #[serde(default = "unit_efficiency")]
    pub flat_efficiency: f64,
    #[serde(default)]
    pub resolution_kev: f64,
    #[serde(default)]
    pub efficiency_file: Option<PathBuf>,
    /// One file per element, in `elements` order.
    #[serde(default)]
    pub element_efficiency_files: Vec<PathBuf>,
    pub binning: BinningSpec,
    #[serde(default)]
    pub observed: Vec<u64>,
    #[serde(default)]
    pub background: Vec<f64>,
    #[serde(default)]
    pub bin_efficiencies: Vec<f64>,
}

fn unit_efficiency() -> f64 {
    1.0
}

/// Resolved settings of a `ddl limit` run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub detector_path: PathBuf,
    pub halo: HaloConfig,
    pub halo_name: &'static str,
    pub mass_min_gev: f64,
    pub mass_max_gev: f64,
    pub mass_steps: usize,
    /// Reference cross section the exclusion scale multiplies (cm²).
    pub reference_cross_section_cm2: f64,
    pub confidence_level: f64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

/// One exclusion-curve point in output units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitRecord {
    pub mass_gev: f64,
    pub scale: f64,
    pub cross_section_cm2: f64,
}

/// A saved exclusion curve (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitCurveFile {
    pub tool: String,
    pub computed_at: NaiveDateTime,
    pub detector: String,
    pub halo: HaloConfig,
    pub confidence_level: f64,
    pub points: Vec<LimitRecord>,
}
