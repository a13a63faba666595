//! Shared "limit pipeline" logic.
//!
//! detector JSON -> log-spaced masses -> parallel limit solves -> output units
//!
//! The CLI handlers then focus on presentation (printing, plots, exports).

use tracing::info;

use crate::detector::{DetectorModel, NuclearDetector};
use crate::domain::{LimitRecord, ScanConfig};
use crate::error::AppError;
use crate::io::load_detector;
use crate::math::log_space;
use crate::particle::SpinIndependent;
use crate::stats::limit_curve;
use crate::units::{in_units, CM, GEV};

/// All computed outputs of a single `ddl limit` run.
#[derive(Debug, Clone)]
pub struct LimitRun {
    pub detector: NuclearDetector,
    pub records: Vec<LimitRecord>,
    /// Masses below the detector's reach.
    pub skipped: usize,
}

/// Load the detector and scan the configured mass range.
pub fn run_limit(config: &ScanConfig) -> Result<LimitRun, AppError> {
    let detector = load_detector(&config.detector_path)?;
    run_limit_with_detector(config, detector)
}

/// Scan with an already built detector.
pub fn run_limit_with_detector(config: &ScanConfig, detector: NuclearDetector) -> Result<LimitRun, AppError> {
    if !(config.reference_cross_section_cm2 > 0.0) {
        return Err(AppError::config(format!(
            "Reference cross section must be positive, got {}.",
            config.reference_cross_section_cm2
        )));
    }
    let masses = log_space(
        config.mass_min_gev * GEV,
        config.mass_max_gev * GEV,
        config.mass_steps,
    )?;
    let sigma = config.reference_cross_section_cm2 * CM * CM;
    info!(
        detector = %detector.base().name,
        halo = config.halo_name,
        masses = masses.len(),
        "starting mass scan"
    );

    let curve = limit_curve(
        &detector,
        &config.halo,
        &masses,
        |mass| SpinIndependent::nuclear(mass, sigma),
        config.confidence_level,
    )?;
    let records = curve
        .iter()
        .map(|p| LimitRecord {
            mass_gev: in_units(p.mass, GEV),
            scale: p.scale,
            cross_section_cm2: in_units(p.limit, CM * CM),
        })
        .collect();

    Ok(LimitRun {
        skipped: masses.len() - curve.len(),
        detector,
        records,
    })
}
