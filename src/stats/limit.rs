//! Exclusion limits: dispatch on the detector's analysis, and mass scans.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::{
    binned_p_value, binned_upper_limit_scale, max_gap_p_value, max_gap_upper_limit_scale, poisson_p_value,
    poisson_upper_limit_scale,
};
use crate::detector::{Analysis, DetectorModel};
use crate::error::AppError;
use crate::halo::{HaloConfig, VelocityDistribution};
use crate::particle::CrossSectionProvider;

/// One point of an exclusion curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LimitPoint {
    pub mass: f64,
    /// Factor on the model's nominal signal.
    pub scale: f64,
    /// `scale · interaction_strength`, e.g. an excluded cross section.
    pub limit: f64,
}

/// p-value of the model at its nominal strength under the detector's analysis.
pub fn p_value<D: DetectorModel + ?Sized>(
    detector: &D,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
) -> Result<f64, AppError> {
    let base = detector.base();
    match base.analysis()? {
        Analysis::Poisson => {
            let signal = detector.total_signal(model, distribution)?;
            Ok(poisson_p_value(base.observed()[0], signal, base.background()[0]))
        }
        Analysis::BinnedPoisson => {
            let signal = detector.binned_signal(model, distribution)?;
            binned_p_value(base.observed(), &signal, base.background())
        }
        Analysis::MaximumGap => max_gap_p_value(&detector.gap_signals(model, distribution)?),
    }
}

/// Factor on the model's signal excluded at confidence level `cl`.
pub fn upper_limit_scale<D: DetectorModel + ?Sized>(
    detector: &D,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    cl: f64,
) -> Result<f64, AppError> {
    let base = detector.base();
    let scale = match base.analysis()? {
        Analysis::Poisson => {
            let signal = detector.total_signal(model, distribution)?;
            poisson_upper_limit_scale(base.observed()[0], signal, base.background()[0], cl)?
        }
        Analysis::BinnedPoisson => {
            let signal = detector.binned_signal(model, distribution)?;
            binned_upper_limit_scale(base.observed(), &signal, base.background(), cl)?
        }
        Analysis::MaximumGap => max_gap_upper_limit_scale(&detector.gap_signals(model, distribution)?, cl)?,
    };
    debug!(detector = %base.name, mass = model.mass(), scale, "solved exclusion scale");
    Ok(scale)
}

/// Excluded interaction strength (`scale · interaction_strength`).
pub fn upper_limit<D: DetectorModel + ?Sized>(
    detector: &D,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    cl: f64,
) -> Result<f64, AppError> {
    Ok(upper_limit_scale(detector, model, distribution, cl)? * model.interaction_strength())
}

/// Exclusion curve over `masses`, one rayon task per mass.
///
/// Each worker builds its own distribution from `halo`. Masses below the
/// detector's kinematic reach are skipped.
pub fn limit_curve<D, M, F>(
    detector: &D,
    halo: &HaloConfig,
    masses: &[f64],
    make_model: F,
    cl: f64,
) -> Result<Vec<LimitPoint>, AppError>
where
    D: DetectorModel + Sync + ?Sized,
    M: CrossSectionProvider,
    F: Fn(f64) -> Result<M, AppError> + Sync + Send,
{
    if masses.is_empty() {
        return Err(AppError::empty("No masses to scan."));
    }
    let points = masses
        .par_iter()
        .map_init(
            || halo.build(),
            |distribution, &mass| -> Result<Option<LimitPoint>, AppError> {
                let distribution = distribution.as_ref().map_err(Clone::clone)?;
                let model = make_model(mass)?;
                let reach = detector.minimum_dm_mass(&model, distribution);
                if mass <= reach {
                    info!(mass, reach, detector = %detector.base().name, "mass below detector reach, skipped");
                    return Ok(None);
                }
                let scale = upper_limit_scale(detector, &model, distribution, cl)?;
                Ok(Some(LimitPoint {
                    mass,
                    scale,
                    limit: scale * model.interaction_strength(),
                }))
            },
        )
        .collect::<Result<Vec<_>, AppError>>()?;

    let curve: Vec<LimitPoint> = points.into_iter().flatten().collect();
    info!(
        detector = %detector.base().name,
        scanned = masses.len(),
        points = curve.len(),
        "exclusion curve done"
    );
    Ok(curve)
}
