//! JSON documents: nuclear-recoil detectors and halo parameters.

use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::detector::{DetectorModel, NuclearDetector};
use crate::domain::{BinningSpec, DetectorSpec};
use crate::error::AppError;
use crate::halo::HaloConfig;
use crate::io::table::read_efficiency_table;
use crate::target::{Element, NuclearTarget};
use crate::units::{DAY, KEV, KG};

/// Read a detector JSON document.
pub fn read_detector_spec(path: &Path) -> Result<DetectorSpec, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open detector JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid detector JSON '{}': {e}", path.display())))
}

/// Read a halo configuration JSON document (`{"model": "shm", ...}`).
pub fn read_halo_config(path: &Path) -> Result<HaloConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open halo JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid halo JSON '{}': {e}", path.display())))
}

/// Read and build a detector; relative table paths resolve against the
/// document's directory.
pub fn load_detector(path: &Path) -> Result<NuclearDetector, AppError> {
    let spec = read_detector_spec(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    build_detector(&spec, base_dir)
}

pub fn build_detector(spec: &DetectorSpec, base_dir: &Path) -> Result<NuclearDetector, AppError> {
    let elements = spec
        .elements
        .iter()
        .map(|symbol| Element::natural(symbol))
        .collect::<Result<Vec<_>, _>>()?;
    let target = NuclearTarget::new(elements, &spec.proportions)?;
    let mut detector = NuclearDetector::new(spec.name.clone(), target, spec.exposure_kg_days * KG * DAY)?;
    detector.base_mut().set_flat_efficiency(spec.flat_efficiency)?;
    detector.set_resolution(spec.resolution_kev * KEV)?;

    match (&spec.efficiency_file, spec.element_efficiency_files.is_empty()) {
        (Some(_), false) => {
            return Err(AppError::config(format!(
                "Detector {}: give either one efficiency file or one per element, not both.",
                spec.name
            )));
        }
        (Some(file), true) => detector.set_efficiency(read_efficiency_table(&base_dir.join(file), KEV)?),
        (None, false) => {
            let curves = spec
                .element_efficiency_files
                .iter()
                .map(|file| read_efficiency_table(&base_dir.join(file), KEV))
                .collect::<Result<Vec<_>, _>>()?;
            detector.set_element_efficiencies(curves)?;
        }
        (None, true) => {}
    }

    let base = detector.base_mut();
    match &spec.binning {
        BinningSpec::Threshold {
            threshold_kev,
            maximum_kev,
        } => base.use_energy_threshold(threshold_kev * KEV, maximum_kev * KEV)?,
        BinningSpec::Bins { edges_kev } => base.use_energy_bins(edges_kev.iter().map(|e| e * KEV).collect())?,
        BinningSpec::UniformBins {
            threshold_kev,
            maximum_kev,
            bins,
        } => base.use_uniform_energy_bins(threshold_kev * KEV, maximum_kev * KEV, *bins)?,
        BinningSpec::MaximumGap {
            threshold_kev,
            maximum_kev,
            events_kev,
        } => base.use_maximum_gap(
            events_kev.iter().map(|e| e * KEV).collect(),
            threshold_kev * KEV,
            maximum_kev * KEV,
        )?,
    }
    if !spec.observed.is_empty() {
        base.set_observed_events(spec.observed.clone())?;
    }
    if !spec.background.is_empty() {
        base.set_background(spec.background.clone())?;
    }
    if !spec.bin_efficiencies.is_empty() {
        base.set_bin_efficiencies(spec.bin_efficiencies.clone())?;
    }
    debug!(detector = %spec.name, binning = base.binning().label(), "detector built");
    Ok(detector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{Analysis, Binning};

    fn spec(binning: BinningSpec) -> DetectorSpec {
        DetectorSpec {
            name: "cresst-like".to_string(),
            elements: vec!["Ca".to_string(), "W".to_string(), "O".to_string()],
            proportions: vec![1.0, 1.0, 4.0],
            exposure_kg_days: 5.0,
            flat_efficiency: 0.9,
            resolution_kev: 0.0,
            efficiency_file: None,
            element_efficiency_files: Vec::new(),
            binning,
            observed: Vec::new(),
            background: Vec::new(),
            bin_efficiencies: Vec::new(),
        }
    }

    #[test]
    fn builds_a_binned_detector_with_per_bin_data() {
        let mut s = spec(BinningSpec::UniformBins {
            threshold_kev: 0.1,
            maximum_kev: 2.1,
            bins: 4,
        });
        s.observed = vec![3, 1, 0, 0];
        s.background = vec![1.0, 0.5, 0.2, 0.1];
        let det = build_detector(&s, Path::new(".")).unwrap();
        assert_eq!(det.base().analysis().unwrap(), Analysis::BinnedPoisson);
        assert_eq!(det.base().observed(), &[3, 1, 0, 0]);
        assert_eq!(det.target().elements().len(), 3);
        assert!((det.target().mass_fractions().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn maximum_gap_events_are_converted_to_natural_units() {
        let det = build_detector(
            &spec(BinningSpec::MaximumGap {
                threshold_kev: 1.0,
                maximum_kev: 10.0,
                events_kev: vec![4.0, 2.0],
            }),
            Path::new("."),
        )
        .unwrap();
        let Binning::MaximumGap { events, .. } = det.base().binning() else {
            panic!("expected maximum-gap binning");
        };
        assert_eq!(events, &vec![2.0 * KEV, 4.0 * KEV]);
    }

    #[test]
    fn inconsistent_documents_are_configuration_errors() {
        let mut s = spec(BinningSpec::Threshold {
            threshold_kev: 1.0,
            maximum_kev: 10.0,
        });
        s.observed = vec![1, 2];
        assert_eq!(build_detector(&s, Path::new(".")).unwrap_err().exit_code(), 2);

        let mut unknown = spec(BinningSpec::Bins { edges_kev: vec![1.0, 2.0] });
        unknown.elements = vec!["Unobtainium".to_string()];
        assert_eq!(build_detector(&unknown, Path::new(".")).unwrap_err().exit_code(), 2);

        let missing = Path::new("definitely/not/here.json");
        assert_eq!(load_detector(missing).unwrap_err().exit_code(), 2);
    }
}
