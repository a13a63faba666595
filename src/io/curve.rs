//! Read/write exclusion-curve JSON files.
//!
//! The file records the curve points in output units (GeV, cm²) together with
//! the run metadata needed to reproduce it: detector name, halo parameters,
//! confidence level and the time of the computation. The schema is
//! `domain::LimitCurveFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::LimitCurveFile;
use crate::error::AppError;

/// Write an exclusion-curve JSON file.
pub fn write_limit_json(path: &Path, curve: &LimitCurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::config(format!("Failed to write curve JSON: {e}")))?;
    Ok(())
}

/// Read an exclusion-curve JSON file.
pub fn read_limit_json(path: &Path) -> Result<LimitCurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::config(format!("Invalid curve JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LimitRecord;
    use crate::halo::HaloConfig;
    use chrono::NaiveDate;

    #[test]
    fn curve_file_survives_a_write_read_cycle() {
        let computed_at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let curve = LimitCurveFile {
            tool: "ddl".to_string(),
            computed_at,
            detector: "toy".to_string(),
            halo: HaloConfig::shm_plus_plus(),
            confidence_level: 0.9,
            points: vec![LimitRecord {
                mass_gev: 10.0,
                scale: 2.5,
                cross_section_cm2: 2.5e-45,
            }],
        };
        let path = std::env::temp_dir().join(format!("ddl-curve-{}.json", std::process::id()));
        write_limit_json(&path, &curve).unwrap();
        let back = read_limit_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.computed_at, computed_at);
        assert_eq!(back.halo, curve.halo);
        assert_eq!(back.points, curve.points);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = read_limit_json(Path::new("no/such/curve.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
