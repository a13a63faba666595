//! Export exclusion curves to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or plotting scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::LimitRecord;
use crate::error::AppError;

/// Write limit points to a CSV file.
pub fn write_limit_csv(path: &Path, records: &[LimitRecord]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_limit_rows(&mut file, records)
        .map_err(|e| AppError::config(format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_limit_rows<W: Write>(out: &mut W, records: &[LimitRecord]) -> std::io::Result<()> {
    writeln!(out, "mass_gev,scale,cross_section_cm2")?;
    for r in records {
        writeln!(out, "{:.6e},{:.6e},{:.6e}", r.mass_gev, r.scale, r.cross_section_cm2)?;
    }
    Ok(())
}
