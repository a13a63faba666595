//! Two-column numeric tables (efficiency curves).
//!
//! Format: one `x y` pair per line, separated by whitespace or a comma. Blank
//! lines and lines starting with `#` or `%` are ignored.

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::math::{Interpolation, OutOfRange};

/// Parse table text into `(x, y)` pairs.
pub fn parse_table(text: &str) -> Result<Vec<(f64, f64)>, AppError> {
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
            continue;
        }
        let mut fields = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty());
        let (Some(x), Some(y)) = (fields.next(), fields.next()) else {
            return Err(AppError::config(format!("Line {}: expected two columns, got '{line}'.", i + 1)));
        };
        let parse = |field: &str| {
            field
                .parse::<f64>()
                .map_err(|e| AppError::config(format!("Line {}: invalid number '{field}': {e}", i + 1)))
        };
        rows.push((parse(x)?, parse(y)?));
    }
    if rows.is_empty() {
        return Err(AppError::empty("Table has no data rows."));
    }
    Ok(rows)
}

/// Load an efficiency curve; `x_unit` converts the first column into natural
/// units. Zero outside the tabulated range.
pub fn read_efficiency_table(path: &Path, x_unit: f64) -> Result<Interpolation, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read table '{}': {e}", path.display())))?;
    let rows = parse_table(&text).map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))?;
    if rows.iter().any(|(_, y)| !(0.0..=1.0).contains(y)) {
        return Err(AppError::config(format!(
            "{}: efficiencies must lie in [0, 1].",
            path.display()
        )));
    }
    let (x, y): (Vec<f64>, Vec<f64>) = rows.into_iter().map(|(x, y)| (x * x_unit, y)).unzip();
    Interpolation::new(x, y, OutOfRange::Zero)
}
