//! Grid generation for tables and scans.

use crate::error::AppError;

/// `count` nodes from `lo` to `hi` with a constant ratio between neighbours.
fn geometric_nodes(lo: f64, hi: f64, count: usize) -> impl DoubleEndedIterator<Item = f64> {
    let (ln_lo, ln_hi) = (lo.ln(), hi.ln());
    let last = count.saturating_sub(1).max(1) as f64;
    (0..count).map(move |i| (ln_lo + (ln_hi - ln_lo) * i as f64 / last).exp())
}

fn check_steps(steps: usize, kind: &str) -> Result<(), AppError> {
    if steps < 2 {
        return Err(AppError::config(format!("{kind} grids need at least 2 points, got {steps}.")));
    }
    Ok(())
}

/// `steps` points from `min` to `max` (both included), evenly spaced in `ln`.
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    let valid = min.is_finite() && max.is_finite() && 0.0 < min && min < max;
    if !valid {
        return Err(AppError::config(format!(
            "Logarithmic grid needs 0 < min < max, both finite; got [{min}, {max}]."
        )));
    }
    check_steps(steps, "Logarithmic")?;

    let mut nodes: Vec<f64> = geometric_nodes(min, max, steps).collect();
    // Endpoints are compared against by callers.
    nodes[0] = min;
    nodes[steps - 1] = max;
    Ok(nodes)
}

/// `steps` evenly spaced points from `min` to `max` (both included).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::config(format!("Linear grid needs finite min < max; got [{min}, {max}].")));
    }
    check_steps(steps, "Linear")?;
    let h = (max - min) / (steps as f64 - 1.0);
    let mut nodes: Vec<f64> = (0..steps).map(|i| min + h * i as f64).collect();
    nodes[steps - 1] = max;
    Ok(nodes)
}

/// Nodes on `[0, end]` whose distance to `end` is geometrically spaced.
///
/// Node density grows towards `end`, where functions that vanish at a hard
/// cutoff carry most of their curvature. The first node is exactly `0`, the
/// last exactly `end`, and the smallest gap is `min_gap_ratio · end`.
///
/// Callers pass a positive finite `end`, `steps >= 3` and a ratio in `(0, 1)`;
/// out-of-range arguments are clamped into that domain.
pub fn geometric_to_cutoff(end: f64, steps: usize, min_gap_ratio: f64) -> Vec<f64> {
    let end = if end.is_finite() && end > 0.0 { end } else { 1.0 };
    let steps = steps.max(3);
    let ratio = min_gap_ratio.clamp(f64::EPSILON, 0.5);

    // Distances to `end`, largest first.
    let mut nodes: Vec<f64> = geometric_nodes(ratio * end, end, steps - 1).rev().map(|gap| end - gap).collect();
    nodes[0] = 0.0;
    nodes.push(end);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert_eq!(v[0], 0.1);
        assert_eq!(v[v.len() - 1], 10.0);
        assert!((v[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 1.0, 10).is_err());
        assert!(log_space(2.0, 1.0, 10).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
    }

    #[test]
    fn log_space_has_a_constant_ratio() {
        let v = log_space(2.0, 2000.0, 31).unwrap();
        for w in v.windows(2) {
            assert!((w[1] / w[0] - 10f64.powf(0.1)).abs() < 1e-12);
        }
        let lin = lin_space(-1.0, 1.0, 5).unwrap();
        assert_eq!(lin, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert!(lin_space(1.0, 1.0, 5).is_err());
    }

    #[test]
    fn geometric_grid_is_strictly_increasing_and_dense_at_the_cutoff() {
        let g = geometric_to_cutoff(800.0, 100, 1e-3);
        assert_eq!(g.len(), 100);
        assert_eq!(g[0], 0.0);
        assert_eq!(g[g.len() - 1], 800.0);
        for w in g.windows(2) {
            assert!(w[1] > w[0]);
        }
        let first_gap = g[1] - g[0];
        let last_gap = g[g.len() - 1] - g[g.len() - 2];
        assert!(last_gap < first_gap);
        assert!((last_gap - 0.8).abs() < 1e-9);
    }
}
