//! Tabulated functions.
//!
//! - [`Interpolation`]: piecewise-linear 1-D table with an explicit policy for
//!   queries outside the tabulated range.
//! - [`Grid2d`]: bilinear interpolation on a rectangular grid, zero outside.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What a 1-D table returns outside `[x_first, x_last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRange {
    /// Return `0`.
    Zero,
    /// Return the nearest boundary value.
    Clamp,
}

/// Piecewise-linear interpolation of a tabulated function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpolation {
    x: Vec<f64>,
    y: Vec<f64>,
    out_of_range: OutOfRange,
}

impl Interpolation {
    /// Build a table from strictly increasing `x` nodes.
    pub fn new(x: Vec<f64>, y: Vec<f64>, out_of_range: OutOfRange) -> Result<Self, AppError> {
        if x.len() != y.len() {
            return Err(AppError::config(format!(
                "Interpolation table has {} x-values but {} y-values.",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(AppError::empty("Interpolation table needs at least two nodes."));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(AppError::config("Interpolation nodes must be strictly increasing."));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::config("Interpolation table contains non-finite values."));
        }
        Ok(Self { x, y, out_of_range })
    }

    /// Build a table from nodes the caller generated itself (at least two,
    /// strictly increasing, equal lengths).
    pub(crate) fn from_sorted(x: Vec<f64>, y: Vec<f64>, out_of_range: OutOfRange) -> Self {
        debug_assert!(x.len() == y.len() && x.len() >= 2);
        Self { x, y, out_of_range }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn nodes(&self) -> &[f64] {
        &self.x
    }

    pub fn values(&self) -> &[f64] {
        &self.y
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x < self.x[0] || x > self.x[n - 1] {
            return match self.out_of_range {
                OutOfRange::Zero => 0.0,
                OutOfRange::Clamp if x < self.x[0] => self.y[0],
                OutOfRange::Clamp => self.y[n - 1],
            };
        }
        // Index of the first node strictly greater than x.
        let upper = self.x.partition_point(|&xi| xi <= x).clamp(1, n - 1);
        linear_interp((self.x[upper - 1], self.y[upper - 1]), (self.x[upper], self.y[upper]), x)
    }
}

fn linear_interp(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    let (x0, y0) = a;
    let (x1, y1) = b;
    if (x1 - x0).abs() < f64::MIN_POSITIVE {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

/// Bilinear interpolation on a rectangular grid; `values[(i, j)]` is the value
/// at `(x[i], y[j])`.
#[derive(Debug, Clone)]
pub struct Grid2d {
    x: Vec<f64>,
    y: Vec<f64>,
    values: DMatrix<f64>,
}

impl Grid2d {
    pub fn new(x: Vec<f64>, y: Vec<f64>, values: DMatrix<f64>) -> Result<Self, AppError> {
        if x.len() < 2 || y.len() < 2 {
            return Err(AppError::empty("2-D table needs at least two nodes per axis."));
        }
        if values.nrows() != x.len() || values.ncols() != y.len() {
            return Err(AppError::config(format!(
                "2-D table shape {}x{} does not match axes {}x{}.",
                values.nrows(),
                values.ncols(),
                x.len(),
                y.len()
            )));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) || y.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(AppError::config("2-D table axes must be strictly increasing."));
        }
        Ok(Self { x, y, values })
    }

    /// Uniform grid with nodes `x_step · (i + 1)` and `y_step · (j + 1)`.
    pub fn uniform(x_step: f64, y_step: f64, values: DMatrix<f64>) -> Result<Self, AppError> {
        if !(x_step > 0.0 && y_step > 0.0) {
            return Err(AppError::config("Uniform 2-D table steps must be positive."));
        }
        let x = (0..values.nrows()).map(|i| x_step * (i + 1) as f64).collect();
        let y = (0..values.ncols()).map(|j| y_step * (j + 1) as f64).collect();
        Self::new(x, y, values)
    }

    pub fn x_nodes(&self) -> &[f64] {
        &self.x
    }

    pub fn y_nodes(&self) -> &[f64] {
        &self.y
    }

    /// Width associated with each node when the grid is used as a Riemann sum:
    /// the spacing to the previous node (the first node uses its own offset
    /// from the origin).
    pub fn node_widths(nodes: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut prev = 0.0;
        for &n in nodes {
            out.push(n - prev);
            prev = n;
        }
        out
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let nx = self.x.len();
        let ny = self.y.len();
        if x < self.x[0] || x > self.x[nx - 1] || y < self.y[0] || y > self.y[ny - 1] {
            return 0.0;
        }
        let i = self.x.partition_point(|&v| v <= x).clamp(1, nx - 1);
        let j = self.y.partition_point(|&v| v <= y).clamp(1, ny - 1);
        let (x0, x1) = (self.x[i - 1], self.x[i]);
        let (y0, y1) = (self.y[j - 1], self.y[j]);
        let u = (x - x0) / (x1 - x0);
        let t = (y - y0) / (y1 - y0);

        let v00 = self.values[(i - 1, j - 1)];
        let v10 = self.values[(i, j - 1)];
        let v01 = self.values[(i - 1, j)];
        let v11 = self.values[(i, j)];
        (1.0 - u) * (1.0 - t) * v00 + u * (1.0 - t) * v10 + (1.0 - u) * t * v01 + u * t * v11
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_table_interpolates_and_respects_policy() {
        let x = vec![0.0, 1.0, 3.0];
        let y = vec![0.0, 2.0, 4.0];
        let zero = Interpolation::new(x.clone(), y.clone(), OutOfRange::Zero).unwrap();
        let clamp = Interpolation::new(x, y, OutOfRange::Clamp).unwrap();

        assert_eq!(zero.eval(0.5), 1.0);
        assert_eq!(zero.eval(2.0), 3.0);
        assert_eq!(zero.eval(3.0), 4.0);
        assert_eq!(zero.eval(-1.0), 0.0);
        assert_eq!(zero.eval(4.0), 0.0);
        assert_eq!(clamp.eval(-1.0), 0.0);
        assert_eq!(clamp.eval(4.0), 4.0);
    }

    #[test]
    fn rejects_unsorted_nodes() {
        assert!(Interpolation::new(vec![0.0, 0.0], vec![1.0, 2.0], OutOfRange::Zero).is_err());
        assert!(Interpolation::new(vec![0.0], vec![1.0], OutOfRange::Zero).is_err());
    }

    #[test]
    fn bilinear_reproduces_planes() {
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![10.0, 20.0];
        let values = DMatrix::from_fn(3, 2, |i, j| x[i] + 0.5 * y[j]);
        let grid = Grid2d::new(x, y, values).unwrap();
        assert!((grid.eval(1.5, 15.0) - (1.5 + 7.5)).abs() < 1e-12);
        assert_eq!(grid.eval(0.5, 15.0), 0.0);
    }
}
