//! Tabulated electronic form factors on a uniform momentum × energy grid.

use nalgebra::DMatrix;

use crate::error::AppError;
use crate::math::Grid2d;

/// `values[(i, j)]` is the form factor at `q = (i + 1) dq`, `E = (j + 1) dE`;
/// zero outside the grid.
#[derive(Debug, Clone)]
pub struct FormFactorTable {
    grid: Grid2d,
    momentum_step: f64,
    energy_step: f64,
}

impl FormFactorTable {
    pub fn uniform(momentum_step: f64, energy_step: f64, values: DMatrix<f64>) -> Result<Self, AppError> {
        if values.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(AppError::config("Form factor tables must be finite and non-negative."));
        }
        Ok(Self {
            grid: Grid2d::uniform(momentum_step, energy_step, values)?,
            momentum_step,
            energy_step,
        })
    }

    pub fn momentum_step(&self) -> f64 {
        self.momentum_step
    }

    pub fn energy_step(&self) -> f64 {
        self.energy_step
    }

    pub fn momentum_nodes(&self) -> &[f64] {
        self.grid.x_nodes()
    }

    pub fn energy_nodes(&self) -> &[f64] {
        self.grid.y_nodes()
    }

    pub fn max_momentum(&self) -> f64 {
        self.momentum_step * self.momentum_nodes().len() as f64
    }

    pub fn max_energy(&self) -> f64 {
        self.energy_step * self.energy_nodes().len() as f64
    }

    pub fn eval(&self, q: f64, energy: f64) -> f64 {
        self.grid.eval(q, energy)
    }
}
