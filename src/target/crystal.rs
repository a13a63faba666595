//! Semiconductor crystals: band gap, pair-creation energy and the tabulated
//! crystal form factor.

use super::FormFactorTable;
use crate::error::AppError;
use crate::units::{EV, M_NUCLEON};

#[derive(Debug, Clone)]
pub struct Semiconductor {
    pub name: String,
    /// Mass of one unit cell.
    pub cell_mass: f64,
    pub energy_gap: f64,
    /// Mean energy per additional electron-hole pair.
    pub epsilon: f64,
    /// Largest pair number the form factor table can produce.
    pub max_pairs: u32,
    pub form_factor: FormFactorTable,
}

impl Semiconductor {
    pub fn new(
        name: impl Into<String>,
        cell_mass: f64,
        energy_gap: f64,
        epsilon: f64,
        form_factor: FormFactorTable,
    ) -> Result<Self, AppError> {
        let name = name.into();
        if !(cell_mass > 0.0 && energy_gap > 0.0 && epsilon > 0.0) {
            return Err(AppError::config(format!(
                "Crystal {name}: cell mass, gap and pair energy must be positive."
            )));
        }
        let top = form_factor.max_energy();
        if top < energy_gap {
            return Err(AppError::config(format!("Crystal {name}: form factor table ends below the band gap.")));
        }
        let max_pairs = ((top - energy_gap) / epsilon).floor() as u32 + 1;
        Ok(Self {
            name,
            cell_mass,
            energy_gap,
            epsilon,
            max_pairs,
            form_factor,
        })
    }

    pub fn silicon(form_factor: FormFactorTable) -> Result<Self, AppError> {
        Self::new("Si", 2.0 * 28.08 * M_NUCLEON, 1.11 * EV, 3.6 * EV, form_factor)
    }

    pub fn germanium(form_factor: FormFactorTable) -> Result<Self, AppError> {
        Self::new("Ge", 2.0 * 72.6 * M_NUCLEON, 0.67 * EV, 2.9 * EV, form_factor)
    }

    /// Smallest deposit producing `pairs` pairs: `E_gap + (Q − 1) ε`.
    pub fn minimum_energy(&self, pairs: u32) -> f64 {
        self.energy_gap + pairs.saturating_sub(1) as f64 * self.epsilon
    }

    /// Pair number produced by deposit `energy`; zero below the gap.
    pub fn pairs(&self, energy: f64) -> u32 {
        if energy < self.energy_gap {
            return 0;
        }
        ((energy - self.energy_gap) / self.epsilon).floor() as u32 + 1
    }

    pub fn crystal_form_factor(&self, q: f64, energy: f64) -> f64 {
        self.form_factor.eval(q, energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn table(energy_bins: usize) -> FormFactorTable {
        FormFactorTable::uniform(1e-5, 0.1 * EV, DMatrix::from_element(10, energy_bins, 1.0)).unwrap()
    }

    #[test]
    fn pair_numbers_follow_the_ionization_ladder() {
        let si = Semiconductor::silicon(table(200)).unwrap();
        // ⌊(20 − 1.11) / 3.6⌋ + 1
        assert_eq!(si.max_pairs, 6);
        assert_eq!(si.pairs(1.0 * EV), 0);
        assert_eq!(si.pairs(1.2 * EV), 1);
        assert_eq!(si.pairs(si.minimum_energy(3) + 0.01 * EV), 3);
        assert_eq!(si.pairs(si.minimum_energy(4) - 0.01 * EV), 3);
        assert_eq!(si.minimum_energy(1), si.energy_gap);

        let ge = Semiconductor::germanium(table(200)).unwrap();
        assert!(ge.max_pairs > si.max_pairs);
    }

    #[test]
    fn tables_must_reach_the_gap() {
        assert_eq!(Semiconductor::silicon(table(5)).unwrap_err().exit_code(), 2);
        assert!(Semiconductor::new("X", 0.0, 1.0, 1.0, table(200)).is_err());
    }
}
