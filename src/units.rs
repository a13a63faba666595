//! Natural units (`ħ = c = 1`, energies in GeV).
//!
//! Every quantity inside the crate is expressed in these units. Multiply by a
//! constant to convert *into* natural units (`5.0 * KEV`), and use [`in_units`]
//! to convert back out for printing.

pub const GEV: f64 = 1.0;
pub const MEV: f64 = 1.0e-3;
pub const KEV: f64 = 1.0e-6;
pub const EV: f64 = 1.0e-9;

/// One meter in GeV⁻¹ (`1 / (ħc)` with `ħc = 0.1973269804 GeV·fm`).
pub const METER: f64 = 5.067_730_716_156_395e15;
pub const CM: f64 = 1.0e-2 * METER;
pub const KM: f64 = 1.0e3 * METER;
pub const FM: f64 = 1.0e-15 * METER;

/// One second in GeV⁻¹ (`1 / ħ` with `ħ = 6.582119569e-25 GeV·s`).
pub const SEC: f64 = 1.519_267_447_878_626e24;
pub const MINUTE: f64 = 60.0 * SEC;
pub const HOUR: f64 = 60.0 * MINUTE;
pub const DAY: f64 = 24.0 * HOUR;
pub const YEAR: f64 = 365.25 * DAY;

pub const KM_PER_SEC: f64 = KM / SEC;

/// One gram in GeV (`1 GeV = 1.78266192e-24 g`).
pub const GRAM: f64 = 5.609_588_603_804_451e23;
pub const KG: f64 = 1.0e3 * GRAM;

pub const ALPHA_EM: f64 = 1.0 / 137.035_999_084;
pub const M_ELECTRON: f64 = 0.510_998_95e-3;
pub const M_PROTON: f64 = 0.938_272_088_16;
/// Nucleon mass used for `m_N = A · m_nucleon`.
pub const M_NUCLEON: f64 = 0.932;

/// Express `quantity` as a multiple of `unit`.
pub fn in_units(quantity: f64, unit: f64) -> f64 {
    quantity / unit
}

/// Reduced mass of a two-body system.
pub fn reduced_mass(m1: f64, m2: f64) -> f64 {
    m1 * m2 / (m1 + m2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_of_light_is_one() {
        let c = 299_792.458 * KM_PER_SEC;
        assert!((c - 1.0).abs() < 1e-9, "c in natural units = {c}");
    }

    #[test]
    fn density_round_trip() {
        let rho = 0.3 * GEV / (CM * CM * CM);
        assert!((in_units(rho, GEV / (CM * CM * CM)) - 0.3).abs() < 1e-12);
    }
}
