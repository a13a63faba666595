//! Two-body kinematics of dark matter scattering off nuclei and electrons.

use crate::units::reduced_mass;

/// Smallest dark-matter speed that can deposit recoil energy `recoil_energy`
/// in a nucleus of mass `nucleus_mass`: `√(m_N E_R / 2) / μ`.
pub fn v_min_nucleus(recoil_energy: f64, dm_mass: f64, nucleus_mass: f64) -> f64 {
    (nucleus_mass * recoil_energy / 2.0).sqrt() / reduced_mass(dm_mass, nucleus_mass)
}

/// Largest recoil energy a dark-matter particle with speed `speed` can
/// transfer to a nucleus: `2 μ² v² / m_N`.
pub fn maximum_nuclear_recoil_energy(speed: f64, dm_mass: f64, nucleus_mass: f64) -> f64 {
    let mu = reduced_mass(dm_mass, nucleus_mass);
    2.0 * mu * mu * speed * speed / nucleus_mass
}

/// Smallest speed for momentum transfer `q` and energy transfer
/// `energy_transfer` to a bound electron: `ΔE / q + q / (2 m_DM)`.
pub fn v_min_electron(q: f64, energy_transfer: f64, dm_mass: f64) -> f64 {
    energy_transfer / q + q / (2.0 * dm_mass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{EV, GEV, KEV, KM_PER_SEC, MEV};
    use approx::assert_relative_eq;

    #[test]
    fn nuclear_minimum_speed_inverts_the_maximum_recoil() {
        let (m_dm, m_n) = (30.0 * GEV, 122.0 * GEV);
        let v = 500.0 * KM_PER_SEC;
        let e_max = maximum_nuclear_recoil_energy(v, m_dm, m_n);
        assert_relative_eq!(v_min_nucleus(e_max, m_dm, m_n), v, max_relative = 1e-12);
        assert!(v_min_nucleus(2.0 * KEV, m_dm, m_n) < v_min_nucleus(4.0 * KEV, m_dm, m_n));
        assert_eq!(v_min_nucleus(0.0, m_dm, m_n), 0.0);
    }

    #[test]
    fn electron_minimum_speed_is_smallest_at_the_optimal_momentum() {
        let (m_dm, de) = (100.0 * MEV, 12.0 * EV);
        let q_star = (2.0 * m_dm * de).sqrt();
        let at_star = v_min_electron(q_star, de, m_dm);
        assert_relative_eq!(at_star, (2.0 * de / m_dm).sqrt(), max_relative = 1e-12);
        assert!(v_min_electron(0.5 * q_star, de, m_dm) > at_star);
        assert!(v_min_electron(2.0 * q_star, de, m_dm) > at_star);
    }
}
