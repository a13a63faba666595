//! Standard Halo Model: an isotropic Maxwell–Boltzmann distribution truncated
//! at the galactic escape speed and boosted into the lab frame.

use std::f64::consts::PI;

use chrono::NaiveDateTime;
use nalgebra::Vector3;
use statrs::function::erf::erf;
use tracing::debug;

use super::cache::{ParameterVersion, VersionedCache};
use super::VelocityDistribution;
use crate::astro;
use crate::error::AppError;
use crate::math::gauss_legendre;
use crate::units::{CM, GEV, KM_PER_SEC};

const NORMALIZATION_PANELS: usize = 64;

#[derive(Debug, Clone)]
pub struct StandardHaloModel {
    density: f64,
    dispersion: f64,
    escape_speed: f64,
    observer: Vector3<f64>,
    version: ParameterVersion,
    normalization: VersionedCache<f64>,
}

impl Default for StandardHaloModel {
    /// `ρ = 0.4 GeV/cm³`, `v0 = 220 km/s`, `v_obs = 232 km/s`, `v_esc = 544 km/s`.
    fn default() -> Self {
        Self {
            density: 0.4 * GEV / (CM * CM * CM),
            dispersion: 220.0 * KM_PER_SEC,
            escape_speed: 544.0 * KM_PER_SEC,
            observer: Vector3::new(0.0, 232.0 * KM_PER_SEC, 0.0),
            version: ParameterVersion::default(),
            normalization: VersionedCache::default(),
        }
    }
}

fn check_positive(what: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::config(format!("{what} must be positive and finite, got {value:e}.")))
    }
}

impl StandardHaloModel {
    /// Observer moving with speed `observer_speed` along the galactic `y` axis.
    pub fn new(density: f64, dispersion: f64, observer_speed: f64, escape_speed: f64) -> Result<Self, AppError> {
        Self::with_observer_velocity(density, dispersion, Vector3::new(0.0, observer_speed, 0.0), escape_speed)
    }

    pub fn with_observer_velocity(
        density: f64,
        dispersion: f64,
        observer: Vector3<f64>,
        escape_speed: f64,
    ) -> Result<Self, AppError> {
        check_positive("Local density", density)?;
        check_positive("Velocity dispersion", dispersion)?;
        check_positive("Escape speed", escape_speed)?;
        if !observer.iter().all(|c| c.is_finite()) {
            return Err(AppError::config("Observer velocity must be finite."));
        }
        Ok(Self {
            density,
            dispersion,
            escape_speed,
            observer,
            version: ParameterVersion::default(),
            normalization: VersionedCache::default(),
        })
    }

    pub fn dispersion(&self) -> f64 {
        self.dispersion
    }

    pub fn escape_speed(&self) -> f64 {
        self.escape_speed
    }

    pub fn observer_velocity(&self) -> Vector3<f64> {
        self.observer
    }

    pub fn version(&self) -> ParameterVersion {
        self.version
    }

    pub fn set_local_density(&mut self, density: f64) -> Result<(), AppError> {
        check_positive("Local density", density)?;
        self.density = density;
        self.version.bump();
        Ok(())
    }

    pub fn set_dispersion(&mut self, dispersion: f64) -> Result<(), AppError> {
        check_positive("Velocity dispersion", dispersion)?;
        self.dispersion = dispersion;
        self.version.bump();
        Ok(())
    }

    pub fn set_escape_speed(&mut self, escape_speed: f64) -> Result<(), AppError> {
        check_positive("Escape speed", escape_speed)?;
        self.escape_speed = escape_speed;
        self.version.bump();
        Ok(())
    }

    pub fn set_observer_velocity(&mut self, observer: Vector3<f64>) {
        self.observer = observer;
        self.version.bump();
    }

    /// Observer velocity of an Earth-bound lab at `datetime` (UTC).
    pub fn set_observer_velocity_at(&mut self, datetime: NaiveDateTime) {
        self.set_observer_velocity(astro::observer_velocity(datetime));
    }

    /// Truncation factor `N_esc`: the fraction of an untruncated Maxwellian
    /// inside the escape sphere.
    pub fn normalization(&self) -> f64 {
        *self.normalization.get_or_build(self.version, || {
            let z = self.escape_speed / self.dispersion;
            let n = gauss_legendre(
                |w| 4.0 / PI.sqrt() * w * w * (-w * w).exp(),
                0.0,
                z,
                NORMALIZATION_PANELS,
            );
            debug!(n_esc = n, z, "recomputed SHM truncation factor");
            n
        })
    }

    /// Galactic-frame density at galactic velocity `u`.
    pub(crate) fn galactic_density(&self, u: &Vector3<f64>) -> f64 {
        let u2 = u.norm_squared();
        if u2 > self.escape_speed * self.escape_speed {
            return 0.0;
        }
        let v0 = self.dispersion;
        (-u2 / (v0 * v0)).exp() / (self.normalization() * PI.powf(1.5) * v0 * v0 * v0)
    }

    fn dimensionless(&self) -> (f64, f64, f64) {
        let v0 = self.dispersion;
        (self.observer.norm() / v0, self.escape_speed / v0, self.normalization())
    }

    /// Speed CDF in units of `v0`, for an observer moving with `y = v_E/v0 > 0`.
    fn boosted_cdf(w: f64, y: f64, z: f64, n: f64) -> f64 {
        let half_sqrt_pi = 0.5 * PI.sqrt();
        let g_minus = |w: f64| -0.5 * (-(w - y) * (w - y)).exp() + y * half_sqrt_pi * erf(w - y);
        let g_plus = |w: f64| -0.5 * (-(w + y) * (w + y)).exp() - y * half_sqrt_pi * erf(w + y);
        let h1 = |w: f64| g_minus(w) - g_plus(w);
        let h2 = |w: f64| g_minus(w) - 0.5 * w * w * (-z * z).exp();

        let inner_end = (z - y).max(0.0);
        let outer_start = (z - y).abs();
        let mut area = h1(w.min(inner_end)) - h1(0.0);
        if w > outer_start {
            area += h2(w) - h2(outer_start);
        }
        area / (n * PI.sqrt() * y)
    }
}

impl VelocityDistribution for StandardHaloModel {
    fn name(&self) -> &str {
        "Standard Halo Model"
    }

    fn local_density(&self) -> f64 {
        self.density
    }

    fn speed_domain(&self) -> (f64, f64) {
        (0.0, self.escape_speed + self.observer.norm())
    }

    fn pdf_velocity(&self, v: &Vector3<f64>) -> f64 {
        self.galactic_density(&(v + self.observer))
    }

    fn pdf_speed(&self, v: f64) -> f64 {
        let v_max = self.maximum_speed();
        if v <= 0.0 || v >= v_max {
            return 0.0;
        }
        let v0 = self.dispersion;
        let (y, z, n) = self.dimensionless();
        let w = v / v0;
        if y == 0.0 {
            return 4.0 * w * w * (-w * w).exp() / (n * PI.sqrt() * v0);
        }
        if w < y - z {
            return 0.0;
        }
        let near = (-(w - y) * (w - y)).exp();
        let far = if w < z - y { (-(w + y) * (w + y)).exp() } else { (-z * z).exp() };
        (w / (n * PI.sqrt() * v0 * y) * (near - far)).max(0.0)
    }

    fn cdf_speed(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        if v >= self.maximum_speed() {
            return 1.0;
        }
        let (y, z, n) = self.dimensionless();
        let w = v / self.dispersion;
        let cdf = if y == 0.0 {
            (erf(w) - 2.0 * w / PI.sqrt() * (-w * w).exp()) / n
        } else {
            Self::boosted_cdf(w, y, z, n)
        };
        cdf.clamp(0.0, 1.0)
    }

    fn eta(&self, v_min: f64) -> f64 {
        if v_min >= self.maximum_speed() {
            return 0.0;
        }
        let v0 = self.dispersion;
        let (y, z, n) = self.dimensionless();
        let x = v_min.max(0.0) / v0;
        let tail = (-z * z).exp();

        if y == 0.0 {
            return (2.0 / (n * PI.sqrt() * v0) * ((-x * x).exp() - tail)).max(0.0);
        }

        // Below |z - y| the integrand is either the full inner form or empty.
        let x = if y > z { x.max(y - z) } else { x };
        let prefactor = 1.0 / (2.0 * n * v0 * y);
        let eta = if x < z - y {
            prefactor * (erf(x + y) - erf(x - y) - 4.0 / PI.sqrt() * y * tail)
        } else {
            prefactor * (erf(z) - erf(x - y) - 2.0 / PI.sqrt() * (z + y - x) * tail)
        };
        eta.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quadrature;
    use approx::assert_relative_eq;

    fn km(v: f64) -> f64 {
        v * KM_PER_SEC
    }

    fn reference_halo() -> StandardHaloModel {
        StandardHaloModel::new(0.3 * GEV / (CM * CM * CM), km(220.0), km(250.0), km(544.0)).unwrap()
    }

    #[test]
    fn normalization_matches_closed_form() {
        let shm = reference_halo();
        let z: f64 = 544.0 / 220.0;
        let closed = erf(z) - 2.0 * z / PI.sqrt() * (-z * z).exp();
        assert_relative_eq!(shm.normalization(), closed, max_relative = 1e-12);
    }

    #[test]
    fn reference_eta_values() {
        let shm = reference_halo();
        assert_relative_eq!(shm.eta(0.0), 1073.337, max_relative = 1e-6);
        assert_eq!(shm.eta(km(794.0)), 0.0);
        assert_eq!(shm.eta(km(900.0)), 0.0);
        assert_relative_eq!(shm.eta(km(300.0)), 447.7603, max_relative = 1e-6);
    }

    #[test]
    fn reference_average_speed() {
        let shm = reference_halo();
        assert_relative_eq!(shm.average_speed(0.0), 0.001_139_39, max_relative = 1e-5);
    }

    #[test]
    fn speed_pdf_is_normalized_and_cdf_agrees() {
        let shm = reference_halo();
        let q = Quadrature::with_rel_tol(1e-9);
        let v_max = shm.maximum_speed();
        let total = q.integrate(|v| shm.pdf_speed(v), 0.0, v_max).unwrap();
        assert_relative_eq!(total, 1.0, max_relative = 1e-6);

        for v in [km(100.0), km(294.0), km(500.0), km(700.0)] {
            let partial = q.integrate(|u| shm.pdf_speed(u), 0.0, v).unwrap();
            assert_relative_eq!(shm.cdf_speed(v), partial, max_relative = 1e-6);
        }
        assert_eq!(shm.cdf_speed(0.0), 0.0);
        assert_eq!(shm.cdf_speed(v_max), 1.0);

        let mut previous = 0.0;
        for i in 0..=2000 {
            let cdf = shm.cdf_speed(v_max * i as f64 / 2000.0);
            assert!(cdf >= previous - 1e-12, "cdf decreased at step {i}");
            previous = cdf;
        }
    }

    #[test]
    fn eta_matches_direct_integration() {
        let shm = reference_halo();
        let q = Quadrature::with_rel_tol(1e-9);
        for v_min in [km(50.0), km(250.0), km(400.0), km(650.0)] {
            let direct = q
                .integrate(|v| shm.pdf_speed(v) / v, v_min, shm.maximum_speed())
                .unwrap();
            assert_relative_eq!(shm.eta(v_min), direct, max_relative = 1e-6);
        }
    }

    #[test]
    fn resting_observer_uses_isotropic_forms() {
        let shm = StandardHaloModel::new(0.4, km(220.0), 0.0, km(544.0)).unwrap();
        let q = Quadrature::with_rel_tol(1e-9);
        let total = q.integrate(|v| shm.pdf_speed(v), 0.0, shm.maximum_speed()).unwrap();
        assert_relative_eq!(total, 1.0, max_relative = 1e-8);
        let direct = q
            .integrate(|v| shm.pdf_speed(v) / v, km(100.0), shm.maximum_speed())
            .unwrap();
        assert_relative_eq!(shm.eta(km(100.0)), direct, max_relative = 1e-8);
        let partial = q.integrate(|v| shm.pdf_speed(v), 0.0, km(300.0)).unwrap();
        assert_relative_eq!(shm.cdf_speed(km(300.0)), partial, max_relative = 1e-8);
    }

    #[test]
    fn velocity_density_vanishes_beyond_escape() {
        let shm = reference_halo();
        let observer = shm.observer_velocity();
        assert!(shm.pdf_velocity(&(-observer)) > 0.0);
        let fast = Vector3::new(km(600.0), 0.0, 0.0) - observer;
        assert_eq!(shm.pdf_velocity(&fast), 0.0);
    }

    #[test]
    fn setters_invalidate_derived_values() {
        let mut shm = reference_halo();
        let before = shm.eta(km(300.0));
        let n_before = shm.normalization();

        shm.set_escape_speed(km(600.0)).unwrap();
        let fresh = StandardHaloModel::new(0.3 * GEV / (CM * CM * CM), km(220.0), km(250.0), km(600.0)).unwrap();
        assert!(shm.normalization() > n_before);
        assert_ne!(shm.eta(km(300.0)), before);
        assert_eq!(shm.eta(km(300.0)), fresh.eta(km(300.0)));
        assert_relative_eq!(shm.maximum_speed(), km(850.0), max_relative = 1e-12);

        shm.set_dispersion(km(250.0)).unwrap();
        let fresh = StandardHaloModel::new(0.3 * GEV / (CM * CM * CM), km(250.0), km(250.0), km(600.0)).unwrap();
        assert_eq!(shm.pdf_speed(km(300.0)), fresh.pdf_speed(km(300.0)));
        assert!(shm.set_dispersion(-1.0).is_err());
    }
}
