//! SHM++: the Standard Halo Model plus a radially anisotropic "sausage"
//! component (Evans, O'Hare & McCabe 2019).
//!
//! The sausage is a triaxial Gaussian in galactic spherical components,
//! truncated at the escape speed and mixed in with weight `η`. Its eta function
//! and speed CDF have no closed form and are served from an [`EtaTable`] that is
//! rebuilt whenever any parameter changes.

use std::f64::consts::PI;

use chrono::NaiveDateTime;
use nalgebra::Vector3;
use tracing::debug;

use super::cache::{ParameterVersion, VersionedCache};
use super::eta_table::EtaTable;
use super::shm::StandardHaloModel;
use super::VelocityDistribution;
use crate::astro;
use crate::error::AppError;
use crate::math::gauss_legendre;
use crate::units::{CM, GEV, KM_PER_SEC};

const TABLE_NODES: usize = 100;
const NORMALIZATION_PANELS: usize = 64;
const POLAR_PANELS: usize = 12;
const AZIMUTH_POINTS: usize = 96;

#[derive(Debug, Clone)]
pub struct ShmPlusPlus {
    round: StandardHaloModel,
    sausage_fraction: f64,
    anisotropy: f64,
    version: ParameterVersion,
    sausage_normalization: VersionedCache<f64>,
    sausage_table: VersionedCache<EtaTable>,
}

impl Default for ShmPlusPlus {
    /// `ρ = 0.55 GeV/cm³`, `v0 = 233 km/s`, `v_obs = 248 km/s`,
    /// `v_esc = 528 km/s`, `η = 0.2`, `β = 0.9`.
    fn default() -> Self {
        let round = StandardHaloModel::with_observer_velocity(
            0.55 * GEV / (CM * CM * CM),
            233.0 * KM_PER_SEC,
            Vector3::new(0.0, 248.0 * KM_PER_SEC, 0.0),
            528.0 * KM_PER_SEC,
        )
        .unwrap_or_default();
        Self::from_parts(round, 0.2, 0.9)
    }
}

fn check_fraction(eta: f64) -> Result<(), AppError> {
    if (0.0..=1.0).contains(&eta) {
        Ok(())
    } else {
        Err(AppError::config(format!("Sausage fraction must lie in [0, 1], got {eta}.")))
    }
}

fn check_anisotropy(beta: f64) -> Result<(), AppError> {
    if beta.is_finite() && beta < 1.0 {
        Ok(())
    } else {
        Err(AppError::config(format!("Anisotropy parameter must be finite and below 1, got {beta}.")))
    }
}

impl ShmPlusPlus {
    pub fn new(
        density: f64,
        dispersion: f64,
        observer_speed: f64,
        escape_speed: f64,
        sausage_fraction: f64,
        anisotropy: f64,
    ) -> Result<Self, AppError> {
        check_fraction(sausage_fraction)?;
        check_anisotropy(anisotropy)?;
        let round = StandardHaloModel::new(density, dispersion, observer_speed, escape_speed)?;
        Ok(Self::from_parts(round, sausage_fraction, anisotropy))
    }

    fn from_parts(round: StandardHaloModel, sausage_fraction: f64, anisotropy: f64) -> Self {
        Self {
            round,
            sausage_fraction,
            anisotropy,
            version: ParameterVersion::default(),
            sausage_normalization: VersionedCache::default(),
            sausage_table: VersionedCache::default(),
        }
    }

    pub fn round_component(&self) -> &StandardHaloModel {
        &self.round
    }

    pub fn sausage_fraction(&self) -> f64 {
        self.sausage_fraction
    }

    pub fn anisotropy(&self) -> f64 {
        self.anisotropy
    }

    pub fn version(&self) -> ParameterVersion {
        self.version
    }

    pub fn set_local_density(&mut self, density: f64) -> Result<(), AppError> {
        self.round.set_local_density(density)?;
        self.version.bump();
        Ok(())
    }

    pub fn set_dispersion(&mut self, dispersion: f64) -> Result<(), AppError> {
        self.round.set_dispersion(dispersion)?;
        self.version.bump();
        Ok(())
    }

    pub fn set_escape_speed(&mut self, escape_speed: f64) -> Result<(), AppError> {
        self.round.set_escape_speed(escape_speed)?;
        self.version.bump();
        Ok(())
    }

    pub fn set_observer_velocity(&mut self, observer: Vector3<f64>) {
        self.round.set_observer_velocity(observer);
        self.version.bump();
    }

    pub fn set_observer_velocity_at(&mut self, datetime: NaiveDateTime) {
        self.set_observer_velocity(astro::observer_velocity(datetime));
    }

    pub fn set_sausage_fraction(&mut self, sausage_fraction: f64) -> Result<(), AppError> {
        check_fraction(sausage_fraction)?;
        self.sausage_fraction = sausage_fraction;
        self.version.bump();
        Ok(())
    }

    pub fn set_anisotropy(&mut self, anisotropy: f64) -> Result<(), AppError> {
        check_anisotropy(anisotropy)?;
        self.anisotropy = anisotropy;
        self.version.bump();
        Ok(())
    }

    /// Sausage dispersions `(σ_r, σ_θ, σ_φ)`.
    pub fn sausage_dispersions(&self) -> (f64, f64, f64) {
        let v0 = self.round.dispersion();
        let beta = self.anisotropy;
        let denominator = 2.0 * (3.0 - 2.0 * beta);
        let sigma_r = (3.0 * v0 * v0 / denominator).sqrt();
        let sigma_t = (3.0 * v0 * v0 * (1.0 - beta) / denominator).sqrt();
        (sigma_r, sigma_t, sigma_t)
    }

    /// Fraction of the untruncated sausage Gaussian inside the escape sphere.
    pub fn sausage_normalization(&self) -> f64 {
        *self.sausage_normalization.get_or_build(self.version, || {
            let (sigma_r, _, sigma_t) = self.sausage_dispersions();
            let prefactor = 2.0 * PI / ((2.0 * PI).powf(1.5) * sigma_r * sigma_t * sigma_t);
            let shell = |u: f64| {
                // Polar axis along the radial direction; σ_θ = σ_φ.
                let a = 0.5 * u * u * (1.0 / (sigma_r * sigma_r) - 1.0 / (sigma_t * sigma_t));
                let polar = gauss_legendre(|c| (-a * c * c).exp(), -1.0, 1.0, 16);
                u * u * (-0.5 * u * u / (sigma_t * sigma_t)).exp() * polar
            };
            let n = prefactor * gauss_legendre(shell, 0.0, self.round.escape_speed(), NORMALIZATION_PANELS);
            debug!(n_sausage = n, "recomputed sausage truncation factor");
            n
        })
    }

    /// Galactic-frame sausage density; `x` radial, `y` azimuthal, `z` polar.
    fn sausage_galactic_density(&self, u: &Vector3<f64>) -> f64 {
        let v_esc = self.round.escape_speed();
        if u.norm_squared() > v_esc * v_esc {
            return 0.0;
        }
        let (sigma_r, sigma_theta, sigma_phi) = self.sausage_dispersions();
        let exponent = u.x * u.x / (2.0 * sigma_r * sigma_r)
            + u.y * u.y / (2.0 * sigma_phi * sigma_phi)
            + u.z * u.z / (2.0 * sigma_theta * sigma_theta);
        (-exponent).exp()
            / ((2.0 * PI).powf(1.5) * sigma_r * sigma_theta * sigma_phi * self.sausage_normalization())
    }

    /// Lab-frame speed density of the sausage component: angular integral of
    /// the velocity density with the polar axis along the observer motion.
    pub fn sausage_pdf_speed(&self, v: f64) -> f64 {
        if v <= 0.0 || v >= self.maximum_speed() {
            return 0.0;
        }
        let observer = self.round.observer_velocity();
        let v_obs = observer.norm();
        let v_esc = self.round.escape_speed();

        let axis = if v_obs > 0.0 { observer / v_obs } else { Vector3::z() };
        let helper = if axis.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        let e1 = helper.cross(&axis).normalize();
        let e2 = axis.cross(&e1);

        let c_max = if v_obs > 0.0 {
            (v_esc * v_esc - v * v - v_obs * v_obs) / (2.0 * v * v_obs)
        } else if v < v_esc {
            1.0
        } else {
            -1.0
        };
        if c_max <= -1.0 {
            return 0.0;
        }
        let c_max = c_max.min(1.0);

        let d_phi = 2.0 * PI / AZIMUTH_POINTS as f64;
        let ring = |c: f64| {
            let s = (1.0 - c * c).max(0.0).sqrt();
            let mut sum = 0.0;
            for k in 0..AZIMUTH_POINTS {
                let phi = k as f64 * d_phi;
                let direction = e1 * (s * phi.cos()) + e2 * (s * phi.sin()) + axis * c;
                sum += self.sausage_galactic_density(&(direction * v + observer));
            }
            sum * d_phi
        };
        v * v * gauss_legendre(ring, -1.0, c_max, POLAR_PANELS)
    }

    fn table(&self) -> std::sync::Arc<EtaTable> {
        self.sausage_table.get_or_build(self.version, || {
            let v_max = self.maximum_speed();
            let kink = (self.round.escape_speed() - self.round.observer_velocity().norm()).abs();
            let table = EtaTable::build(|v| self.sausage_pdf_speed(v), v_max, TABLE_NODES, &[kink]);
            debug!(nodes = table.speeds().len(), weight = table.total(), "built sausage eta table");
            table
        })
    }
}

impl VelocityDistribution for ShmPlusPlus {
    fn name(&self) -> &str {
        "SHM++"
    }

    fn local_density(&self) -> f64 {
        self.round.local_density()
    }

    fn speed_domain(&self) -> (f64, f64) {
        self.round.speed_domain()
    }

    fn pdf_velocity(&self, v: &Vector3<f64>) -> f64 {
        let weight = self.sausage_fraction;
        let u = v + self.round.observer_velocity();
        (1.0 - weight) * self.round.pdf_velocity(v) + weight * self.sausage_galactic_density(&u)
    }

    fn pdf_speed(&self, v: f64) -> f64 {
        let weight = self.sausage_fraction;
        (1.0 - weight) * self.round.pdf_speed(v) + weight * self.sausage_pdf_speed(v)
    }

    fn cdf_speed(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        if v >= self.maximum_speed() {
            return 1.0;
        }
        let weight = self.sausage_fraction;
        ((1.0 - weight) * self.round.cdf_speed(v) + weight * self.table().cdf(v)).clamp(0.0, 1.0)
    }

    fn eta(&self, v_min: f64) -> f64 {
        if v_min >= self.maximum_speed() {
            return 0.0;
        }
        let weight = self.sausage_fraction;
        (1.0 - weight) * self.round.eta(v_min) + weight * self.table().eta(v_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quadrature;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn km(v: f64) -> f64 {
        v * KM_PER_SEC
    }

    #[test]
    fn dispersions_follow_anisotropy() {
        let halo = ShmPlusPlus::default();
        let (sr, st, sp) = halo.sausage_dispersions();
        let v0 = km(233.0);
        assert_relative_eq!(sr * sr, 3.0 * v0 * v0 / (2.0 * 1.2), max_relative = 1e-12);
        assert_relative_eq!(st, sp);
        assert_relative_eq!(st * st, 3.0 * v0 * v0 * 0.1 / (2.0 * 1.2), max_relative = 1e-12);
    }

    #[test]
    fn sausage_normalization_matches_monte_carlo() {
        let halo = ShmPlusPlus::default();
        let (sr, st, sp) = halo.sausage_dispersions();
        let v_esc = km(528.0);
        let mut rng = StdRng::seed_from_u64(7);
        let (nr, nt, np) = (
            Normal::new(0.0, sr).unwrap(),
            Normal::new(0.0, st).unwrap(),
            Normal::new(0.0, sp).unwrap(),
        );
        let draws = 200_000;
        let inside = (0..draws)
            .filter(|_| {
                let u = Vector3::new(nr.sample(&mut rng), np.sample(&mut rng), nt.sample(&mut rng));
                u.norm() < v_esc
            })
            .count();
        let fraction = inside as f64 / draws as f64;
        assert!((halo.sausage_normalization() - fraction).abs() < 5e-3);
    }

    #[test]
    fn speed_pdf_is_normalized() {
        let halo = ShmPlusPlus::default();
        let total = Quadrature::with_rel_tol(1e-8)
            .integrate(|v| halo.sausage_pdf_speed(v), 0.0, halo.maximum_speed())
            .unwrap();
        assert_relative_eq!(total, 1.0, max_relative = 1e-6);
        let mixed = Quadrature::with_rel_tol(1e-8)
            .integrate(|v| halo.pdf_speed(v), 0.0, halo.maximum_speed())
            .unwrap();
        assert_relative_eq!(mixed, 1.0, max_relative = 1e-6);
    }

    #[test]
    fn tabulated_eta_and_cdf_are_monotone_up_to_cutoff() {
        let halo = ShmPlusPlus::default();
        let v_max = halo.maximum_speed();
        assert_eq!(halo.eta(v_max), 0.0);
        assert_eq!(halo.eta(2.0 * v_max), 0.0);
        let mut previous = f64::INFINITY;
        for i in 0..=80 {
            let v = v_max * i as f64 / 80.0;
            let e = halo.eta(v);
            assert!(e <= previous, "eta increased at {v:e}");
            previous = e;
        }
        assert_eq!(halo.cdf_speed(0.0), 0.0);
        assert_eq!(halo.cdf_speed(v_max), 1.0);
        let mut previous = 0.0;
        for i in 0..=2000 {
            let cdf = halo.cdf_speed(v_max * i as f64 / 2000.0);
            assert!(cdf >= previous - 1e-12, "cdf decreased at step {i}");
            previous = cdf;
        }
    }

    #[test]
    fn tabulated_eta_tracks_direct_integration() {
        let halo = ShmPlusPlus::default();
        let q = Quadrature::with_rel_tol(1e-8);
        for v_min in [km(200.0), km(400.0), km(600.0)] {
            let direct = q
                .integrate(|v| halo.pdf_speed(v) / v, v_min, halo.maximum_speed())
                .unwrap();
            assert_relative_eq!(halo.eta(v_min), direct, max_relative = 5e-3);
        }
    }

    #[test]
    fn parameter_changes_rebuild_the_table() {
        let mut halo = ShmPlusPlus::default();
        let before = halo.eta(km(300.0));
        halo.set_anisotropy(0.5).unwrap();
        let fresh = ShmPlusPlus::new(
            0.55 * GEV / (CM * CM * CM),
            km(233.0),
            km(248.0),
            km(528.0),
            0.2,
            0.5,
        )
        .unwrap();
        assert_ne!(halo.eta(km(300.0)), before);
        assert_relative_eq!(halo.eta(km(300.0)), fresh.eta(km(300.0)), max_relative = 1e-12);

        halo.set_escape_speed(km(600.0)).unwrap();
        assert_relative_eq!(halo.maximum_speed(), km(848.0), max_relative = 1e-12);
        assert!(halo.eta(km(800.0)) > 0.0);
        assert!(halo.set_sausage_fraction(1.5).is_err());
    }
}
