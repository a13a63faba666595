//! Dark-matter velocity distributions.
//!
//! [`VelocityDistribution`] is the capability every rate computation consumes:
//! a normalized lab-frame velocity density, its speed marginal and CDF, and
//! the eta function (mean inverse speed above a threshold). Two models
//! implement it:
//!
//! - [`StandardHaloModel`]: truncated Maxwell–Boltzmann, closed forms.
//! - [`ShmPlusPlus`]: SHM plus an anisotropic "sausage" component, whose eta
//!   function and CDF come from a lazily built [`EtaTable`].
//!
//! Parameter setters bump a [`ParameterVersion`]; derived quantities live in
//! [`VersionedCache`]s keyed on that version and rebuild on the next read.

pub mod cache;
pub mod config;
pub mod eta_table;
pub mod shm;
pub mod shm_plus_plus;

pub use cache::*;
pub use config::*;
pub use eta_table::*;
pub use shm::*;
pub use shm_plus_plus::*;

use chrono::NaiveDateTime;
use nalgebra::Vector3;

use crate::math::gauss_legendre;

/// Panels of the fixed quadrature used by the default speed moments.
const MOMENT_PANELS: usize = 400;

pub trait VelocityDistribution {
    fn name(&self) -> &str;

    /// Local dark-matter mass density.
    fn local_density(&self) -> f64;

    /// `[0, v_max]` where `v_max` is the lab-frame cutoff speed.
    fn speed_domain(&self) -> (f64, f64);

    fn minimum_speed(&self) -> f64 {
        self.speed_domain().0
    }

    fn maximum_speed(&self) -> f64 {
        self.speed_domain().1
    }

    /// 3-D lab-frame velocity density.
    fn pdf_velocity(&self, v: &Vector3<f64>) -> f64;

    /// Speed marginal of [`Self::pdf_velocity`].
    fn pdf_speed(&self, v: f64) -> f64;

    /// `∫_0^v pdf_speed`, clamped to `[0, 1]`.
    fn cdf_speed(&self, v: f64) -> f64 {
        let (lo, hi) = self.speed_domain();
        if v <= lo {
            return 0.0;
        }
        if v >= hi {
            return 1.0;
        }
        gauss_legendre(|u| self.pdf_speed(u), lo, v, MOMENT_PANELS).clamp(0.0, 1.0)
    }

    /// Mean speed of the particles faster than `v_min`.
    fn average_speed(&self, v_min: f64) -> f64 {
        let (lo, hi) = self.speed_domain();
        let from = v_min.max(lo);
        if from >= hi {
            return 0.0;
        }
        let weight = gauss_legendre(|u| self.pdf_speed(u), from, hi, MOMENT_PANELS);
        if weight <= 0.0 {
            return 0.0;
        }
        gauss_legendre(|u| u * self.pdf_speed(u), from, hi, MOMENT_PANELS) / weight
    }

    /// `∫_{v ≥ v_min} f(v) / v dv`; zero for `v_min ≥ v_max`.
    fn eta(&self, v_min: f64) -> f64;

    /// Particle flux per unit speed for dark matter of mass `mass`.
    fn differential_flux(&self, v: f64, mass: f64) -> f64 {
        self.local_density() / mass * v * self.pdf_speed(v)
    }

    /// Whether [`Self::eta`] is available for rate factorization.
    fn supports_eta_factorization(&self) -> bool {
        true
    }
}

/// Any halo model built from a [`HaloConfig`].
#[derive(Debug, Clone)]
pub enum Halo {
    Shm(StandardHaloModel),
    ShmPlusPlus(ShmPlusPlus),
}

impl Halo {
    fn inner(&self) -> &dyn VelocityDistribution {
        match self {
            Halo::Shm(d) => d,
            Halo::ShmPlusPlus(d) => d,
        }
    }

    /// Observer velocity of the Earth at `datetime`.
    pub fn set_observer_velocity_at(&mut self, datetime: NaiveDateTime) {
        match self {
            Halo::Shm(d) => d.set_observer_velocity_at(datetime),
            Halo::ShmPlusPlus(d) => d.set_observer_velocity_at(datetime),
        }
    }
}

impl VelocityDistribution for Halo {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn local_density(&self) -> f64 {
        self.inner().local_density()
    }

    fn speed_domain(&self) -> (f64, f64) {
        self.inner().speed_domain()
    }

    fn pdf_velocity(&self, v: &Vector3<f64>) -> f64 {
        self.inner().pdf_velocity(v)
    }

    fn pdf_speed(&self, v: f64) -> f64 {
        self.inner().pdf_speed(v)
    }

    fn cdf_speed(&self, v: f64) -> f64 {
        self.inner().cdf_speed(v)
    }

    fn average_speed(&self, v_min: f64) -> f64 {
        self.inner().average_speed(v_min)
    }

    fn eta(&self, v_min: f64) -> f64 {
        self.inner().eta(v_min)
    }

    fn differential_flux(&self, v: f64, mass: f64) -> f64 {
        self.inner().differential_flux(v, mass)
    }

    fn supports_eta_factorization(&self) -> bool {
        self.inner().supports_eta_factorization()
    }
}
