//! Serializable halo parameters in astronomer-friendly units.

use serde::{Deserialize, Serialize};

use super::{Halo, ShmPlusPlus, StandardHaloModel};
use crate::error::AppError;
use crate::units::{CM, GEV, KM_PER_SEC};

/// Halo model parameters: densities in GeV/cm³, speeds in km/s.
///
/// [`HaloConfig::build`] returns a fresh instance with its own caches, which is
/// how parallel workers obtain independent distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum HaloConfig {
    Shm {
        density: f64,
        dispersion: f64,
        observer_speed: f64,
        escape_speed: f64,
    },
    ShmPlusPlus {
        density: f64,
        dispersion: f64,
        observer_speed: f64,
        escape_speed: f64,
        sausage_fraction: f64,
        anisotropy: f64,
    },
}

impl Default for HaloConfig {
    fn default() -> Self {
        HaloConfig::Shm {
            density: 0.4,
            dispersion: 220.0,
            observer_speed: 232.0,
            escape_speed: 544.0,
        }
    }
}

impl HaloConfig {
    pub fn shm_plus_plus() -> Self {
        HaloConfig::ShmPlusPlus {
            density: 0.55,
            dispersion: 233.0,
            observer_speed: 248.0,
            escape_speed: 528.0,
            sausage_fraction: 0.2,
            anisotropy: 0.9,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HaloConfig::Shm { .. } => "SHM",
            HaloConfig::ShmPlusPlus { .. } => "SHM++",
        }
    }

    pub fn build(&self) -> Result<Halo, AppError> {
        let density_unit = GEV / (CM * CM * CM);
        match *self {
            HaloConfig::Shm {
                density,
                dispersion,
                observer_speed,
                escape_speed,
            } => Ok(Halo::Shm(StandardHaloModel::new(
                density * density_unit,
                dispersion * KM_PER_SEC,
                observer_speed * KM_PER_SEC,
                escape_speed * KM_PER_SEC,
            )?)),
            HaloConfig::ShmPlusPlus {
                density,
                dispersion,
                observer_speed,
                escape_speed,
                sausage_fraction,
                anisotropy,
            } => Ok(Halo::ShmPlusPlus(ShmPlusPlus::new(
                density * density_unit,
                dispersion * KM_PER_SEC,
                observer_speed * KM_PER_SEC,
                escape_speed * KM_PER_SEC,
                sausage_fraction,
                anisotropy,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halo::VelocityDistribution;
    use approx::assert_relative_eq;

    #[test]
    fn parses_tagged_json() {
        let json = r#"{"model":"shm_plus_plus","density":0.55,"dispersion":233,
            "observer_speed":248,"escape_speed":528,"sausage_fraction":0.2,"anisotropy":0.9}"#;
        let config: HaloConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, HaloConfig::shm_plus_plus());
    }

    #[test]
    fn default_config_builds_default_model() {
        let halo = HaloConfig::default().build().unwrap();
        let reference = StandardHaloModel::default();
        assert_eq!(halo.name(), "Standard Halo Model");
        assert_relative_eq!(halo.maximum_speed(), reference.maximum_speed(), max_relative = 1e-12);
        assert_relative_eq!(halo.eta(1e-3), reference.eta(1e-3), max_relative = 1e-12);
    }

    #[test]
    fn invalid_parameters_are_configuration_errors() {
        let config = HaloConfig::Shm {
            density: 0.4,
            dispersion: 0.0,
            observer_speed: 232.0,
            escape_speed: 544.0,
        };
        assert_eq!(config.build().unwrap_err().exit_code(), 2);
    }
}
