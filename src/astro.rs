//! Observer motion in the galactic frame (Lewin & Smith 1996 orbital model).
//!
//! Galactic coordinates: `x` towards the galactic centre, `y` along the
//! rotation of the disk, `z` towards the north galactic pole.

use chrono::{NaiveDate, NaiveDateTime};
use nalgebra::Vector3;

use crate::units::{DAY, KM_PER_SEC, SEC};

/// Local standard of rest plus peculiar solar motion, km/s.
const SUN_KM_S: [f64; 3] = [11.1, 232.24, 7.25];

const EARTH_ORBIT_KM_S: f64 = 29.79;
const EARTH_ECCENTRICITY: f64 = 0.016722;
const ECLIPTIC_LONGITUDE_OF_PERIHELION_DEG: f64 = 13.0;

/// Ecliptic latitudes `β_i` and longitudes `λ_i` of the galactic axes.
const AXIS_LATITUDE_DEG: [f64; 3] = [-5.5303, 59.575, 29.812];
const AXIS_LONGITUDE_DEG: [f64; 3] = [266.141, -13.3485, 179.3212];

fn j2000() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}

/// Days (with fraction) elapsed since 2000-01-01 12:00 (J2000.0).
pub fn fractional_days_since_j2000(datetime: NaiveDateTime) -> f64 {
    let elapsed = datetime - j2000();
    elapsed.num_milliseconds() as f64 * 1.0e-3 * SEC / DAY
}

/// Velocity of the Sun in the galactic rest frame.
pub fn sun_velocity() -> Vector3<f64> {
    Vector3::from(SUN_KM_S) * KM_PER_SEC
}

/// Orbital velocity of the Earth relative to the Sun, `n` days after J2000.
pub fn earth_velocity(n: f64) -> Vector3<f64> {
    let mean_longitude = 280.460 + 0.985_647_4 * n;
    let mean_anomaly = (357.528 + 0.985_600_3 * n).to_radians();
    let ecliptic_longitude =
        mean_longitude + 1.915 * mean_anomaly.sin() + 0.020 * (2.0 * mean_anomaly).sin();

    let speed = EARTH_ORBIT_KM_S
        * (1.0
            - EARTH_ECCENTRICITY
                * (ecliptic_longitude - ECLIPTIC_LONGITUDE_OF_PERIHELION_DEG)
                    .to_radians()
                    .sin());

    let component = |i: usize| {
        speed
            * AXIS_LATITUDE_DEG[i].to_radians().cos()
            * (ecliptic_longitude - AXIS_LONGITUDE_DEG[i]).to_radians().sin()
    };
    Vector3::new(component(0), component(1), component(2)) * KM_PER_SEC
}

/// Lab velocity relative to the galactic rest frame at `datetime` (UTC).
pub fn observer_velocity(datetime: NaiveDateTime) -> Vector3<f64> {
    sun_velocity() + earth_velocity(fractional_days_since_j2000(datetime))
}
