//! Target materials and scattering kinematics.
//!
//! - nuclei: [`Isotope`], [`Element`] (natural compositions), [`NuclearTarget`]
//! - isolated atoms: [`AtomicShell`], [`Atom`]
//! - crystals: [`Semiconductor`]
//! - tabulated electronic form factors: [`FormFactorTable`]
//!
//! Records are immutable once built; the rate layer only reads them.

pub mod atom;
pub mod crystal;
pub mod form_factor;
pub mod kinematics;
pub mod nucleus;

pub use atom::*;
pub use crystal::*;
pub use form_factor::*;
pub use kinematics::*;
pub use nucleus::*;
