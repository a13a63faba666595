//! Statistical engine: the Poisson, binned-Poisson and maximum-gap tests,
//! and the exclusion solve shared by all three.
//!
//! Every test is monotone in an overall factor `k` on the signal; limits are
//! found with [`crate::math::Bisection`] by expanding a bracket from `k = 0`.

pub mod binned;
pub mod limit;
pub mod max_gap;
pub mod poisson;

pub use binned::*;
pub use limit::*;
pub use max_gap::*;
pub use poisson::*;

/// Default confidence level of exclusion limits.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.9;
