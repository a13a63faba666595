//! Numerical primitives shared by every engine: quadrature, monotone root
//! finding (also used for effective integration bounds), interpolation tables
//! and grid generation.
//!
//! All routines are pure functions of their inputs and carry no shared state,
//! so they are safe to call from independent rayon workers.

pub mod grid;
pub mod interp;
pub mod quadrature;
pub mod root;

pub use grid::*;
pub use interp::*;
pub use quadrature::*;
pub use root::*;
