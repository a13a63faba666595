//! Input/output helpers.
//!
//! - two-column efficiency tables (`table`)
//! - detector JSON documents (`detector`)
//! - exclusion-curve exports: CSV (`export`) and JSON (`curve`)

pub mod curve;
pub mod detector;
pub mod export;
pub mod table;

pub use curve::*;
pub use detector::*;
pub use export::*;
pub use table::*;
