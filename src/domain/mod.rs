//! Domain types shared by the binary's layers.
//!
//! - command-line choices (`HaloChoice`)
//! - detector documents (`DetectorSpec`, `BinningSpec`)
//! - run configuration (`ScanConfig`)
//! - saved results (`LimitCurveFile`, `LimitRecord`)

pub mod types;

pub use types::*;
