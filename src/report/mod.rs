//! Reporting utilities: tabulated halo and spectrum samples, detector
//! summaries and exclusion-limit tables.

pub mod format;

pub use format::*;
