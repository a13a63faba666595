//! `dd-limits` library crate.
//!
//! Dark-matter direct-detection event rates and the statistics that turn them
//! into exclusion limits. The binary (`ddl`) is a thin wrapper around this
//! library so that:
//!
//! - core logic is testable without spawning processes
//! - halo models, detectors and analyses are reusable on their own
//!
//! All quantities are in natural units (GeV = 1, c = ħ = 1); see [`units`].

pub mod app;
pub mod astro;
pub mod cli;
pub mod detector;
pub mod domain;
pub mod error;
pub mod halo;
pub mod io;
pub mod math;
pub mod particle;
pub mod plot;
pub mod rate;
pub mod report;
pub mod stats;
pub mod target;
pub mod units;
