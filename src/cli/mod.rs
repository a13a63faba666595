//! Command-line parsing for the `ddl` binary.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the physics and statistics code.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

use crate::domain::HaloChoice;
use crate::stats::DEFAULT_CONFIDENCE_LEVEL;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ddl", version, about = "Dark-matter direct-detection rates and exclusion limits")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the eta function and speed CDF of a halo model.
    Eta(EtaArgs),
    /// Print the recoil spectrum of a detector for one dark-matter mass.
    Spectrum(SpectrumArgs),
    /// Compute an exclusion curve over a log-spaced mass grid.
    Limit(LimitArgs),
}

/// Halo selection shared by all subcommands.
#[derive(Debug, Args, Clone)]
pub struct HaloArgs {
    /// Built-in halo model with default parameters.
    #[arg(long, value_enum, env = "DDL_HALO", default_value_t = HaloChoice::Shm)]
    pub halo: HaloChoice,

    /// Halo parameters from a JSON file (overrides `--halo`).
    #[arg(long, value_name = "JSON", env = "DDL_HALO_FILE")]
    pub halo_file: Option<PathBuf>,
}

/// Plot options.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct EtaArgs {
    #[command(flatten)]
    pub halo: HaloArgs,

    /// Use the Earth's velocity on this date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS).
    #[arg(long, value_parser = parse_datetime)]
    pub date: Option<NaiveDateTime>,

    /// Number of speeds on the grid.
    #[arg(long, default_value_t = 50)]
    pub steps: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SpectrumArgs {
    /// Detector JSON document.
    #[arg(long, value_name = "JSON", env = "DDL_DETECTOR")]
    pub detector: PathBuf,

    #[command(flatten)]
    pub halo: HaloArgs,

    /// Use the Earth's velocity on this date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS).
    #[arg(long, value_parser = parse_datetime)]
    pub date: Option<NaiveDateTime>,

    /// Dark-matter mass (GeV).
    #[arg(long)]
    pub mass: f64,

    /// Spin-independent dark-matter-proton cross section (cm²).
    #[arg(long, default_value_t = 1e-45)]
    pub sigma: f64,

    /// Lowest recoil energy (keV); defaults to the detector's threshold.
    #[arg(long)]
    pub e_min: Option<f64>,

    /// Highest recoil energy (keV); defaults to the detector's maximum.
    #[arg(long)]
    pub e_max: Option<f64>,

    /// Energies on the grid.
    #[arg(long, default_value_t = 60)]
    pub steps: usize,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args, Clone)]
pub struct LimitArgs {
    /// Detector JSON document.
    #[arg(long, value_name = "JSON", env = "DDL_DETECTOR")]
    pub detector: PathBuf,

    #[command(flatten)]
    pub halo: HaloArgs,

    /// Lightest mass of the scan (GeV).
    #[arg(long, default_value_t = 1.0)]
    pub mass_min: f64,

    /// Heaviest mass of the scan (GeV).
    #[arg(long, default_value_t = 1000.0)]
    pub mass_max: f64,

    /// Number of log-spaced masses.
    #[arg(long, default_value_t = 25)]
    pub mass_steps: usize,

    /// Reference cross section (cm²) the limit scale multiplies.
    #[arg(long, default_value_t = 1e-45)]
    pub sigma: f64,

    /// Confidence level in (0, 1).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_LEVEL)]
    pub cl: f64,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export the curve to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the curve with run metadata to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Accept a full timestamp or a bare date (midnight).
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date '{s}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_with_or_without_time() {
        let midnight = parse_datetime("2024-06-01").unwrap();
        assert_eq!(midnight.to_string(), "2024-06-01 00:00:00");
        let noon = parse_datetime("2024-06-01T12:30:00").unwrap();
        assert_eq!(noon.to_string(), "2024-06-01 12:30:00");
        assert!(parse_datetime("June 1st").is_err());
    }

    #[test]
    fn limit_arguments_have_sensible_defaults() {
        let cli = Cli::try_parse_from(["ddl", "limit", "--detector", "xe.json", "--halo", "shm++", "--no-plot"]).unwrap();
        let Command::Limit(args) = cli.command else {
            panic!("expected the limit subcommand");
        };
        assert_eq!(args.halo.halo, HaloChoice::ShmPlusPlus);
        assert_eq!(args.mass_steps, 25);
        assert_eq!(args.cl, 0.9);
        assert!(args.plot.no_plot);
        assert!(args.export.is_none());
    }

    #[test]
    fn spectrum_requires_a_mass() {
        assert!(Cli::try_parse_from(["ddl", "spectrum", "--detector", "xe.json"]).is_err());
    }
}
