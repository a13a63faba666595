//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - builds halos and detectors
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, EtaArgs, HaloArgs, LimitArgs, SpectrumArgs};
use crate::detector::{Binning, DetectorModel, NuclearDetector};
use crate::domain::{LimitCurveFile, LimitRecord, ScanConfig};
use crate::error::AppError;
use crate::halo::HaloConfig;
use crate::math::lin_space;
use crate::particle::SpinIndependent;
use crate::plot::PlotAxes;
use crate::units::{in_units, CM, GEV, KEV};

pub mod pipeline;

/// Entry point for the `ddl` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Eta(args) => handle_eta(args),
        Command::Spectrum(args) => handle_spectrum(args),
        Command::Limit(args) => handle_limit(args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_eta(args: EtaArgs) -> Result<(), AppError> {
    let config = halo_config_from_args(&args.halo)?;
    let mut halo = config.build()?;
    if let Some(date) = args.date {
        halo.set_observer_velocity_at(date);
    }
    let rows = crate::report::eta_rows(&halo, args.steps)?;
    println!("{}", crate::report::format_eta_table(config.label(), &rows));
    Ok(())
}

fn handle_spectrum(args: SpectrumArgs) -> Result<(), AppError> {
    let detector = crate::io::load_detector(&args.detector)?;
    let config = halo_config_from_args(&args.halo)?;
    let mut halo = config.build()?;
    if let Some(date) = args.date {
        halo.set_observer_velocity_at(date);
    }
    let model = SpinIndependent::nuclear(args.mass * GEV, args.sigma * CM * CM)?;

    let (lo, hi) = energy_window_kev(&detector);
    let energies = lin_space(args.e_min.unwrap_or(lo), args.e_max.unwrap_or(hi), args.steps)?;
    let rows = crate::report::spectrum_rows(&detector, &model, &halo, &energies)?;

    println!("{}", crate::report::format_detector_summary(&detector));
    println!("{}", crate::report::format_spectrum(args.mass, args.sigma, &rows));

    if args.plot.plot && !args.plot.no_plot {
        let curve: Vec<(f64, f64)> = rows.iter().map(|r| (r.energy_kev, r.rate)).collect();
        let axes = PlotAxes {
            x_label: "E_R [keV]",
            y_label: "dR/dE",
            log_x: false,
            log_y: true,
        };
        println!(
            "{}",
            crate::plot::render_ascii_plot(&curve, &[], axes, args.plot.width, args.plot.height)
        );
    }
    Ok(())
}

fn handle_limit(args: LimitArgs) -> Result<(), AppError> {
    let config = scan_config_from_args(&args)?;
    let run = pipeline::run_limit(&config)?;

    println!("{}", crate::report::format_detector_summary(&run.detector));
    if run.skipped > 0 {
        warn!(skipped = run.skipped, "masses below the detector's reach were skipped");
    }
    if run.records.is_empty() {
        return Err(AppError::empty(format!(
            "Detector {} is blind to every mass in [{}, {}] GeV.",
            run.detector.base().name,
            config.mass_min_gev,
            config.mass_max_gev
        )));
    }
    println!(
        "{}",
        crate::report::format_limit_table(config.halo_name, config.confidence_level, &run.records)
    );

    if config.plot {
        println!("{}", limit_plot(&run.records, config.plot_width, config.plot_height));
    }

    if let Some(path) = &config.export_csv {
        crate::io::write_limit_csv(path, &run.records)?;
        info!(path = %path.display(), "wrote limit CSV");
    }
    if let Some(path) = &config.export_json {
        let curve = LimitCurveFile {
            tool: "ddl".to_string(),
            computed_at: chrono::Local::now().naive_local(),
            detector: run.detector.base().name.clone(),
            halo: config.halo.clone(),
            confidence_level: config.confidence_level,
            points: run.records.clone(),
        };
        crate::io::write_limit_json(path, &curve)?;
        info!(path = %path.display(), "wrote limit JSON");
    }
    Ok(())
}

/// Exclusion curve on log-log axes, drawn as a line without markers.
fn limit_plot(records: &[LimitRecord], width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = records.iter().map(|r| (r.mass_gev, r.cross_section_cm2)).collect();
    let axes = PlotAxes {
        x_label: "m_DM [GeV]",
        y_label: "sigma_p [cm^2]",
        log_x: true,
        log_y: true,
    };
    crate::plot::render_ascii_plot(&curve, &[], axes, width, height)
}

fn halo_config_from_args(args: &HaloArgs) -> Result<HaloConfig, AppError> {
    match &args.halo_file {
        Some(path) => crate::io::read_halo_config(path),
        None => Ok(args.halo.default_config()),
    }
}

pub fn scan_config_from_args(args: &LimitArgs) -> Result<ScanConfig, AppError> {
    let halo = halo_config_from_args(&args.halo)?;
    Ok(ScanConfig {
        detector_path: args.detector.clone(),
        halo_name: halo.label(),
        halo,
        mass_min_gev: args.mass_min,
        mass_max_gev: args.mass_max,
        mass_steps: args.mass_steps,
        reference_cross_section_cm2: args.sigma,
        confidence_level: args.cl,
        plot: args.plot.plot && !args.plot.no_plot,
        plot_width: args.plot.width,
        plot_height: args.plot.height,
        export_csv: args.export.clone(),
        export_json: args.export_json.clone(),
    })
}

/// Analysis window of a detector in keV, for default spectrum ranges.
fn energy_window_kev(detector: &NuclearDetector) -> (f64, f64) {
    let (lo, hi) = match detector.base().binning() {
        Binning::EnergyThreshold { threshold, maximum } | Binning::MaximumGap { threshold, maximum, .. } => {
            (*threshold, *maximum)
        }
        Binning::EnergyBins { edges } => (edges[0], edges[edges.len() - 1]),
        _ => (0.1 * KEV, 100.0 * KEV),
    };
    (in_units(lo, KEV), in_units(hi, KEV))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_plot_draws_the_curve_without_markers() {
        let records: Vec<LimitRecord> = [(10.0, 1e-44), (100.0, 1e-46), (1000.0, 1e-45)]
            .into_iter()
            .map(|(mass_gev, cross_section_cm2)| LimitRecord { mass_gev, scale: 1.0, cross_section_cm2 })
            .collect();
        let txt = limit_plot(&records, 30, 8);
        let grid: Vec<&str> = txt.lines().skip(1).take(8).collect();
        assert!(grid.iter().any(|row| row.contains('-')));
        assert!(grid.iter().all(|row| !row.contains('o')));
    }
}
