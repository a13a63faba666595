//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the physics and statistics code stays clean and testable
//! - output changes are localized

use crate::detector::{Binning, DetectorModel, NuclearDetector};
use crate::domain::LimitRecord;
use crate::error::AppError;
use crate::halo::VelocityDistribution;
use crate::math::lin_space;
use crate::particle::CrossSectionProvider;
use crate::units::{in_units, DAY, KEV, KG, KM_PER_SEC};

/// One row of `ddl eta`, in km/s and s/km.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaRow {
    pub speed_km_s: f64,
    pub eta_s_per_km: f64,
    pub speed_cdf: f64,
}

/// One row of `ddl spectrum`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumRow {
    pub energy_kev: f64,
    /// Events per kg, day and keV.
    pub rate: f64,
}

/// Sample the eta function and the speed CDF on `steps` speeds spanning the
/// distribution's domain.
pub fn eta_rows(distribution: &dyn VelocityDistribution, steps: usize) -> Result<Vec<EtaRow>, AppError> {
    let (v_lo, v_hi) = distribution.speed_domain();
    let speeds = lin_space(v_lo, v_hi, steps)?;
    Ok(speeds
        .into_iter()
        .map(|v| EtaRow {
            speed_km_s: in_units(v, KM_PER_SEC),
            eta_s_per_km: distribution.eta(v) * KM_PER_SEC,
            speed_cdf: distribution.cdf_speed(v),
        })
        .collect())
}

/// Evaluate the observed-energy spectrum of a detector on `energies_kev`.
pub fn spectrum_rows<D: DetectorModel + ?Sized>(
    detector: &D,
    model: &dyn CrossSectionProvider,
    distribution: &dyn VelocityDistribution,
    energies_kev: &[f64],
) -> Result<Vec<SpectrumRow>, AppError> {
    let per_kg_day_kev = 1.0 / (KG * DAY * KEV);
    energies_kev
        .iter()
        .map(|&e| {
            let rate = detector.differential_rate(e * KEV, model, distribution)?;
            Ok(SpectrumRow {
                energy_kev: e,
                rate: in_units(rate, per_kg_day_kev),
            })
        })
        .collect()
}

pub fn format_eta_table(halo_name: &str, rows: &[EtaRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== ddl - eta function ({halo_name}) ===\n"));
    out.push_str(&header(&["v_min [km/s]", "eta [s/km]", "F(v)"]));
    for r in rows {
        out.push_str(&format!(
            "{:>14.1} {:>14.6e} {:>14.6}\n",
            r.speed_km_s, r.eta_s_per_km, r.speed_cdf
        ));
    }
    out
}

pub fn format_spectrum(mass_gev: f64, sigma_cm2: f64, rows: &[SpectrumRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== ddl - recoil spectrum (m = {mass_gev} GeV, sigma_p = {sigma_cm2:e} cm^2) ===\n"
    ));
    out.push_str(&header(&["E_R [keV]", "dR/dE [1/kg/d/keV]"]));
    for r in rows {
        out.push_str(&format!("{:>14.4} {:>14.6e}\n", r.energy_kev, r.rate));
    }
    out
}

/// Detector name, target composition, exposure and analysis mode.
pub fn format_detector_summary(detector: &NuclearDetector) -> String {
    let base = detector.base();
    let mut out = String::new();
    out.push_str(&format!("Detector: {}\n", base.name));

    let composition: Vec<String> = detector
        .target()
        .elements()
        .iter()
        .zip(detector.target().mass_fractions())
        .map(|(el, f)| format!("{} {:.1}%", el.symbol, 100.0 * f))
        .collect();
    out.push_str(&format!("Target: {}\n", composition.join(", ")));
    out.push_str(&format!(
        "Exposure: {:.4} kg day | flat efficiency {:.3} | resolution {:.4} keV\n",
        in_units(base.exposure(), KG * DAY),
        base.flat_efficiency(),
        in_units(detector.resolution(), KEV),
    ));

    let window = match base.binning() {
        Binning::EnergyThreshold { threshold, maximum } | Binning::MaximumGap { threshold, maximum, .. } => {
            format!("[{:.3}, {:.3}] keV", in_units(*threshold, KEV), in_units(*maximum, KEV))
        }
        Binning::EnergyBins { edges } => format!("{} bins from {:.3} keV", edges.len() - 1, in_units(edges[0], KEV)),
        Binning::QuantumThreshold { threshold, maximum } => format!("[{threshold}, {maximum}] quanta"),
        Binning::QuantumBins { edges } => format!("{} quantum bins", edges.len().saturating_sub(1)),
        Binning::Unconfigured => "unconfigured".to_string(),
    };
    out.push_str(&format!("Analysis: {} {window}\n", base.binning().label()));
    out.push_str(&format!(
        "Observed: {} | background: {}\n",
        truncate(&fmt_counts(base.observed()), 48),
        truncate(&fmt_vec(base.background()), 48),
    ));
    out
}

pub fn format_limit_table(halo_name: &str, confidence_level: f64, records: &[LimitRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:.0}% CL exclusion limit ({halo_name}), {} masses:\n",
        100.0 * confidence_level,
        records.len()
    ));
    out.push_str(&header(&["m_DM [GeV]", "scale", "sigma_p [cm^2]"]));
    for r in records {
        out.push_str(&format!(
            "{:>14.4} {:>14.4e} {:>14.4e}\n",
            r.mass_gev, r.scale, r.cross_section_cm2
        ));
    }
    out
}

fn header(columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| format!("{c:>14}")).collect();
    let rules: Vec<String> = columns.iter().map(|_| format!("{:->14}", "")).collect();
    format!("{}\n{}\n", names.join(" "), rules.join(" "))
}

fn fmt_counts(v: &[u64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
