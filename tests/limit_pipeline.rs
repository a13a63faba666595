use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;
use dd_limits::app::pipeline::run_limit;
use dd_limits::detector::DetectorModel;
use dd_limits::domain::ScanConfig;
use dd_limits::halo::{HaloConfig, VelocityDistribution};
use dd_limits::io::{read_limit_json, write_limit_csv, write_limit_json};
use dd_limits::math::Quadrature;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ddl-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn scan(detector_path: PathBuf) -> ScanConfig {
    ScanConfig {
        detector_path,
        halo: HaloConfig::default(),
        halo_name: "SHM",
        mass_min_gev: 5.0,
        mass_max_gev: 500.0,
        mass_steps: 5,
        reference_cross_section_cm2: 1e-45,
        confidence_level: 0.9,
        plot: false,
        plot_width: 80,
        plot_height: 20,
        export_csv: None,
        export_json: None,
    }
}

#[test]
fn detector_document_to_exclusion_curve() {
    let dir = scratch_dir("pipeline");
    fs::write(dir.join("eff.txt"), "# E [keV]  efficiency\n0.0 0.5\n10.0 0.9\n100.0 0.9\n").unwrap();
    fs::write(
        dir.join("xenon.json"),
        r#"{
            "name": "xenon-toy",
            "elements": ["Xe"],
            "exposure_kg_days": 1000.0,
            "efficiency_file": "eff.txt",
            "binning": {"mode": "threshold", "threshold_kev": 5.0, "maximum_kev": 40.0}
        }"#,
    )
    .unwrap();

    let run = run_limit(&scan(dir.join("xenon.json"))).unwrap();

    // 5 GeV cannot reach a 5 keV xenon threshold.
    assert_eq!(run.skipped, 1);
    assert_eq!(run.records.len(), 4);
    for r in &run.records {
        assert!(r.scale > 0.0 && r.scale.is_finite());
        assert_relative_eq!(r.cross_section_cm2, r.scale * 1e-45, max_relative = 1e-9);
    }
    // Near threshold the limit weakens quickly.
    assert!(run.records[0].cross_section_cm2 > run.records[1].cross_section_cm2);

    let csv = dir.join("limit.csv");
    write_limit_csv(&csv, &run.records).unwrap();
    let text = fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 1 + run.records.len());

    let json = dir.join("limit.json");
    let curve = dd_limits::domain::LimitCurveFile {
        tool: "ddl".to_string(),
        computed_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap(),
        detector: run.detector.base().name.clone(),
        halo: HaloConfig::default(),
        confidence_level: 0.9,
        points: run.records.clone(),
    };
    write_limit_json(&json, &curve).unwrap();
    assert_eq!(read_limit_json(&json).unwrap().points, run.records);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn maximum_gap_document_gives_weaker_limits_with_events() {
    let dir = scratch_dir("maxgap");
    let write = |name: &str, events: &str| {
        fs::write(
            dir.join(name),
            format!(
                r#"{{
                    "name": "{name}",
                    "elements": ["Ge"],
                    "exposure_kg_days": 300.0,
                    "binning": {{"mode": "maximum_gap", "threshold_kev": 2.0, "maximum_kev": 30.0, "events_kev": [{events}]}}
                }}"#
            ),
        )
        .unwrap();
    };
    write("empty.json", "");
    write("events.json", "3.0, 4.5, 20.0");

    let mut config = scan(dir.join("empty.json"));
    config.mass_min_gev = 20.0;
    config.mass_max_gev = 200.0;
    config.mass_steps = 3;
    let clean = run_limit(&config).unwrap();
    config.detector_path = dir.join("events.json");
    let dirty = run_limit(&config).unwrap();

    assert_eq!(clean.records.len(), 3);
    for (c, d) in clean.records.iter().zip(&dirty.records) {
        assert_relative_eq!(c.mass_gev, d.mass_gev);
        assert!(c.scale > 0.0);
        assert!(d.scale > c.scale);
    }
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn unknown_detector_file_fails_with_configuration_code() {
    let err = run_limit(&scan(PathBuf::from("no/such/detector.json"))).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn built_in_halos_are_normalized_with_bounded_cdfs() {
    let q = Quadrature::default();
    for config in [HaloConfig::default(), HaloConfig::shm_plus_plus()] {
        let halo = config.build().unwrap();
        let (lo, hi) = halo.speed_domain();
        let norm = q.integrate(|v| halo.pdf_speed(v), lo, hi).unwrap();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-5);
        assert_eq!(halo.cdf_speed(lo), 0.0);
        assert_relative_eq!(halo.cdf_speed(hi), 1.0, epsilon = 1e-9);

        let mut previous = f64::INFINITY;
        for i in 0..=40 {
            let v = lo + (hi - lo) * i as f64 / 40.0;
            let eta = halo.eta(v);
            assert!(eta <= previous * (1.0 + 1e-9));
            previous = eta;
        }
        assert_eq!(halo.eta(hi), 0.0);
        assert_eq!(halo.eta(2.0 * hi), 0.0);

        let mut previous = 0.0;
        for i in 0..=2000 {
            let v = lo + (hi - lo) * i as f64 / 2000.0;
            let cdf = halo.cdf_speed(v);
            assert!(cdf >= previous - 1e-12, "cdf fell from {previous} to {cdf} at {v:e}");
            previous = cdf;
        }
    }
}
