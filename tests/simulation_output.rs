// End-to-end runs through the public API, checking the persisted batch
// structure for each primary species and output mode.

use ion_cascade::{Config, ElectronTables, OutputKind, PrimaryKind, Simulation};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn scratch_dir(tag: &str) -> PathBuf {
    let n = DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "ion_cascade_e2e_{}_{}_{}",
        tag,
        std::process::id(),
        n
    ))
}

fn run(config: Config) -> (String, PathBuf) {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(config).expect("valid configuration");
    let summary = sim.initiate().expect("run completes");
    assert_eq!(summary.write_failures, 0);
    let text = fs::read_to_string(&summary.output_path).expect("output readable");
    (text, summary.output_path)
}

fn cleanup(path: &std::path::Path) {
    fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn test_below_threshold_primary_writes_entry_point_only() {
    let config = Config {
        primary_energy: 10.0, // below the ion stopping threshold
        cascade_count: 1,
        output_directory: scratch_dir("threshold"),
        ..Config::default()
    };
    let (text, path) = run(config);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["0 0 0 0", "END_OF_BATCH"]);
    cleanup(&path);
}

#[test]
fn test_every_cascade_terminated_by_marker() {
    let config = Config {
        primary_energy: 1.0e4,
        cascade_count: 5,
        thread_count: 2,
        output_directory: scratch_dir("markers"),
        ..Config::default()
    };
    let (text, path) = run(config);
    let markers = text.lines().filter(|l| *l == "END_OF_BATCH").count();
    assert_eq!(markers, 5);
    assert_eq!(text.lines().last(), Some("END_OF_BATCH"));
    cleanup(&path);
}

#[test]
fn test_records_are_four_columns_inside_substrate_depth() {
    let config = Config {
        primary_energy: 5.0e3,
        cascade_count: 2,
        output_directory: scratch_dir("columns"),
        ..Config::default()
    };
    let (text, path) = run(config);
    for line in text.lines().filter(|l| *l != "END_OF_BATCH") {
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 4, "bad record: {:?}", line);
        for value in &fields[..3] {
            value.parse::<f64>().expect("coordinate parses");
        }
        fields[3].parse::<usize>().expect("step ordinal parses");
    }
    cleanup(&path);
}

#[test]
fn test_stopping_point_mode_writes_one_line_per_particle() {
    let config = Config {
        primary_energy: 2.0e4,
        cascade_count: 1,
        output_kind: OutputKind::StoppingPoints,
        output_directory: scratch_dir("stops"),
        ..Config::default()
    };
    let sim = Simulation::new(config).expect("valid configuration");
    let summary = sim.initiate().expect("run completes");
    let text = fs::read_to_string(&summary.output_path).unwrap();
    let records = text.lines().filter(|l| *l != "END_OF_BATCH").count();
    assert_eq!(records as u64, summary.particles);
    cleanup(&summary.output_path);
}

#[test]
fn test_electron_run_end_to_end() {
    let config = Config {
        primary_kind: PrimaryKind::Electron,
        primary_energy: 3.0e4,
        cascade_count: 2,
        num_angle_divisors: 200,
        num_flying_distances: 16,
        electron_tables: Some(Arc::new(ElectronTables::screened_rutherford(92))),
        output_kind: OutputKind::EndOfFlight,
        output_directory: scratch_dir("electron"),
        ..Config::default()
    };
    let (text, path) = run(config);
    let markers = text.lines().filter(|l| *l == "END_OF_BATCH").count();
    assert_eq!(markers, 2);
    assert!(text.lines().any(|l| l != "END_OF_BATCH"));
    cleanup(&path);
}

#[test]
fn test_damage_cascade_flag_controls_particle_count() {
    let with_damage = Config {
        cascade_count: 1,
        output_directory: scratch_dir("damage_on"),
        ..Config::default()
    };
    let without_damage = Config {
        cascade_count: 1,
        enable_damage_cascade: false,
        output_directory: scratch_dir("damage_off"),
        ..Config::default()
    };

    let sim = Simulation::new(with_damage).unwrap();
    let on = sim.initiate().unwrap();
    let sim = Simulation::new(without_damage).unwrap();
    let off = sim.initiate().unwrap();

    assert!(on.particles > 1, "100 keV He on Fe must displace atoms");
    assert_eq!(off.particles, 1);
    cleanup(&on.output_path);
    cleanup(&off.output_path);
}
