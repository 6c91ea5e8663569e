use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shipcost::common::config::{DriftSettings, ValidationConfig};
use shipcost::data::{read_csv, write_csv, DocumentStore, FsDocumentStore};
use shipcost::drift::{DriftDetector, StatTestOracle};
use shipcost::inference::INPUT_COLUMNS;
use shipcost::schema::SchemaCatalog;
use shipcost::validation::{RunState, ValidationOrchestrator, ValidationRun};

const MATERIALS: [&str; 5] = ["Brass", "Clay", "Aluminium", "Wood", "Stone"];
const TRANSPORTS: [&str; 3] = ["Airways", "Roadways", "Waterways"];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Shipment rows with all 14 input columns. `shift` moves every numeric
/// column and pins two categorical columns to a single level.
fn shipments(rows: usize, shift: Option<f64>) -> String {
    let mut out = INPUT_COLUMNS.join(",");
    out.push('\n');
    for i in 0..rows {
        let offset = shift.unwrap_or(0.0);
        let material = if shift.is_some() { "Marble" } else { MATERIALS[i % MATERIALS.len()] };
        let transport = if shift.is_some() { "Rail" } else { TRANSPORTS[i % TRANSPORTS.len()] };
        let line = [
            format!("{:.2}", 0.1 + (i % 10) as f64 * 0.05 + offset),
            format!("{}", 10.0 + (i % 7) as f64 + offset),
            format!("{}", 3.0 + (i % 5) as f64 + offset),
            format!("{}", 100.0 + ((i * 13) % 400) as f64 + offset),
            material.to_string(),
            format!("{:.1}", 5.0 + i as f64 * 1.5 + offset),
            format!("{}", 10.0 + (i % 9) as f64 + offset),
            yes_no(i % 2 == 0).to_string(),
            yes_no(i % 3 == 0).to_string(),
            yes_no(i % 4 == 0).to_string(),
            transport.to_string(),
            yes_no(i % 5 == 0).to_string(),
            if i % 2 == 0 { "Working Class" } else { "Wealthy" }.to_string(),
            yes_no(i % 6 == 0).to_string(),
        ];
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn catalog() -> Arc<SchemaCatalog> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join("schema.yaml");
    Arc::new(SchemaCatalog::load(path).unwrap())
}

fn config(root: &Path, catalog: Arc<SchemaCatalog>) -> ValidationConfig {
    ValidationConfig {
        catalog,
        drift_report_path: root.join("data_validation").join("drift_report.yaml"),
        artifacts_dir: root.join("data_validation"),
        drift: DriftSettings::default(),
    }
}

fn write(root: &Path, name: &str, body: &str) -> PathBuf {
    let path = root.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn shipped_schema_matches_prediction_input() {
    let catalog = catalog();
    assert_eq!(catalog.all_columns(), INPUT_COLUMNS);
    assert_eq!(catalog.numerical_columns().len(), 6);
    assert_eq!(catalog.categorical_columns().len(), 8);
}

#[test]
fn clean_split_passes_and_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.csv", &shipments(40, None));
    let test = write(dir.path(), "test.csv", &shipments(40, None));
    let cfg = config(dir.path(), catalog());

    let mut run = ValidationRun::new();
    let artifact = ValidationOrchestrator::new(cfg.clone())
        .execute(&mut run, &train, &test)
        .unwrap();

    assert!(artifact.validation_status);
    assert_eq!(artifact.drift_report_path, cfg.drift_report_path);
    assert_eq!(run.state(), RunState::Done);

    let report = DriftDetector::<StatTestOracle>::load(&artifact.drift_report_path).unwrap();
    assert_eq!(report.n_features, 14);
    assert_eq!(report.n_drifted_features, 0);
    assert!(!report.dataset_drift);
}

#[test]
fn drifted_split_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.csv", &shipments(40, None));
    let test = write(dir.path(), "test.csv", &shipments(40, Some(1000.0)));

    let artifact = ValidationOrchestrator::new(config(dir.path(), catalog()))
        .run(&train, &test)
        .unwrap();
    assert!(!artifact.validation_status);

    let report = DriftDetector::<StatTestOracle>::load(&artifact.drift_report_path).unwrap();
    assert!(report.dataset_drift);
    assert!(report.n_drifted_features >= 8, "{report:?}");
    assert!(report.per_feature["Weight"].drift_detected);
    assert!(report.per_feature["Material"].drift_detected);
    assert!(!report.per_feature["Fragile"].drift_detected);
}

#[test]
fn split_exported_from_document_store_validates() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsDocumentStore::at(dir.path().join("documents"));
    let raw = write(dir.path(), "raw.csv", &shipments(60, None));
    let raw = read_csv(&raw, "shipments").unwrap();
    store.insert_dataset_as_records(&raw, "shipping", "shipments").unwrap();

    let exported = store.get_collection_as_dataset("shipping", "shipments").unwrap();
    assert_eq!(exported.n_rows(), 60);
    let train = dir.path().join("ingested").join("train.csv");
    let test = dir.path().join("ingested").join("test.csv");
    write_csv(&exported, &train).unwrap();
    write_csv(&exported, &test).unwrap();

    let artifact = ValidationOrchestrator::new(config(dir.path(), catalog()))
        .run(&train, &test)
        .unwrap();
    assert!(artifact.validation_status);
}

#[test]
fn concurrent_runs_share_one_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.csv", &shipments(30, None));
    let test = write(dir.path(), "test.csv", &shipments(30, None));
    let shared = catalog();

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let cfg = config(&dir.path().join(format!("run-{i}")), Arc::clone(&shared));
            let (train, test) = (train.clone(), test.clone());
            std::thread::spawn(move || ValidationOrchestrator::new(cfg).run(&train, &test))
        })
        .collect();

    for handle in handles {
        let artifact = handle.join().unwrap().unwrap();
        assert!(artifact.validation_status);
        assert!(artifact.drift_report_path.exists());
    }
}
