//! Drift detection service: run the oracle, sanity-check its report and
//! persist it.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::common::error::{ShipError, ShipResult};
use crate::common::time;
use crate::data::domain::Dataset;

use super::domain::{DriftOracle, DriftReport};
use super::stattest::StatTestOracle;

/// On-disk encoding of a persisted report, chosen from the file extension.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportFormat {
    Json,
    Yaml,
}

impl ReportFormat {
    /// `.json` selects JSON; anything else is written as YAML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Yaml,
        }
    }
}

/// Compares a reference dataset with a production dataset.
#[derive(Clone, Debug, Default)]
pub struct DriftDetector<O = StatTestOracle> {
    oracle: O,
}

impl<O: DriftOracle> DriftDetector<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Compute the drift report for `production` against `reference`.
    pub fn detect(&self, reference: &Dataset, production: &Dataset) -> ShipResult<DriftReport> {
        let start = time::now_ms();
        let report = self.oracle.compute(reference, production)?;
        report.check_consistency()?;

        info!(
            reference = reference.name(),
            production = production.name(),
            n_features = report.n_features,
            n_drifted_features = report.n_drifted_features,
            dataset_drift = report.dataset_drift,
            dur_ms = time::elapsed_ms(start) as u64,
            "drift computed"
        );
        if report.dataset_drift {
            let drifted: Vec<&str> = report.drifted_features().collect();
            warn!(features = ?drifted, "dataset drift detected");
        }
        Ok(report)
    }

    /// Write `report` to `path`, creating parent directories and replacing
    /// any existing file.
    pub fn persist(&self, report: &DriftReport, path: &Path) -> ShipResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ShipError::io(parent, e))?;
        }
        // Encode fully before touching the file so write failures stay `Io`.
        let body = match ReportFormat::for_path(path) {
            ReportFormat::Json => serde_json::to_vec_pretty(report)?,
            ReportFormat::Yaml => serde_yaml::to_string(report)?.into_bytes(),
        };
        let file = File::create(path).map_err(|e| ShipError::io(path, e))?;
        let mut out = BufWriter::new(file);
        out.write_all(&body).map_err(|e| ShipError::io(path, e))?;
        out.flush().map_err(|e| ShipError::io(path, e))?;
        info!(path = %path.display(), "drift report written");
        Ok(())
    }

    /// Read a report previously written by [`DriftDetector::persist`].
    pub fn load(path: &Path) -> ShipResult<DriftReport> {
        let file = File::open(path).map_err(|e| ShipError::io(path, e))?;
        let reader = BufReader::new(file);
        let report: DriftReport = match ReportFormat::for_path(path) {
            ReportFormat::Json => serde_json::from_reader(reader)?,
            ReportFormat::Yaml => serde_yaml::from_reader(reader)?,
        };
        Ok(report)
    }

    /// Convenience for callers that only want the drifted share.
    pub fn drift_ratio(&self, reference: &Dataset, production: &Dataset) -> ShipResult<f64> {
        self.detect(reference, production)?.drift_ratio()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::domain::{Column, ColumnKind, ColumnValues};
    use crate::drift::domain::{FeatureDrift, StatTest};

    struct FixedOracle(DriftReport);

    impl DriftOracle for FixedOracle {
        fn compute(&self, _: &Dataset, _: &Dataset) -> ShipResult<DriftReport> {
            Ok(self.0.clone())
        }
    }

    fn sample() -> Dataset {
        Dataset::new(
            "train",
            vec![
                Column::new("Weight", ColumnValues::Numeric(vec![Some(1.0), Some(4.0), Some(2.0)])),
                Column::new(
                    "Material",
                    ColumnValues::Text(vec![Some("Brass".into()), Some("Clay".into()), None]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn detect_on_identical_sets_reports_no_drift() {
        let detector = DriftDetector::<StatTestOracle>::default();
        let ds = sample();
        let report = detector.detect(&ds, &ds).unwrap();
        assert!(!report.dataset_drift);
        assert_eq!(report.n_drifted_features, 0);
        assert_eq!(detector.drift_ratio(&ds, &ds).unwrap(), 0.0);
    }

    #[test]
    fn detect_rejects_inconsistent_oracle_output() {
        let mut bad = DriftReport::from_features(BTreeMap::new(), 0.5);
        bad.n_drifted_features = 2;
        let detector = DriftDetector::new(FixedOracle(bad));
        let ds = sample();
        assert!(matches!(detector.detect(&ds, &ds), Err(ShipError::InvalidInput(_))));
    }

    #[test]
    fn drift_ratio_fails_without_features() {
        let detector = DriftDetector::new(FixedOracle(DriftReport::from_features(BTreeMap::new(), 0.5)));
        let ds = sample();
        assert!(matches!(
            detector.drift_ratio(&ds, &ds),
            Err(ShipError::EmptyDriftReport)
        ));
    }

    #[test]
    fn persisted_report_round_trips_in_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let detector = DriftDetector::<StatTestOracle>::default();
        let mut per_feature = BTreeMap::new();
        per_feature.insert(
            "Price Of Sculpture".to_string(),
            FeatureDrift {
                column_type: ColumnKind::Numerical,
                stattest: StatTest::Ks,
                threshold: 0.05,
                drift_score: 0.012_345_678_9,
                drift_detected: true,
            },
        );
        per_feature.insert(
            "Transport".to_string(),
            FeatureDrift {
                column_type: ColumnKind::Categorical,
                stattest: StatTest::JensenShannon,
                threshold: 0.1,
                drift_score: 0.03,
                drift_detected: false,
            },
        );
        let report = DriftReport::from_features(per_feature, 0.5);

        for name in ["nested/report.yaml", "nested/report.json"] {
            let path = dir.path().join(name);
            detector.persist(&report, &path).unwrap();
            let back = DriftDetector::<StatTestOracle>::load(&path).unwrap();
            assert_eq!(back, report, "{name}");
        }
    }

    #[test]
    fn persist_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, "stale contents that are much longer than the report body ......").unwrap();

        let detector = DriftDetector::<StatTestOracle>::default();
        let report = DriftReport::from_features(BTreeMap::new(), 0.5);
        detector.persist(&report, &path).unwrap();
        assert_eq!(DriftDetector::<StatTestOracle>::load(&path).unwrap(), report);
    }

    #[test]
    fn persist_to_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let detector = DriftDetector::<StatTestOracle>::default();
        let report = DriftReport::from_features(BTreeMap::new(), 0.5);
        let err = detector
            .persist(&report, &blocker.join("report.yaml"))
            .unwrap_err();
        assert!(matches!(err, ShipError::Io { .. }), "{err}");
    }

    fn large_report() -> DriftReport {
        let per_feature: BTreeMap<_, _> = (0..300)
            .map(|i| {
                (
                    format!("feature_{i:03}"),
                    FeatureDrift {
                        column_type: ColumnKind::Numerical,
                        stattest: StatTest::Ks,
                        threshold: 0.05,
                        drift_score: 0.5,
                        drift_detected: false,
                    },
                )
            })
            .collect();
        DriftReport::from_features(per_feature, 0.5)
    }

    #[cfg(unix)]
    #[test]
    fn large_report_on_full_device_is_io_error() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let detector = DriftDetector::<StatTestOracle>::default();
        let report = large_report();
        for name in ["report.json", "report.yaml"] {
            // Link keeps the extension that selects the encoder.
            let dir = tempfile::tempdir().unwrap();
            let link = dir.path().join(name);
            std::os::unix::fs::symlink(full, &link).unwrap();
            let err = detector.persist(&report, &link).unwrap_err();
            assert!(matches!(err, ShipError::Io { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn large_report_to_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = DriftDetector::<StatTestOracle>::default()
            .persist(&large_report(), &blocker.join("report.json"))
            .unwrap_err();
        assert!(matches!(err, ShipError::Io { .. }), "{err}");
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ReportFormat::for_path(Path::new("a/b.JSON")), ReportFormat::Json);
        assert_eq!(ReportFormat::for_path(Path::new("a/b.yaml")), ReportFormat::Yaml);
        assert_eq!(ReportFormat::for_path(Path::new("a/b")), ReportFormat::Yaml);
    }
}
