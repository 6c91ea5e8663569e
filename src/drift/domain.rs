//! Domain primitives for drift detection between a reference and a
//! production dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::error::{ShipError, ShipResult};
use crate::data::domain::{ColumnKind, Dataset};

/// Statistical test applied to one feature.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTest {
    /// Two-sample Kolmogorov–Smirnov; the score is a p-value.
    Ks,
    /// Jensen–Shannon distance over category frequencies; the score is a distance.
    JensenShannon,
}

impl StatTest {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatTest::Ks => "ks",
            StatTest::JensenShannon => "jensen_shannon",
        }
    }

    /// Whether `score` crosses `threshold` for this test.
    pub fn is_drift(&self, score: f64, threshold: f64) -> bool {
        match self {
            StatTest::Ks => score < threshold,
            StatTest::JensenShannon => score >= threshold,
        }
    }
}

/// Drift verdict for a single feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub column_type: ColumnKind,
    pub stattest: StatTest,
    pub threshold: f64,
    pub drift_score: f64,
    pub drift_detected: bool,
}

/// Structured drift report, persisted as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub n_features: usize,
    pub n_drifted_features: usize,
    pub share_of_drifted_features: f64,
    /// Share of drifted features at or above which `dataset_drift` is set.
    pub drift_share: f64,
    pub dataset_drift: bool,
    pub per_feature: BTreeMap<String, FeatureDrift>,
}

impl DriftReport {
    /// Fold per-feature verdicts into a report: the dataset drifted when at
    /// least `drift_share` of the features did.
    pub fn from_features(per_feature: BTreeMap<String, FeatureDrift>, drift_share: f64) -> Self {
        let n_features = per_feature.len();
        let n_drifted_features = per_feature.values().filter(|f| f.drift_detected).count();
        let share_of_drifted_features = if n_features == 0 {
            0.0
        } else {
            n_drifted_features as f64 / n_features as f64
        };
        Self {
            n_features,
            n_drifted_features,
            share_of_drifted_features,
            drift_share,
            dataset_drift: n_features > 0 && share_of_drifted_features >= drift_share,
            per_feature,
        }
    }

    /// `n_drifted_features / n_features`; undefined for an empty report.
    pub fn drift_ratio(&self) -> ShipResult<f64> {
        if self.n_features == 0 {
            return Err(ShipError::EmptyDriftReport);
        }
        Ok(self.n_drifted_features as f64 / self.n_features as f64)
    }

    /// Names of the features flagged as drifted.
    pub fn drifted_features(&self) -> impl Iterator<Item = &str> {
        self.per_feature
            .iter()
            .filter(|(_, f)| f.drift_detected)
            .map(|(name, _)| name.as_str())
    }

    /// Check the counters agree with the per-feature map.
    pub fn check_consistency(&self) -> ShipResult<()> {
        if self.n_drifted_features > self.n_features {
            return Err(ShipError::invalid(format!(
                "drift report claims {} drifted of {} features",
                self.n_drifted_features, self.n_features
            )));
        }
        if self.n_features != self.per_feature.len() {
            return Err(ShipError::invalid(format!(
                "drift report counts {} features but lists {}",
                self.n_features,
                self.per_feature.len()
            )));
        }
        let flagged = self.per_feature.values().filter(|f| f.drift_detected).count();
        if flagged != self.n_drifted_features {
            return Err(ShipError::invalid(format!(
                "drift report counts {} drifted features but flags {flagged}",
                self.n_drifted_features
            )));
        }
        Ok(())
    }
}

/// Statistical capability that compares two datasets feature by feature.
pub trait DriftOracle: Send + Sync {
    fn compute(&self, reference: &Dataset, production: &Dataset) -> ShipResult<DriftReport>;
}
