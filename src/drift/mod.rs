//! Drift detection between a reference (train) and a production (test) dataset.

pub mod domain;
pub mod service;
pub mod stattest;

pub use domain::{DriftOracle, DriftReport, FeatureDrift, StatTest};
pub use service::{DriftDetector, ReportFormat};
pub use stattest::StatTestOracle;
