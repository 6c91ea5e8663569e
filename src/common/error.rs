//! Error handling primitives shared across the core.
//!
//! Every failure surfaces as a [`ShipError`]. Errors raised while a validation
//! run is in flight are wrapped in [`ShipError::Validation`] so the caller can
//! see which step and which dataset failed first.

use std::io;
use std::path::{Path, PathBuf};

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShipCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Configuration missing or malformed.
    Config = 1,
    /// Input file missing or not tabular.
    DataLoad = 2,
    /// A validation run failed at some step.
    Validation = 3,
    /// Local filesystem failure.
    Io = 4,
    /// Document or object store failure.
    Storage = 5,
    /// Input failed validation.
    InvalidInput = 6,
    /// Requested model artefact was not available.
    ModelMissing = 7,
    /// Catch-all for bugs and encoding failures.
    Internal = 8,
}

/// Canonical error type for the core.
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load dataset from {}: {reason}", .path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("validation failed at step `{step}`{}: {source}", dataset_suffix(.dataset))]
    Validation {
        step: &'static str,
        dataset: Option<&'static str>,
        #[source]
        source: Box<ShipError>,
    },

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("storage {op} failed for {target}: {reason}")]
    Storage {
        op: &'static str,
        target: String,
        reason: String,
    },

    #[error("drift ratio is undefined for a report with zero features")]
    EmptyDriftReport,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model artefact missing: {0}")]
    ModelMissing(String),

    #[error("encoding error: {0}")]
    Serde(String),
}

fn dataset_suffix(dataset: &Option<&'static str>) -> String {
    dataset.map(|d| format!(" on {d} set")).unwrap_or_default()
}

/// Result alias used throughout the crate.
pub type ShipResult<T> = Result<T, ShipError>;

impl ShipError {
    /// Config helper.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Data load helper.
    pub fn data_load(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::DataLoad {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Io helper keeping the offending path.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Storage helper.
    pub fn storage(op: &'static str, target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Storage {
            op,
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap `self` with the step (and optionally the dataset) of a validation run.
    pub fn at_step(self, step: &'static str, dataset: Option<&'static str>) -> Self {
        Self::Validation {
            step,
            dataset,
            source: Box::new(self),
        }
    }

    /// Machine parsable error code.
    pub fn code(&self) -> ShipCode {
        match self {
            Self::Config(_) => ShipCode::Config,
            Self::DataLoad { .. } => ShipCode::DataLoad,
            Self::Validation { .. } => ShipCode::Validation,
            Self::Io { .. } => ShipCode::Io,
            Self::Storage { .. } => ShipCode::Storage,
            Self::EmptyDriftReport | Self::InvalidInput(_) => ShipCode::InvalidInput,
            Self::ModelMissing(_) => ShipCode::ModelMissing,
            Self::Serde(_) => ShipCode::Internal,
        }
    }

    /// Innermost error, skipping any validation-step wrappers.
    pub fn root_cause(&self) -> &ShipError {
        match self {
            Self::Validation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for ShipError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for ShipError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ShipCode::Ok as u32, 0);
        assert_eq!(ShipCode::Config as u32, 1);
        assert_eq!(ShipCode::DataLoad as u32, 2);
        assert_eq!(ShipCode::Validation as u32, 3);
        assert_eq!(ShipCode::Io as u32, 4);
        assert_eq!(ShipCode::Storage as u32, 5);
        assert_eq!(ShipCode::InvalidInput as u32, 6);
        assert_eq!(ShipCode::ModelMissing as u32, 7);
        assert_eq!(ShipCode::Internal as u32, 8);
    }

    #[test]
    fn step_wrapper_keeps_context() {
        let err = ShipError::data_load("train.csv", "missing").at_step("load", Some("train"));
        assert_eq!(err.code(), ShipCode::Validation);
        assert_eq!(err.root_cause().code(), ShipCode::DataLoad);
        let msg = err.to_string();
        assert!(msg.contains("`load`"), "{msg}");
        assert!(msg.contains("on train set"), "{msg}");
        assert!(msg.contains("train.csv"), "{msg}");
    }

    #[test]
    fn step_wrapper_without_dataset() {
        let err = ShipError::EmptyDriftReport.at_step("drift", None);
        assert_eq!(
            err.to_string(),
            "validation failed at step `drift`: drift ratio is undefined for a report with zero features"
        );
    }
}
