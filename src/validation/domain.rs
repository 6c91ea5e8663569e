//! Validation run states and the artifact handed to the next pipeline stage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle of one validation run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunState {
    Init,
    Loaded,
    SchemaChecked,
    DriftChecked,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Loaded => "loaded",
            RunState::SchemaChecked => "schema_checked",
            RunState::DriftChecked => "drift_checked",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    /// The state a successful `step` leads to from `self`, if that step may
    /// run now.
    pub fn after(self, step: Step) -> Option<RunState> {
        match (self, step) {
            (RunState::Init, Step::Load) => Some(RunState::Loaded),
            (RunState::Loaded, Step::SchemaCheck) => Some(RunState::SchemaChecked),
            (RunState::SchemaChecked, Step::DriftCheck) => Some(RunState::DriftChecked),
            (RunState::DriftChecked, Step::Verdict) => Some(RunState::Done),
            _ => None,
        }
    }
}

/// The transitions of a run, named for error context.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Load,
    SchemaCheck,
    DriftCheck,
    Verdict,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Load => "load",
            Step::SchemaCheck => "schema_check",
            Step::DriftCheck => "drift_check",
            Step::Verdict => "verdict",
        }
    }
}

/// Which split a dataset plays in the run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DatasetRole {
    Train,
    Test,
}

impl DatasetRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetRole::Train => "train",
            DatasetRole::Test => "test",
        }
    }
}

/// Outcome of a completed run, consumed by model training.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    pub drift_report_path: PathBuf,
    pub validation_status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut state = RunState::Init;
        for step in [Step::Load, Step::SchemaCheck, Step::DriftCheck, Step::Verdict] {
            state = state.after(step).unwrap();
        }
        assert_eq!(state, RunState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn steps_cannot_be_skipped_or_repeated() {
        assert_eq!(RunState::Init.after(Step::DriftCheck), None);
        assert_eq!(RunState::Loaded.after(Step::Load), None);
        assert_eq!(RunState::Failed.after(Step::Verdict), None);
        assert_eq!(RunState::Done.after(Step::Load), None);
    }

    #[test]
    fn artifact_serialises_plain_fields() {
        let artifact = ValidationArtifact {
            drift_report_path: PathBuf::from("artifacts/data_validation/drift_report.yaml"),
            validation_status: true,
        };
        let json = serde_json::to_string(&artifact).unwrap();
        assert_eq!(
            json,
            r#"{"drift_report_path":"artifacts/data_validation/drift_report.yaml","validation_status":true}"#
        );
    }
}
