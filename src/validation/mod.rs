//! Validation stage: schema checks plus drift detection folded into one
//! verdict for the train/test split.

pub mod domain;
pub mod service;

pub use domain::{DatasetRole, RunState, Step, ValidationArtifact};
pub use service::{ValidationOrchestrator, ValidationRun};
