//! Validation orchestration: load the train/test split, check both against
//! the schema catalog, detect drift once and fold everything into a verdict.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use crate::common::config::ValidationConfig;
use crate::common::error::{ShipError, ShipResult};
use crate::common::time;
use crate::data::domain::Dataset;
use crate::data::service::read_csv;
use crate::drift::{DriftDetector, DriftOracle, StatTestOracle};
use crate::schema::{SchemaCheckResult, SchemaValidator};

use super::domain::{DatasetRole, RunState, Step, ValidationArtifact};

/// Per-run bookkeeping: current state plus the intermediate results.
#[derive(Clone, Debug)]
pub struct ValidationRun {
    state: RunState,
    history: Vec<RunState>,
    started_ms: u128,
    train_checks: Option<SchemaCheckResult>,
    test_checks: Option<SchemaCheckResult>,
    dataset_drift: Option<bool>,
}

impl Default for ValidationRun {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationRun {
    pub fn new() -> Self {
        Self {
            state: RunState::Init,
            history: vec![RunState::Init],
            started_ms: time::now_ms(),
            train_checks: None,
            test_checks: None,
            dataset_drift: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state the run has been in, oldest first.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn train_checks(&self) -> Option<SchemaCheckResult> {
        self.train_checks
    }

    pub fn test_checks(&self) -> Option<SchemaCheckResult> {
        self.test_checks
    }

    pub fn dataset_drift(&self) -> Option<bool> {
        self.dataset_drift
    }

    /// Fails the run unless `step` may run from the current state.
    fn expect_step(&mut self, step: Step) -> ShipResult<RunState> {
        match self.state.after(step) {
            Some(next) => Ok(next),
            None => {
                let err = ShipError::invalid(format!(
                    "step `{}` cannot run from state `{}`",
                    step.as_str(),
                    self.state.as_str()
                ));
                Err(self.fail(step, None, err))
            }
        }
    }

    fn advance(&mut self, step: Step) -> ShipResult<()> {
        let next = self.expect_step(step)?;
        info!(
            step = step.as_str(),
            from = self.state.as_str(),
            to = next.as_str(),
            elapsed_ms = time::elapsed_ms(self.started_ms) as u64,
            "validation step complete"
        );
        self.enter(next);
        Ok(())
    }

    fn fail(&mut self, step: Step, dataset: Option<DatasetRole>, err: ShipError) -> ShipError {
        let dataset = dataset.map(|d| d.as_str());
        error!(step = step.as_str(), dataset, error = %err, "validation run failed");
        self.enter(RunState::Failed);
        err.at_step(step.as_str(), dataset)
    }

    fn enter(&mut self, state: RunState) {
        self.state = state;
        self.history.push(state);
    }
}

/// Runs the validation stage. Holds no per-run state, so one orchestrator
/// may serve concurrent runs as long as they write different report paths.
#[derive(Clone, Debug)]
pub struct ValidationOrchestrator<O = StatTestOracle> {
    config: ValidationConfig,
    validator: SchemaValidator,
    detector: DriftDetector<O>,
}

impl ValidationOrchestrator<StatTestOracle> {
    /// Orchestrator using the default statistical oracle tuned by `config.drift`.
    pub fn new(config: ValidationConfig) -> Self {
        let oracle = StatTestOracle::new(config.drift);
        Self::with_oracle(config, oracle)
    }
}

impl<O: DriftOracle> ValidationOrchestrator<O> {
    pub fn with_oracle(config: ValidationConfig, oracle: O) -> Self {
        Self {
            validator: SchemaValidator::new(config.catalog.clone()),
            detector: DriftDetector::new(oracle),
            config,
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate the split at `train_path` / `test_path`.
    pub fn run(&self, train_path: &Path, test_path: &Path) -> ShipResult<ValidationArtifact> {
        let mut run = ValidationRun::new();
        self.execute(&mut run, train_path, test_path)
    }

    /// Like [`ValidationOrchestrator::run`], recording progress into `run`
    /// so the caller can inspect it afterwards, whichever way it ended.
    pub fn execute(
        &self,
        run: &mut ValidationRun,
        train_path: &Path,
        test_path: &Path,
    ) -> ShipResult<ValidationArtifact> {
        info!(
            train = %train_path.display(),
            test = %test_path.display(),
            "validation run started"
        );

        // A run is single use; reject it before touching the filesystem.
        run.expect_step(Step::Load)?;
        let (train, test) = self.load(run, train_path, test_path)?;
        run.advance(Step::Load)?;

        let train_checks = self.check_schema(&train, DatasetRole::Train);
        let test_checks = self.check_schema(&test, DatasetRole::Test);
        run.train_checks = Some(train_checks);
        run.test_checks = Some(test_checks);
        run.advance(Step::SchemaCheck)?;

        let report = self
            .detector
            .detect(&train, &test)
            .map_err(|e| run.fail(Step::DriftCheck, None, e))?;
        self.detector
            .persist(&report, &self.config.drift_report_path)
            .map_err(|e| run.fail(Step::DriftCheck, None, e))?;
        run.dataset_drift = Some(report.dataset_drift);
        run.advance(Step::DriftCheck)?;

        // Drift present invalidates the run just like a failed schema check.
        let validation_status =
            train_checks.is_valid() && test_checks.is_valid() && !report.dataset_drift;
        if validation_status {
            info!("dataset schema validation completed");
        } else {
            warn!(
                train_schema_valid = train_checks.is_valid(),
                test_schema_valid = test_checks.is_valid(),
                dataset_drift = report.dataset_drift,
                "dataset failed validation"
            );
        }
        run.advance(Step::Verdict)?;

        Ok(ValidationArtifact {
            drift_report_path: self.config.drift_report_path.clone(),
            validation_status,
        })
    }

    fn load(
        &self,
        run: &mut ValidationRun,
        train_path: &Path,
        test_path: &Path,
    ) -> ShipResult<(Dataset, Dataset)> {
        let train = read_csv(train_path, DatasetRole::Train.as_str())
            .map_err(|e| run.fail(Step::Load, Some(DatasetRole::Train), e))?;
        let test = read_csv(test_path, DatasetRole::Test.as_str())
            .map_err(|e| run.fail(Step::Load, Some(DatasetRole::Test), e))?;

        let dir = &self.config.artifacts_dir;
        fs::create_dir_all(dir)
            .map_err(|e| run.fail(Step::Load, None, ShipError::io(dir, e)))?;
        info!(dir = %dir.display(), "validation artifacts directory ready");
        Ok((train, test))
    }

    fn check_schema(&self, dataset: &Dataset, role: DatasetRole) -> SchemaCheckResult {
        let result = self.validator.check(dataset);
        info!(
            dataset = role.as_str(),
            columns_match = result.column_count_matches,
            has_numerical = result.has_numerical_column,
            has_categorical = result.has_categorical_column,
            "schema checked"
        );
        result
    }
}
