//! Runtime configuration loaded from environment and optional YAML files.
//!
//! [`AppCfg`] is the raw snapshot; [`ValidationConfig`] is what the validation
//! stage consumes once the schema catalog has been loaded from it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::error::{ShipError, ShipResult};
use crate::schema::SchemaCatalog;

/// Output format for the log subscriber.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> ShipResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ShipError::config(format!("unknown log format `{other}`"))),
        }
    }
}

/// Thresholds used by the default drift oracle.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftSettings {
    /// Kolmogorov–Smirnov p-value below which a numeric column drifted.
    pub ks_threshold: f64,
    /// Jensen–Shannon distance at or above which a categorical column drifted.
    pub js_threshold: f64,
    /// Share of drifted columns at or above which the whole dataset drifted.
    pub drift_share: f64,
}

impl Default for DriftSettings {
    fn default() -> Self {
        Self {
            ks_threshold: 0.05,
            js_threshold: 0.1,
            drift_share: 0.5,
        }
    }
}

impl DriftSettings {
    pub fn validate(&self) -> ShipResult<()> {
        if !(self.ks_threshold > 0.0 && self.ks_threshold < 1.0) {
            return Err(ShipError::config(format!(
                "ks_threshold must be in (0, 1), got {}",
                self.ks_threshold
            )));
        }
        if !(self.js_threshold > 0.0 && self.js_threshold <= 1.0) {
            return Err(ShipError::config(format!(
                "js_threshold must be in (0, 1], got {}",
                self.js_threshold
            )));
        }
        if !(self.drift_share > 0.0 && self.drift_share <= 1.0) {
            return Err(ShipError::config(format!(
                "drift_share must be in (0, 1], got {}",
                self.drift_share
            )));
        }
        Ok(())
    }
}

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppCfg {
    /// Root directory for every artefact the pipeline writes.
    pub artifact_root: PathBuf,
    /// YAML file describing the expected dataset schema.
    pub schema_path: PathBuf,
    /// Where the drift report is persisted.
    pub drift_report_path: PathBuf,
    /// Trained regression artefact used for prediction.
    pub model_path: PathBuf,
    /// Root of the filesystem document store.
    pub document_root: PathBuf,
    /// Root of the filesystem object store (one directory per bucket).
    pub object_root: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    pub drift: DriftSettings,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self::under("artifacts")
    }
}

/// Values set explicitly by a config file or the environment. Anything left
/// unset is derived from the artifact root once every source is applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CfgOverrides {
    artifact_root: Option<PathBuf>,
    schema_path: Option<PathBuf>,
    drift_report_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    document_root: Option<PathBuf>,
    object_root: Option<PathBuf>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
    drift: Option<DriftSettings>,
}

impl CfgOverrides {
    fn apply_env<F>(&mut self, lookup: F) -> ShipResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).map(PathBuf::from);
        if let Some(root) = path("SHIPCOST_ARTIFACT_ROOT") {
            self.artifact_root = Some(root);
        }
        if let Some(p) = path("SHIPCOST_SCHEMA_PATH") {
            self.schema_path = Some(p);
        }
        if let Some(p) = path("SHIPCOST_DRIFT_REPORT_PATH") {
            self.drift_report_path = Some(p);
        }
        if let Some(p) = path("SHIPCOST_MODEL_PATH") {
            self.model_path = Some(p);
        }
        if let Some(p) = path("SHIPCOST_DOCUMENT_ROOT") {
            self.document_root = Some(p);
        }
        if let Some(p) = path("SHIPCOST_OBJECT_ROOT") {
            self.object_root = Some(p);
        }
        if let Some(level) = lookup("SHIPCOST_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(format) = lookup("SHIPCOST_LOG_FORMAT") {
            self.log_format = Some(LogFormat::parse(&format)?);
        }
        Ok(())
    }

    fn resolve(self) -> AppCfg {
        let base = match self.artifact_root {
            Some(root) => AppCfg::under(root),
            None => AppCfg::default(),
        };
        AppCfg {
            schema_path: self.schema_path.unwrap_or(base.schema_path),
            drift_report_path: self.drift_report_path.unwrap_or(base.drift_report_path),
            model_path: self.model_path.unwrap_or(base.model_path),
            document_root: self.document_root.unwrap_or(base.document_root),
            object_root: self.object_root.unwrap_or(base.object_root),
            log_level: self.log_level.unwrap_or(base.log_level),
            log_format: self.log_format.unwrap_or(base.log_format),
            drift: self.drift.unwrap_or(base.drift),
            artifact_root: base.artifact_root,
        }
    }
}

impl AppCfg {
    /// Defaults with every artefact path placed under `artifact_root`.
    pub fn under(artifact_root: impl Into<PathBuf>) -> Self {
        let artifact_root = artifact_root.into();
        Self {
            schema_path: PathBuf::from("config").join("schema.yaml"),
            drift_report_path: artifact_root
                .join("data_validation")
                .join("drift_report.yaml"),
            model_path: artifact_root.join("model_trainer").join("model.json"),
            document_root: artifact_root.join("documents"),
            object_root: artifact_root.join("buckets"),
            artifact_root,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            drift: DriftSettings::default(),
        }
    }

    /// Create a configuration snapshot from the process environment.
    pub fn load() -> ShipResult<Self> {
        Self::resolve(CfgOverrides::default(), |key| env::var(key).ok())
    }

    /// Read a YAML configuration file; environment variables still override it.
    pub fn from_file(path: impl AsRef<Path>) -> ShipResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ShipError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let file = Self::parse_overrides(&raw)
            .map_err(|e| ShipError::config(format!("config {}: {e}", path.display())))?;
        Self::resolve(file, |key| env::var(key).ok())
    }

    fn parse_overrides(raw: &str) -> Result<CfgOverrides, serde_yaml::Error> {
        // An empty file is a valid "all defaults" config.
        if raw.trim().is_empty() {
            return Ok(CfgOverrides::default());
        }
        serde_yaml::from_str(raw)
    }

    fn resolve<F>(mut overrides: CfgOverrides, lookup: F) -> ShipResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        overrides.apply_env(lookup)?;
        let cfg = overrides.resolve();
        cfg.drift.validate()?;
        Ok(cfg)
    }

    /// Directory that holds validation outputs.
    pub fn validation_dir(&self) -> PathBuf {
        self.artifact_root.join("data_validation")
    }
}

/// Everything the validation stage needs for a run.
#[derive(Clone, Debug)]
pub struct ValidationConfig {
    pub catalog: Arc<SchemaCatalog>,
    pub drift_report_path: PathBuf,
    pub artifacts_dir: PathBuf,
    pub drift: DriftSettings,
}

impl ValidationConfig {
    /// Load the schema catalog named by `cfg` and bundle it with the report paths.
    pub fn from_app(cfg: &AppCfg) -> ShipResult<Self> {
        let catalog = SchemaCatalog::load(&cfg.schema_path)?;
        Ok(Self {
            catalog: Arc::new(catalog),
            drift_report_path: cfg.drift_report_path.clone(),
            artifacts_dir: cfg.validation_dir(),
            drift: cfg.drift,
        })
    }
}
