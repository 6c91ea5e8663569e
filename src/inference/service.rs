//! Prediction service: resolve the cost model and price dataset rows.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::common::config::AppCfg;
use crate::common::error::{ShipError, ShipResult};
use crate::common::time;
use crate::data::domain::Dataset;

use super::domain::{CostModel, FallbackCostModel, LinearCostModel};

enum ModelSource {
    /// Read on every call so a freshly trained artefact is picked up.
    // TODO: cache the parsed model keyed by file mtime to skip re-reading unchanged artefacts.
    File(PathBuf),
    Loaded(Arc<dyn CostModel>),
}

/// Prices shipments with the trained artefact, or the fallback rule when
/// no artefact has been written yet.
pub struct CostPredictor {
    source: ModelSource,
}

impl CostPredictor {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::File(model_path.into()),
        }
    }

    pub fn from_app(cfg: &AppCfg) -> Self {
        Self::new(&cfg.model_path)
    }

    /// Predictor bound to an already loaded model.
    pub fn with_model(model: Arc<dyn CostModel>) -> Self {
        Self {
            source: ModelSource::Loaded(model),
        }
    }

    /// Resolve the model this predictor would use right now.
    pub fn model(&self) -> ShipResult<Arc<dyn CostModel>> {
        match &self.source {
            ModelSource::Loaded(model) => Ok(Arc::clone(model)),
            ModelSource::File(path) if !path.exists() => {
                info!(path = %path.display(), "no trained model, using fallback pricing");
                Ok(Arc::new(FallbackCostModel))
            }
            ModelSource::File(path) => Ok(Arc::new(load_linear(path)?)),
        }
    }

    /// Price the first row of `dataset`.
    pub fn predict(&self, dataset: &Dataset) -> ShipResult<f64> {
        if dataset.n_rows() == 0 {
            return Err(ShipError::invalid("cannot predict on an empty dataset"));
        }
        let start = time::now_ms();
        let model = self.model()?;
        let cost = model.predict_row(dataset, 0)?;
        info!(
            model = model.name(),
            cost,
            dur_ms = time::elapsed_ms(start) as u64,
            "prediction complete"
        );
        Ok(cost)
    }

    /// Price every row of `dataset`, resolving the model once.
    pub fn batch_predict(&self, dataset: &Dataset) -> ShipResult<Vec<f64>> {
        let model = self.model()?;
        let costs = (0..dataset.n_rows())
            .map(|row| model.predict_row(dataset, row))
            .collect::<ShipResult<Vec<_>>>()?;
        debug!(model = model.name(), rows = costs.len(), "batch prediction complete");
        Ok(costs)
    }
}

fn load_linear(path: &Path) -> ShipResult<LinearCostModel> {
    let raw = fs::read_to_string(path).map_err(|e| ShipError::io(path, e))?;
    let model: LinearCostModel = serde_json::from_str(&raw)?;
    debug!(
        path = %path.display(),
        numeric_terms = model.numeric.len(),
        categorical_terms = model.categorical.len(),
        "loaded linear cost model"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::service::read_csv_from;

    const ROWS: &str = "\
Weight,Base Shipping Price,International,Express Shipment,Fragile
10,2,Yes,No,No
4,5,No,No,Yes
";

    fn rows() -> Dataset {
        read_csv_from(ROWS.as_bytes(), "batch").unwrap()
    }

    #[test]
    fn missing_artefact_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = CostPredictor::new(dir.path().join("model.json"));
        assert_eq!(predictor.model().unwrap().name(), "fallback");
        assert!((predictor.predict(&rows()).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn batch_prices_every_row() {
        let predictor = CostPredictor::with_model(Arc::new(FallbackCostModel));
        let costs = predictor.batch_predict(&rows()).unwrap();
        assert_eq!(costs.len(), 2);
        assert!((costs[0] - 30.0).abs() < 1e-9);
        assert!((costs[1] - 24.0).abs() < 1e-9);
    }

    #[test]
    fn trained_artefact_is_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, r#"{"intercept": 1.5, "numeric": {"Weight": 2.0}}"#).unwrap();

        let predictor = CostPredictor::new(&path);
        assert_eq!(predictor.model().unwrap().name(), "linear");
        assert_eq!(predictor.predict(&rows()).unwrap(), 21.5);
    }

    #[test]
    fn corrupt_artefact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "not json").unwrap();
        let err = CostPredictor::new(&path).predict(&rows()).unwrap_err();
        assert!(matches!(err, ShipError::Serde(_)), "{err}");
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let predictor = CostPredictor::with_model(Arc::new(FallbackCostModel));
        let empty = Dataset::new("empty", Vec::new()).unwrap();
        assert!(matches!(predictor.predict(&empty), Err(ShipError::InvalidInput(_))));
        assert!(predictor.batch_predict(&empty).unwrap().is_empty());
    }
}
