//! Inference domain providing single and batch cost prediction.

pub mod domain;
pub mod service;

pub use domain::{CostModel, FallbackCostModel, LinearCostModel, ShippingData, INPUT_COLUMNS};
pub use service::CostPredictor;
