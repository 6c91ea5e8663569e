// lib.rs - shipment-cost pipeline core

//! Shipment-cost pipeline core.
//!
//! Validates train/test splits against a schema catalog, reports statistical
//! drift between them and prices shipments with a trained cost model.

pub mod api;
pub mod common;
pub mod data;
pub mod drift;
pub mod inference;
pub mod schema;
pub mod storage;
pub mod validation;

pub use common::error::{ShipCode, ShipError, ShipResult};
pub use validation::{ValidationArtifact, ValidationOrchestrator};
