//! Dataset schema: the expected column catalog and the validator that checks
//! datasets against it.

pub mod domain;
pub mod service;

pub use domain::{SchemaCatalog, SchemaCheckResult};
pub use service::SchemaValidator;
