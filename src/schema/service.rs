//! Schema conformance checks for a single dataset.
//!
//! `columns_match` compares column *counts* only: a dataset with the right
//! number of wrongly named columns passes it. The presence checks below are
//! what catch a dataset that shares no names with the catalog.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::data::domain::Dataset;

use super::domain::{SchemaCatalog, SchemaCheckResult};

/// Stateless validator bound to a shared catalog.
#[derive(Clone, Debug)]
pub struct SchemaValidator {
    catalog: Arc<SchemaCatalog>,
}

impl SchemaValidator {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// True iff the dataset has as many columns as the catalog lists.
    pub fn columns_match(&self, dataset: &Dataset) -> bool {
        let expected = self.catalog.all_columns().len();
        let matches = dataset.n_columns() == expected;
        debug!(
            dataset = dataset.name(),
            found = dataset.n_columns(),
            expected,
            matches,
            "column count check"
        );
        matches
    }

    /// True iff at least one catalog numerical column is present.
    pub fn has_any_numerical_column(&self, dataset: &Dataset) -> bool {
        any_present(dataset, self.catalog.numerical_columns(), "numerical")
    }

    /// True iff at least one catalog categorical column is present.
    pub fn has_any_categorical_column(&self, dataset: &Dataset) -> bool {
        any_present(dataset, self.catalog.categorical_columns(), "categorical")
    }

    /// Run all three checks against `dataset`.
    pub fn check(&self, dataset: &Dataset) -> SchemaCheckResult {
        SchemaCheckResult {
            column_count_matches: self.columns_match(dataset),
            has_numerical_column: self.has_any_numerical_column(dataset),
            has_categorical_column: self.has_any_categorical_column(dataset),
        }
    }
}

// Every expected column is visited so each absent one gets its own log line.
fn any_present(dataset: &Dataset, expected: &BTreeSet<String>, group: &'static str) -> bool {
    let mut found = false;
    for column in expected {
        if dataset.contains_column(column) {
            found = true;
        } else {
            info!(dataset = dataset.name(), group, column = %column, "expected column not found");
        }
    }
    found
}
