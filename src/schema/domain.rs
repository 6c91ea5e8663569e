//! Expected dataset layout and the outcome of checking a dataset against it.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::{ShipError, ShipResult};

/// One entry under `columns:`. Either a bare name or a `{name: dtype}` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnEntry {
    Name(String),
    Typed(std::collections::BTreeMap<String, serde_yaml::Value>),
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    columns: Vec<ColumnEntry>,
    numerical_columns: Vec<String>,
    categorical_columns: Vec<String>,
}

/// What a valid dataset looks like. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaCatalog {
    all_columns: Vec<String>,
    numerical_columns: BTreeSet<String>,
    categorical_columns: BTreeSet<String>,
}

impl SchemaCatalog {
    /// Build a catalog directly, applying the same checks as [`SchemaCatalog::load`].
    pub fn new<I, N, C>(all_columns: I, numerical: N, categorical: C) -> ShipResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let catalog = Self {
            all_columns: all_columns.into_iter().map(Into::into).collect(),
            numerical_columns: numerical.into_iter().map(Into::into).collect(),
            categorical_columns: categorical.into_iter().map(Into::into).collect(),
        };
        catalog.check()?;
        Ok(catalog)
    }

    /// Read the catalog from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> ShipResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ShipError::config(format!("cannot read schema {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            ShipError::Config(msg) => ShipError::config(format!("schema {}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse the catalog from YAML text with keys `columns`,
    /// `numerical_columns` and `categorical_columns`.
    pub fn from_yaml_str(raw: &str) -> ShipResult<Self> {
        let parsed: RawCatalog = serde_yaml::from_str(raw)
            .map_err(|e| ShipError::config(format!("malformed schema: {e}")))?;

        let mut all_columns = Vec::with_capacity(parsed.columns.len());
        for entry in parsed.columns {
            match entry {
                ColumnEntry::Name(name) => all_columns.push(name),
                ColumnEntry::Typed(map) if map.len() == 1 => {
                    all_columns.extend(map.into_keys());
                }
                ColumnEntry::Typed(map) => {
                    return Err(ShipError::config(format!(
                        "column entry must name exactly one column, got {} keys",
                        map.len()
                    )));
                }
            }
        }

        Self::new(
            all_columns,
            parsed.numerical_columns,
            parsed.categorical_columns,
        )
    }

    fn check(&self) -> ShipResult<()> {
        if self.all_columns.is_empty() {
            return Err(ShipError::config("schema lists no columns"));
        }
        let mut seen = BTreeSet::new();
        for name in &self.all_columns {
            if name.trim().is_empty() {
                return Err(ShipError::config("schema contains an empty column name"));
            }
            if !seen.insert(name.as_str()) {
                return Err(ShipError::config(format!("column `{name}` listed twice")));
            }
        }
        for (group, names) in [
            ("numerical_columns", &self.numerical_columns),
            ("categorical_columns", &self.categorical_columns),
        ] {
            if let Some(stray) = names.iter().find(|n| !seen.contains(n.as_str())) {
                return Err(ShipError::config(format!(
                    "{group} entry `{stray}` is not listed under columns"
                )));
            }
        }
        Ok(())
    }

    pub fn all_columns(&self) -> &[String] {
        &self.all_columns
    }

    pub fn numerical_columns(&self) -> &BTreeSet<String> {
        &self.numerical_columns
    }

    pub fn categorical_columns(&self) -> &BTreeSet<String> {
        &self.categorical_columns
    }
}

/// Three schema checks for one dataset.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SchemaCheckResult {
    pub column_count_matches: bool,
    pub has_numerical_column: bool,
    pub has_categorical_column: bool,
}

impl SchemaCheckResult {
    pub fn is_valid(&self) -> bool {
        self.column_count_matches && self.has_numerical_column && self.has_categorical_column
    }
}
