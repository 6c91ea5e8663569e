//! Core dataset definitions and contracts.
//!
//! A [`Dataset`] is an immutable rectangular table: every column holds the
//! same number of cells, and each column is either numeric or text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::error::{ShipError, ShipResult};

/// Cell markers treated as missing when reading delimited text.
pub const MISSING_MARKERS: &[&str] = &[
    "", "na", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None",
];

/// Whether a raw cell should be read as a missing value.
pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

/// Broad statistical type of a column.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numerical,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numerical => "numerical",
            ColumnKind::Categorical => "categorical",
        }
    }
}

/// Cells of a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Numeric(_) => ColumnKind::Numerical,
            ColumnValues::Text(_) => ColumnKind::Categorical,
        }
    }

    /// Infer the column type from raw text cells: numeric iff every
    /// non-missing cell parses as `f64`.
    pub fn infer(raw: Vec<Option<String>>) -> Self {
        let numeric = raw
            .iter()
            .flatten()
            .all(|cell| cell.trim().parse::<f64>().is_ok());
        if numeric {
            ColumnValues::Numeric(
                raw.iter()
                    .map(|cell| cell.as_ref().and_then(|c| c.trim().parse().ok()))
                    .collect(),
            )
        } else {
            ColumnValues::Text(raw)
        }
    }

    /// Cell `row` rendered as text, `None` when missing or out of range.
    pub fn text_at(&self, row: usize) -> Option<String> {
        match self {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(|x| x.to_string()),
            ColumnValues::Text(v) => v.get(row).cloned().flatten(),
        }
    }

    /// Cell `row` as a number; text cells are parsed when possible.
    pub fn number_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten(),
            ColumnValues::Text(v) => v
                .get(row)
                .and_then(|c| c.as_deref())
                .and_then(|c| c.trim().parse().ok()),
        }
    }

    fn json_at(&self, row: usize) -> Value {
        match self {
            ColumnValues::Numeric(v) => v
                .get(row)
                .copied()
                .flatten()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ColumnValues::Text(v) => v
                .get(row)
                .cloned()
                .flatten()
                .map(Value::String)
                .unwrap_or(Value::Null),
        }
    }
}

/// A named column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.values.kind()
    }
}

/// Rectangular table of named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    name: String,
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Build a dataset, rejecting ragged columns.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> ShipResult<Self> {
        let name = name.into();
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
            return Err(ShipError::invalid(format!(
                "dataset `{name}`: column `{}` has {} rows, expected {rows}",
                bad.name,
                bad.values.len()
            )));
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Build from header names and string rows, inferring column types.
    pub fn from_text_rows(
        name: impl Into<String>,
        headers: &[String],
        rows: Vec<Vec<Option<String>>>,
    ) -> ShipResult<Self> {
        let mut cells: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(rows.len()); headers.len()];
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ShipError::invalid(format!(
                    "row {idx} has {} fields, expected {}",
                    row.len(),
                    headers.len()
                )));
            }
            for (col, cell) in cells.iter_mut().zip(row) {
                col.push(cell);
            }
        }
        let columns = headers
            .iter()
            .zip(cells)
            .map(|(h, raw)| Column::new(h.clone(), ColumnValues::infer(raw)))
            .collect();
        Self::new(name, columns)
    }

    /// Build from JSON object records. Keys are taken in first-seen order;
    /// a key absent from a record is a missing cell. A column is numeric iff
    /// every present value is a JSON number.
    pub fn from_records(name: impl Into<String>, records: &[Map<String, Value>]) -> ShipResult<Self> {
        let mut order: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !order.iter().any(|k| k == key) {
                    order.push(key.clone());
                }
            }
        }

        let columns = order
            .into_iter()
            .map(|key| {
                let cells: Vec<Option<&Value>> = records
                    .iter()
                    .map(|r| r.get(&key).filter(|v| !v.is_null()))
                    .collect();
                let numeric = cells.iter().flatten().all(|v| v.is_number());
                let values = if numeric {
                    ColumnValues::Numeric(cells.iter().map(|v| v.and_then(Value::as_f64)).collect())
                } else {
                    ColumnValues::Text(
                        cells
                            .iter()
                            .map(|v| {
                                v.map(|v| match v {
                                    Value::String(s) => s.clone(),
                                    other => other.to_string(),
                                })
                            })
                            .collect(),
                    )
                };
                Column::new(key, values)
            })
            .collect();

        Self::new(name, columns)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Copy of the dataset without the named column.
    pub fn without_column(&self, name: &str) -> Self {
        Self {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
            rows: self.rows,
        }
    }

    /// Row `idx` as a JSON object; missing cells become `null`.
    pub fn record(&self, idx: usize) -> Option<Map<String, Value>> {
        if idx >= self.rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values.json_at(idx)))
                .collect(),
        )
    }

    /// All rows as JSON objects.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        (0..self.rows).filter_map(|i| self.record(i)).collect()
    }

    /// Per-kind column counts, handy for log lines.
    pub fn kind_counts(&self) -> BTreeMap<ColumnKind, usize> {
        let mut counts = BTreeMap::new();
        for column in &self.columns {
            *counts.entry(column.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Document-store contract: collections of JSON records addressed by
/// database and collection name.
pub trait DocumentStore {
    /// Read a whole collection as a dataset. The store's `_id` key is dropped.
    fn get_collection_as_dataset(&self, db: &str, collection: &str) -> ShipResult<Dataset>;

    /// Append every row of `dataset` to the collection as one record each.
    fn insert_dataset_as_records(
        &self,
        dataset: &Dataset,
        db: &str,
        collection: &str,
    ) -> ShipResult<usize>;
}
