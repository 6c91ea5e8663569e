//! Filesystem-backed document store.
//!
//! Each collection is a JSON-lines file at `<root>/<db>/<collection>.jsonl`,
//! one record per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::common::config::AppCfg;
use crate::common::error::{ShipError, ShipResult};

use super::domain::{Dataset, DocumentStore};

/// Key the store reserves for record identity; never surfaced as a column.
pub const ID_KEY: &str = "_id";

/// Document store rooted at `cfg.document_root`.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.document_root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_path(&self, db: &str, collection: &str) -> ShipResult<PathBuf> {
        for part in [db, collection] {
            if part.is_empty() || part.contains(['/', '\\']) || part == "." || part == ".." {
                return Err(ShipError::storage(
                    "resolve",
                    format!("{db}/{collection}"),
                    "database and collection names must be plain path segments",
                ));
            }
        }
        Ok(self.root.join(db).join(format!("{collection}.jsonl")))
    }

    fn read_records(&self, db: &str, collection: &str) -> ShipResult<Vec<Map<String, Value>>> {
        let path = self.collection_path(db, collection)?;
        let target = format!("{db}/{collection}");
        let file = File::open(&path).map_err(|e| ShipError::storage("read", &target, e))?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| ShipError::storage("read", &target, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Map<String, Value> = serde_json::from_str(&line).map_err(|e| {
                ShipError::storage("read", &target, format!("line {}: {e}", idx + 1))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl DocumentStore for FsDocumentStore {
    fn get_collection_as_dataset(&self, db: &str, collection: &str) -> ShipResult<Dataset> {
        let records = self.read_records(db, collection)?;
        let dataset = Dataset::from_records(collection, &records)
            .map_err(|e| ShipError::storage("read", format!("{db}/{collection}"), e))?;
        let dataset = if dataset.contains_column(ID_KEY) {
            dataset.without_column(ID_KEY)
        } else {
            dataset
        };
        debug!(
            db,
            collection,
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "collection loaded"
        );
        Ok(dataset)
    }

    fn insert_dataset_as_records(
        &self,
        dataset: &Dataset,
        db: &str,
        collection: &str,
    ) -> ShipResult<usize> {
        let path = self.collection_path(db, collection)?;
        let target = format!("{db}/{collection}");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ShipError::storage("insert", &target, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ShipError::storage("insert", &target, e))?;
        let mut out = BufWriter::new(file);

        let records = dataset.to_records();
        for record in &records {
            serde_json::to_writer(&mut out, record)
                .map_err(|e| ShipError::storage("insert", &target, e))?;
            out.write_all(b"\n")
                .map_err(|e| ShipError::storage("insert", &target, e))?;
        }
        out.flush()
            .map_err(|e| ShipError::storage("insert", &target, e))?;

        info!(db, collection, inserted = records.len(), "records inserted");
        Ok(records.len())
    }
}
