//! Object-store contract: named blobs grouped into buckets.
//!
//! Implementors supply the four primitives; the composite operations
//! (folder upload, CSV round trips, model loading) are provided on top.
//! Every failure surfaces as [`ShipError::Storage`], except a model that is
//! simply not there, which is [`ShipError::ModelMissing`].

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::common::error::{ShipError, ShipResult};
use crate::data::domain::Dataset;
use crate::data::service::{read_csv_from, write_csv};

pub trait ObjectStore: Send + Sync {
    /// Copy the local file `from` to `key` in `bucket`, deleting the local
    /// copy afterwards when `remove` is set.
    fn upload_file(&self, from: &Path, key: &str, bucket: &str, remove: bool) -> ShipResult<()>;

    /// Raw bytes stored under `key`.
    fn read_object(&self, key: &str, bucket: &str) -> ShipResult<Vec<u8>>;

    /// Keys in `bucket` starting with `prefix`, sorted.
    fn list_objects(&self, bucket: &str, prefix: &str) -> ShipResult<Vec<String>>;

    /// Create an empty folder at `folder` unless it already exists.
    fn create_folder(&self, folder: &str, bucket: &str) -> ShipResult<()>;

    /// Upload every regular file directly inside `dir`, keyed by file name.
    /// Local files are kept.
    fn upload_folder(&self, dir: &Path, bucket: &str) -> ShipResult<usize> {
        let target = dir.display().to_string();
        let entries = fs::read_dir(dir).map_err(|e| ShipError::storage("upload_folder", &target, e))?;

        let mut uploaded = 0;
        for entry in entries {
            let entry = entry.map_err(|e| ShipError::storage("upload_folder", &target, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().into_owned();
            self.upload_file(&path, &key, bucket, false)?;
            uploaded += 1;
        }
        info!(dir = %target, bucket, uploaded, "folder uploaded");
        Ok(uploaded)
    }

    /// Write `dataset` to `local` as CSV, then move it to `key`.
    fn upload_dataset_as_csv(
        &self,
        dataset: &Dataset,
        local: &Path,
        key: &str,
        bucket: &str,
    ) -> ShipResult<()> {
        write_csv(dataset, local)
            .map_err(|e| ShipError::storage("upload_csv", local.display().to_string(), e))?;
        self.upload_file(local, key, bucket, true)
    }

    /// Parse the CSV object at `key` into a dataset named after the key.
    fn read_csv(&self, key: &str, bucket: &str) -> ShipResult<Dataset> {
        let bytes = self.read_object(key, bucket)?;
        read_csv_from(bytes.as_slice(), key)
            .map_err(|e| ShipError::storage("read_csv", format!("{bucket}/{key}"), e))
    }

    /// Whether any object lives under `prefix`.
    fn is_model_present(&self, bucket: &str, prefix: &str) -> ShipResult<bool> {
        Ok(!self.list_objects(bucket, prefix)?.is_empty())
    }

    /// Deserialise the JSON model stored at `model_dir/name` (or `name`).
    fn load_model<T: DeserializeOwned>(
        &self,
        name: &str,
        bucket: &str,
        model_dir: Option<&str>,
    ) -> ShipResult<T>
    where
        Self: Sized,
    {
        let key = match model_dir {
            Some(dir) => format!("{}/{name}", dir.trim_end_matches('/')),
            None => name.to_string(),
        };
        if !self.list_objects(bucket, &key)?.iter().any(|k| *k == key) {
            return Err(ShipError::ModelMissing(format!("{bucket}/{key}")));
        }
        let bytes = self.read_object(&key, bucket)?;
        let model = serde_json::from_slice(&bytes)
            .map_err(|e| ShipError::storage("load_model", format!("{bucket}/{key}"), e))?;
        info!(bucket, key = %key, "model loaded");
        Ok(model)
    }
}
