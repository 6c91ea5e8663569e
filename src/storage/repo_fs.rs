//! Filesystem-backed object store: each bucket is a directory under the
//! store root and each key a relative path inside it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::config::AppCfg;
use crate::common::error::{ShipError, ShipResult};

use super::domain::ObjectStore;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.object_root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `bucket` if missing. Buckets are never created implicitly.
    pub fn create_bucket(&self, bucket: &str) -> ShipResult<()> {
        let dir = self.root.join(check_segment("create_bucket", bucket)?);
        fs::create_dir_all(&dir).map_err(|e| ShipError::storage("create_bucket", bucket, e))
    }

    fn bucket_dir(&self, op: &'static str, bucket: &str) -> ShipResult<PathBuf> {
        let dir = self.root.join(check_segment(op, bucket)?);
        if !dir.is_dir() {
            return Err(ShipError::storage(op, bucket, "no such bucket"));
        }
        Ok(dir)
    }

    fn object_path(&self, op: &'static str, bucket: &str, key: &str) -> ShipResult<PathBuf> {
        let mut path = self.bucket_dir(op, bucket)?;
        let target = || format!("{bucket}/{key}");
        let key = key.trim_end_matches('/');
        if key.is_empty() || key.starts_with('/') || key.contains('\\') {
            return Err(ShipError::storage(op, target(), "invalid object key"));
        }
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(ShipError::storage(op, target(), "invalid object key"));
            }
            path.push(part);
        }
        Ok(path)
    }
}

fn check_segment<'a>(op: &'static str, bucket: &'a str) -> ShipResult<&'a str> {
    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
        return Err(ShipError::storage(op, bucket, "bucket names must be plain path segments"));
    }
    Ok(bucket)
}

fn collect_keys(dir: &Path, prefix: &str, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() { name } else { format!("{prefix}/{name}") };
        if entry.file_type()?.is_dir() {
            collect_keys(&entry.path(), &key, out)?;
        } else {
            out.push(key);
        }
    }
    Ok(())
}

impl ObjectStore for FsObjectStore {
    fn upload_file(&self, from: &Path, key: &str, bucket: &str, remove: bool) -> ShipResult<()> {
        let dest = self.object_path("upload_file", bucket, key)?;
        let target = format!("{bucket}/{key}");
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ShipError::storage("upload_file", &target, e))?;
        }
        fs::copy(from, &dest).map_err(|e| {
            ShipError::storage("upload_file", &target, format!("{}: {e}", from.display()))
        })?;
        if remove {
            fs::remove_file(from).map_err(|e| {
                ShipError::storage("upload_file", &target, format!("remove {}: {e}", from.display()))
            })?;
        }
        info!(from = %from.display(), bucket, key, remove, "file uploaded");
        Ok(())
    }

    fn read_object(&self, key: &str, bucket: &str) -> ShipResult<Vec<u8>> {
        let path = self.object_path("read_object", bucket, key)?;
        let bytes = fs::read(&path)
            .map_err(|e| ShipError::storage("read_object", format!("{bucket}/{key}"), e))?;
        debug!(bucket, key, bytes = bytes.len(), "object read");
        Ok(bytes)
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> ShipResult<Vec<String>> {
        let dir = self.bucket_dir("list_objects", bucket)?;
        let mut keys = Vec::new();
        collect_keys(&dir, "", &mut keys)
            .map_err(|e| ShipError::storage("list_objects", bucket, e))?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn create_folder(&self, folder: &str, bucket: &str) -> ShipResult<()> {
        let path = self.object_path("create_folder", bucket, folder)?;
        if path.is_file() {
            return Err(ShipError::storage(
                "create_folder",
                format!("{bucket}/{folder}"),
                "an object already exists at this key",
            ));
        }
        fs::create_dir_all(&path)
            .map_err(|e| ShipError::storage("create_folder", format!("{bucket}/{folder}"), e))?;
        debug!(bucket, folder, "folder ready");
        Ok(())
    }
}
