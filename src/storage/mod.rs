//! Object storage for datasets and model artefacts.

pub mod domain;
pub mod repo_fs;

pub use domain::ObjectStore;
pub use repo_fs::FsObjectStore;
