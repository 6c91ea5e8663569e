//! Data domain: tabular datasets, CSV ingest and the document store.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Column, ColumnKind, ColumnValues, Dataset, DocumentStore};
pub use repo_fs::FsDocumentStore;
pub use service::{read_csv, read_csv_from, write_csv};
