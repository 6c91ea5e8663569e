//! Service layer responsible for reading and writing delimited datasets.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::common::error::{ShipError, ShipResult};
use crate::common::time;

use super::domain::{is_missing, Dataset};

/// Load a headered CSV file into a dataset named `name`.
pub fn read_csv(path: impl AsRef<Path>, name: &str) -> ShipResult<Dataset> {
    let path = path.as_ref();
    let start = time::now_ms();
    let file = File::open(path).map_err(|e| ShipError::data_load(path, e))?;
    let dataset = read_csv_from(file, name).map_err(|e| match e {
        ShipError::InvalidInput(reason) => ShipError::data_load(path, reason),
        other => other,
    })?;
    debug!(
        path = %path.display(),
        dataset = name,
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        dur_ms = time::elapsed_ms(start) as u64,
        "csv loaded"
    );
    Ok(dataset)
}

/// Parse headered CSV from any reader. Failures are reported as
/// [`ShipError::InvalidInput`]; [`read_csv`] rewraps them with the path.
pub fn read_csv_from<R: Read>(reader: R, name: &str) -> ShipResult<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ShipError::invalid(format!("unreadable header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(ShipError::invalid("missing header row"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ShipError::invalid(format!("malformed row: {e}")))?;
        rows.push(
            record
                .iter()
                .map(|cell| (!is_missing(cell)).then(|| cell.to_string()))
                .collect(),
        );
    }

    Dataset::from_text_rows(name, &headers, rows)
}

/// Write `dataset` as headered CSV, creating parent directories.
pub fn write_csv(dataset: &Dataset, path: impl AsRef<Path>) -> ShipResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ShipError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| ShipError::io(path, e))?;
    write_csv_to(dataset, file).map_err(|e| match e {
        ShipError::InvalidInput(reason) => {
            ShipError::io(path, std::io::Error::new(std::io::ErrorKind::Other, reason))
        }
        other => other,
    })
}

/// Serialise `dataset` as headered CSV into `writer`. Missing cells are empty.
pub fn write_csv_to<W: Write>(dataset: &Dataset, writer: W) -> ShipResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    let fail = |e: csv::Error| ShipError::invalid(format!("csv write failed: {e}"));

    out.write_record(dataset.column_names()).map_err(fail)?;
    for row in 0..dataset.n_rows() {
        let cells: Vec<String> = dataset
            .columns()
            .iter()
            .map(|c| c.values.text_at(row).unwrap_or_default())
            .collect();
        out.write_record(&cells).map_err(fail)?;
    }
    out.flush()
        .map_err(|e| ShipError::invalid(format!("csv flush failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::data::domain::{ColumnKind, ColumnValues};

    const SAMPLE: &str = "\
Artist Reputation,Height,Material,International
0.26,17,Brass,Yes
na,3,Clay,No
0.61,,Aluminium,Yes
";

    #[test]
    fn reads_header_and_rows() {
        let ds = read_csv_from(SAMPLE.as_bytes(), "train").unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_columns(), 4);
        assert_eq!(
            ds.column("Artist Reputation").unwrap().values,
            ColumnValues::Numeric(vec![Some(0.26), None, Some(0.61)])
        );
        assert_eq!(ds.column("Material").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn ragged_row_is_rejected() {
        let err = read_csv_from("a,b\n1,2\n3\n".as_bytes(), "x").unwrap_err();
        assert!(matches!(err, ShipError::InvalidInput(_)));
    }

    #[test]
    fn missing_file_is_data_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv(dir.path().join("nope.csv"), "train").unwrap_err();
        assert!(matches!(err, ShipError::DataLoad { .. }));
    }

    #[test]
    fn empty_file_is_data_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();
        let err = read_csv(file.path(), "test").unwrap_err();
        assert!(matches!(err, ShipError::DataLoad { .. }), "{err}");
    }

    #[test]
    fn write_then_read_preserves_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let ds = read_csv_from(SAMPLE.as_bytes(), "train").unwrap();

        write_csv(&ds, &path).unwrap();
        let back = read_csv(&path, "train").unwrap();
        assert_eq!(back, ds);
    }
}
