//! Table writer
//!
//! Creates a table directory:
//!
//! ```text
//! <table>/
//!   .schema       schema text
//!   .sortinfo     comma-separated sort column names (sorted tables only)
//!   records.dat   row frames
//! ```
//!
//! Rows of a sorted table must be appended in non-decreasing key order.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::record::encode_row;
use super::table::{ROWS_FILE, SCHEMA_FILE, SORT_INFO_FILE};
use crate::errors::{LoaderError, LoaderResult};
use crate::record::Record;
use crate::schema::Schema;
use crate::sortkey::{KeyGenerator, SeekKey, SortSpec};

/// Writes one table directory
pub struct BasicTableWriter {
    dir: PathBuf,
    schema: Schema,
    keys: Option<KeyGenerator>,
    last_key: Option<SeekKey>,
    writer: BufWriter<File>,
    rows: usize,
}

impl BasicTableWriter {
    /// Creates (or truncates) the table at `dir`.
    ///
    /// A non-empty `sort_columns` makes it a sorted table.
    pub fn create<S: AsRef<str>>(dir: &Path, schema: &Schema, sort_columns: &[S]) -> LoaderResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            LoaderError::io(format!("Failed to create table directory: {}", dir.display()), e)
        })?;

        write_file(&dir.join(SCHEMA_FILE), &schema.to_string())?;

        let keys = if sort_columns.is_empty() {
            None
        } else {
            let spec = SortSpec::from_names(sort_columns, schema)?;
            let generator = KeyGenerator::compile(&spec, schema)?;
            write_file(&dir.join(SORT_INFO_FILE), &spec.names().join(","))?;
            Some(generator)
        };

        let rows_path = dir.join(ROWS_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&rows_path)
            .map_err(|e| {
                LoaderError::io(format!("Failed to open row file: {}", rows_path.display()), e)
            })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            schema: schema.clone(),
            keys,
            last_key: None,
            writer: BufWriter::new(file),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Appends one row laid out by the table schema
    pub fn append(&mut self, row: &Record) -> LoaderResult<()> {
        // Normalizes numeric widths and rejects values of the wrong type.
        let row = Record::from_json(&row.to_json(), &self.schema)?;

        if let Some(keys) = &self.keys {
            let key = keys.generate_key(&row)?;
            if self.last_key.as_ref().is_some_and(|last| &key < last) {
                return Err(LoaderError::configuration(format!(
                    "Row {} of sorted table {} is out of order",
                    self.rows,
                    self.dir.display()
                )));
            }
            self.last_key = Some(key);
        }

        let frame = encode_row(&row).map_err(|e| LoaderError::io_no_source(e.to_string()))?;
        self.writer.write_all(&frame).map_err(|e| {
            LoaderError::io(format!("Failed to append row to {}", self.dir.display()), e)
        })?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes and syncs the row file, returning the number of rows written
    pub fn finish(mut self) -> LoaderResult<usize> {
        self.writer
            .flush()
            .map_err(|e| LoaderError::io("Failed to flush row file", e))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| LoaderError::io("Failed to sync row file", e))?;
        Ok(self.rows)
    }
}

fn write_file(path: &Path, contents: &str) -> LoaderResult<()> {
    fs::write(path, contents)
        .map_err(|e| LoaderError::io(format!("Failed to write {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LoaderErrorCode;
    use crate::record::Value;
    use tempfile::TempDir;

    fn schema() -> Schema {
        "id:int, name:string".parse().unwrap()
    }

    fn row(id: i32, name: &str) -> Record {
        Record::new(vec![Value::Int(id), Value::String(name.into())])
    }

    #[test]
    fn test_creates_table_files() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("t");
        let mut writer = BasicTableWriter::create(&table, &schema(), &["id"]).unwrap();
        writer.append(&row(1, "a")).unwrap();
        writer.append(&row(1, "b")).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        assert_eq!(fs::read_to_string(table.join(SCHEMA_FILE)).unwrap(), "id:int, name:string");
        assert_eq!(fs::read_to_string(table.join(SORT_INFO_FILE)).unwrap(), "id");
        assert!(table.join(ROWS_FILE).exists());
    }

    #[test]
    fn test_unsorted_table_has_no_sort_info() {
        let dir = TempDir::new().unwrap();
        let writer = BasicTableWriter::create::<&str>(dir.path(), &schema(), &[]).unwrap();
        writer.finish().unwrap();
        assert!(!dir.path().join(SORT_INFO_FILE).exists());
    }

    #[test]
    fn test_out_of_order_row_rejected() {
        let dir = TempDir::new().unwrap();
        let mut writer = BasicTableWriter::create(dir.path(), &schema(), &["id", "name"]).unwrap();
        writer.append(&row(2, "a")).unwrap();
        let err = writer.append(&row(1, "z")).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        let dir = TempDir::new().unwrap();
        let mut writer = BasicTableWriter::create::<&str>(dir.path(), &schema(), &[]).unwrap();
        let err = writer
            .append(&Record::new(vec![Value::String("x".into()), Value::Null]))
            .unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ParseError);
    }

    #[test]
    fn test_unsortable_sort_column_rejected() {
        let dir = TempDir::new().unwrap();
        let schema: Schema = "m:map(int)".parse().unwrap();
        let err = BasicTableWriter::create(dir.path(), &schema, &["m"]).err().unwrap();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);
    }
}
