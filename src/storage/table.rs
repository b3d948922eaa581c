//! Local directory-backed tables
//!
//! [`LocalTableStorage`] serves tables written by
//! [`BasicTableWriter`](super::BasicTableWriter). Readers resolve the
//! projection against the union of the input table schemas: a projected
//! column a table lacks reads as null, and a map selector with subfields
//! keeps only the named keys.
//!
//! Sorted readers merge all input tables by seek key, ties resolved in
//! path order. Unsorted readers return tables one after another.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use super::reader::TableFileReader;
use super::{TableRecordReader, TableSplit, TableStorage};
use crate::config::{ConfigView, INPUT_SORTED};
use crate::errors::{LoaderError, LoaderResult};
use crate::projection::{Projection, Selector};
use crate::record::{Record, Value};
use crate::schema::{union_all, Schema};
use crate::sortkey::{KeyGenerator, SeekKey, SortSpec};

/// Schema text file
pub const SCHEMA_FILE: &str = ".schema";
/// Sort column names file, present only for sorted tables
pub const SORT_INFO_FILE: &str = ".sortinfo";
/// Row frames file
pub const ROWS_FILE: &str = "records.dat";

/// Metadata of one table directory
#[derive(Debug, Clone)]
pub struct BasicTable {
    path: PathBuf,
    schema: Schema,
    sort_spec: Option<SortSpec>,
}

impl BasicTable {
    /// Reads the table metadata at `dir`
    pub fn open(dir: &Path) -> LoaderResult<Self> {
        let schema_path = dir.join(SCHEMA_FILE);
        let text = fs::read_to_string(&schema_path).map_err(|e| {
            LoaderError::io(format!("Failed to read table schema: {}", schema_path.display()), e)
        })?;
        let schema: Schema = text.parse()?;

        let sort_spec = match fs::read_to_string(dir.join(SORT_INFO_FILE)) {
            Ok(text) => {
                let names: Vec<&str> = text
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .collect();
                let spec = SortSpec::from_names(&names, &schema)?;
                KeyGenerator::for_key_tuple(&spec)?;
                Some(spec)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(LoaderError::io(
                    format!("Failed to read sort info of {}", dir.display()),
                    e,
                ))
            }
        };

        Ok(Self {
            path: dir.to_path_buf(),
            schema,
            sort_spec,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort_spec.as_ref()
    }

    pub fn is_sorted(&self) -> bool {
        self.sort_spec.is_some()
    }

    pub fn rows_path(&self) -> PathBuf {
        self.path.join(ROWS_FILE)
    }
}

/// Storage engine over local table directories
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTableStorage;

impl LocalTableStorage {
    pub fn new() -> Self {
        Self
    }

    fn open_tables(&self, paths: &[PathBuf]) -> LoaderResult<Vec<BasicTable>> {
        if paths.is_empty() {
            return Err(LoaderError::no_table_specified());
        }
        paths.iter().map(|p| BasicTable::open(p)).collect()
    }

    fn open_reader(
        &self,
        paths: &[PathBuf],
        sorted: bool,
        projection: &str,
    ) -> LoaderResult<Box<dyn TableRecordReader>> {
        let tables = self.open_tables(paths)?;
        let sort_spec = if sorted {
            Some(common_sort_spec(&tables)?)
        } else {
            None
        };
        let reader = BasicTableReader::open(&tables, sort_spec.as_ref(), projection)?;
        Ok(Box::new(reader))
    }
}

/// Returns the sort specification shared by every table
fn common_sort_spec(tables: &[BasicTable]) -> LoaderResult<SortSpec> {
    let mut common: Option<&SortSpec> = None;
    for table in tables {
        let spec = table.sort_spec().ok_or_else(|| {
            LoaderError::configuration(format!(
                "Input table {} is not sorted",
                table.path().display()
            ))
        })?;
        match common {
            None => common = Some(spec),
            Some(first) if first != spec => {
                return Err(LoaderError::configuration(format!(
                    "Input table {} is sorted on '{}', expected '{}'",
                    table.path().display(),
                    spec,
                    first
                )))
            }
            Some(_) => {}
        }
    }
    common
        .cloned()
        .ok_or_else(LoaderError::no_table_specified)
}

impl TableStorage for LocalTableStorage {
    fn get_schema(&self, path: &Path, _env: &dyn ConfigView) -> LoaderResult<Schema> {
        Ok(BasicTable::open(path)?.schema)
    }

    fn require_sorted_table(
        &self,
        env: &dyn ConfigView,
        hint: Option<&SortSpec>,
    ) -> LoaderResult<SortSpec> {
        let tables = self.open_tables(&env.input_paths()?)?;
        let spec = common_sort_spec(&tables)?;
        if let Some(hint) = hint {
            if hint != &spec {
                return Err(LoaderError::configuration(format!(
                    "Input tables are sorted on '{}', required '{}'",
                    spec, hint
                )));
            }
        }
        Ok(spec)
    }

    fn get_sort_info(&self, env: &dyn ConfigView) -> LoaderResult<Option<SortSpec>> {
        let tables = self.open_tables(&env.input_paths()?)?;
        Ok(common_sort_spec(&tables).ok())
    }

    fn splits(&self, env: &dyn ConfigView) -> LoaderResult<Vec<TableSplit>> {
        let paths = env.input_paths()?;
        if paths.is_empty() {
            return Err(LoaderError::no_table_specified());
        }
        if env.flag(INPUT_SORTED) {
            return Ok(vec![TableSplit::new(0, paths)]);
        }
        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| TableSplit::new(index, vec![path]))
            .collect())
    }

    fn create_reader(
        &self,
        env: &dyn ConfigView,
        projection: &str,
    ) -> LoaderResult<Box<dyn TableRecordReader>> {
        self.open_reader(&env.input_paths()?, env.flag(INPUT_SORTED), projection)
    }

    fn create_split_reader(
        &self,
        env: &dyn ConfigView,
        split: &TableSplit,
        projection: &str,
    ) -> LoaderResult<Box<dyn TableRecordReader>> {
        self.open_reader(&split.paths, env.flag(INPUT_SORTED), projection)
    }
}

/// How one projected column is filled from a table row
#[derive(Debug, Clone)]
struct ColumnSource {
    position: Option<usize>,
    subfields: Vec<String>,
}

struct Source {
    table: BasicTable,
    file: TableFileReader,
    columns: Vec<ColumnSource>,
    keys: Option<KeyGenerator>,
    head: Option<(SeekKey, Record)>,
    done: bool,
}

impl Source {
    fn open(table: &BasicTable, projection: &Projection, sort_spec: Option<&SortSpec>) -> LoaderResult<Self> {
        let columns = projection
            .selectors()
            .iter()
            .map(|selector: &Selector| ColumnSource {
                position: table.schema().index_of(&selector.name),
                subfields: selector.subfields.clone(),
            })
            .collect();

        let keys = match sort_spec {
            Some(spec) => Some(KeyGenerator::compile(spec, table.schema())?),
            None => None,
        };

        Ok(Self {
            table: table.clone(),
            file: TableFileReader::open(&table.rows_path())?,
            columns,
            keys,
            head: None,
            done: false,
        })
    }

    /// Reads the next full-width row of this table
    fn read_row(&mut self) -> LoaderResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        match self.file.read_next()? {
            Some(payload) => Ok(Some(self.decode(&payload)?)),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn decode(&self, payload: &Json) -> LoaderResult<Record> {
        Record::from_json(payload, self.table.schema()).map_err(|e| {
            LoaderError::io_no_source(format!("Malformed row: {}", e.message()))
                .with_details(self.file.path().display().to_string())
        })
    }

    /// Projects a full-width row
    fn project(&self, row: Record) -> Record {
        let mut fields = row.into_fields();
        let projected = self
            .columns
            .iter()
            .map(|column| {
                let value = column
                    .position
                    .and_then(|p| fields.get_mut(p))
                    .map(|v| std::mem::replace(v, Value::Null))
                    .unwrap_or(Value::Null);
                select_subfields(value, &column.subfields)
            })
            .collect();
        Record::new(projected)
    }

    /// Fills `head` with the next keyed row unless already present
    fn fill_head(&mut self) -> LoaderResult<()> {
        if self.head.is_some() {
            return Ok(());
        }
        if let Some(row) = self.read_row()? {
            let key = match &self.keys {
                Some(keys) => keys.generate_key(&row)?,
                None => SeekKey::from_bytes(Vec::new()),
            };
            self.head = Some((key, row));
        }
        Ok(())
    }
}

fn select_subfields(value: Value, subfields: &[String]) -> Value {
    match value {
        Value::Map(mut map) if !subfields.is_empty() => {
            map.retain(|k, _| subfields.iter().any(|s| s == k));
            Value::Map(map)
        }
        other => other,
    }
}

/// Projection-aware reader over one or more tables
pub struct BasicTableReader {
    schema: Schema,
    sources: Vec<Source>,
    sorted: bool,
    current: usize,
}

impl BasicTableReader {
    /// Opens `tables` through `projection`; a sort spec makes the reader merge by key
    pub fn open(tables: &[BasicTable], sort_spec: Option<&SortSpec>, projection: &str) -> LoaderResult<Self> {
        let logical = union_all(tables.iter().map(BasicTable::schema))?;
        let projection = Projection::parse(&logical, projection)?;

        let sources = tables
            .iter()
            .map(|t| Source::open(t, &projection, sort_spec))
            .collect::<LoaderResult<Vec<_>>>()?;

        Ok(Self {
            schema: projection.schema().clone(),
            sources,
            sorted: sort_spec.is_some(),
            current: 0,
        })
    }

    fn next_sorted(&mut self) -> LoaderResult<Option<Record>> {
        let mut best: Option<usize> = None;
        for i in 0..self.sources.len() {
            self.sources[i].fill_head()?;
            let Some((key, _)) = &self.sources[i].head else {
                continue;
            };
            let better = match best {
                None => true,
                Some(b) => self.sources[b].head.as_ref().is_some_and(|(bk, _)| key < bk),
            };
            if better {
                best = Some(i);
            }
        }

        Ok(best.and_then(|i| {
            let source = &mut self.sources[i];
            source.head.take().map(|(_, row)| source.project(row))
        }))
    }

    fn next_sequential(&mut self) -> LoaderResult<Option<Record>> {
        while let Some(source) = self.sources.get_mut(self.current) {
            if let Some(row) = source.read_row()? {
                return Ok(Some(source.project(row)));
            }
            self.current += 1;
        }
        Ok(None)
    }
}

impl TableRecordReader for BasicTableReader {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn seek_to(&mut self, key: &SeekKey) -> LoaderResult<()> {
        if !self.sorted {
            return Err(LoaderError::configuration("Seek requires a sorted table"));
        }
        for source in &mut self.sources {
            loop {
                source.fill_head()?;
                match &source.head {
                    Some((head_key, _)) if head_key < key => source.head = None,
                    _ => break,
                }
            }
        }
        Ok(())
    }

    fn next_record(&mut self) -> LoaderResult<Option<Record>> {
        if self.sorted {
            self.next_sorted()
        } else {
            self.next_sequential()
        }
    }

    fn close(&mut self) -> LoaderResult<()> {
        self.sources.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobEnv, TaskEnv};
    use crate::errors::LoaderErrorCode;
    use crate::storage::BasicTableWriter;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn write_table(dir: &Path, schema: &str, sort: &[&str], rows: Vec<Vec<Value>>) {
        let schema: Schema = schema.parse().unwrap();
        let mut writer = BasicTableWriter::create(dir, &schema, sort).unwrap();
        for row in rows {
            writer.append(&Record::new(row)).unwrap();
        }
        writer.finish().unwrap();
    }

    fn env(paths: &[PathBuf], sorted: bool) -> TaskEnv {
        let mut job = JobEnv::new();
        job.set_input_paths(paths).unwrap();
        if sorted {
            job.set(INPUT_SORTED, "true");
        }
        TaskEnv::from_job(&job)
    }

    fn drain(reader: &mut dyn TableRecordReader) -> Vec<Record> {
        let mut rows = Vec::new();
        while let Some(row) = reader.next_record().unwrap() {
            rows.push(row);
        }
        rows
    }

    fn ints(rows: &[Record], field: usize) -> Vec<i32> {
        rows.iter()
            .map(|r| match r.get(field) {
                Some(Value::Int(v)) => *v,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_open_reads_metadata() {
        let dir = TempDir::new().unwrap();
        write_table(dir.path(), "id:int, name:string", &["id"], vec![]);
        let table = BasicTable::open(dir.path()).unwrap();
        assert_eq!(table.schema().len(), 2);
        assert_eq!(table.sort_spec().unwrap().names(), vec!["id"]);
    }

    #[test]
    fn test_open_missing_schema_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = BasicTable::open(dir.path()).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::IoError);
    }

    #[test]
    fn test_projection_reorders_and_fills_missing_columns() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        write_table(&a, "id:int, name:string", &[], vec![vec![Value::Int(1), Value::String("x".into())]]);
        write_table(&b, "id:int, score:double", &[], vec![vec![Value::Int(2), Value::Double(0.5)]]);

        let storage = LocalTableStorage::new();
        let mut reader = storage
            .create_reader(&env(&[a, b], false), "score , id , name")
            .unwrap();
        assert_eq!(reader.schema().to_string(), "score:double, id:int, name:string");

        let rows = drain(reader.as_mut());
        assert_eq!(
            rows,
            vec![
                Record::new(vec![Value::Null, Value::Int(1), Value::String("x".into())]),
                Record::new(vec![Value::Double(0.5), Value::Int(2), Value::Null]),
            ]
        );
    }

    #[test]
    fn test_map_subfields_filtered() {
        let dir = TempDir::new().unwrap();
        let mut tags = BTreeMap::new();
        tags.insert("x".to_string(), Value::String("1".into()));
        tags.insert("y".to_string(), Value::String("2".into()));
        tags.insert("z".to_string(), Value::String("3".into()));
        write_table(dir.path(), "id:int, tags:map(string)", &[], vec![vec![Value::Int(1), Value::Map(tags)]]);

        let storage = LocalTableStorage::new();
        let mut reader = storage
            .create_reader(&env(&[dir.path().to_path_buf()], false), "tags#{x|z}")
            .unwrap();
        let rows = drain(reader.as_mut());
        match rows[0].get(0) {
            Some(Value::Map(m)) => assert_eq!(m.keys().collect::<Vec<_>>(), vec!["x", "z"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sorted_merge_and_seek() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let row = |id: i32| vec![Value::Int(id)];
        write_table(&a, "id:int", &["id"], vec![row(1), row(4), row(6)]);
        write_table(&b, "id:int", &["id"], vec![row(2), row(3), row(7)]);

        let storage = LocalTableStorage::new();
        let task = env(&[a, b], true);
        let mut reader = storage.create_reader(&task, "").unwrap();
        assert_eq!(ints(&drain(reader.as_mut()), 0), vec![1, 2, 3, 4, 6, 7]);

        let spec = storage.require_sorted_table(&task, None).unwrap();
        let keys = KeyGenerator::for_key_tuple(&spec).unwrap();
        let mut reader = storage.create_reader(&task, "").unwrap();
        reader.seek_to(&keys.key_for_values(&[Value::Int(4)]).unwrap()).unwrap();
        assert_eq!(ints(&drain(reader.as_mut()), 0), vec![4, 6, 7]);
    }

    #[test]
    fn test_seek_on_unsorted_reader_rejected() {
        let dir = TempDir::new().unwrap();
        write_table(dir.path(), "id:int", &[], vec![]);
        let mut reader = LocalTableStorage::new()
            .create_reader(&env(&[dir.path().to_path_buf()], false), "")
            .unwrap();
        let err = reader.seek_to(&SeekKey::from_bytes(vec![1])).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);
    }

    #[test]
    fn test_require_sorted_table() {
        let dir = TempDir::new().unwrap();
        let sorted = dir.path().join("s");
        let plain = dir.path().join("p");
        write_table(&sorted, "id:int", &["id"], vec![]);
        write_table(&plain, "id:int", &[], vec![]);
        let storage = LocalTableStorage::new();

        let err = storage
            .require_sorted_table(&env(&[sorted.clone(), plain.clone()], false), None)
            .unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);
        assert!(storage.get_sort_info(&env(&[plain], false)).unwrap().is_none());

        let other: Schema = "id:int".parse().unwrap();
        let hint = SortSpec::new(vec![other.columns()[0].clone()]).unwrap();
        assert!(storage.require_sorted_table(&env(&[sorted], false), Some(&hint)).is_ok());
    }

    #[test]
    fn test_splits() {
        let paths = vec![PathBuf::from("/t/a"), PathBuf::from("/t/b")];
        let storage = LocalTableStorage::new();
        assert_eq!(storage.splits(&env(&paths, false)).unwrap().len(), 2);
        let merged = storage.splits(&env(&paths, true)).unwrap();
        assert_eq!(merged, vec![TableSplit::new(0, paths)]);
    }
}
