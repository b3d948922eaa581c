//! Schema union across on-disk tables

use std::path::{Path, PathBuf};

use tableload::config::JobEnv;
use tableload::errors::LoaderErrorCode;
use tableload::loader::{LoadFunc, TableLoader};
use tableload::schema::{resolve_schema, union_all, Schema};
use tableload::storage::{BasicTableWriter, LocalTableStorage};
use tempfile::TempDir;

fn create(dir: &Path, schema: &str) -> PathBuf {
    let schema: Schema = schema.parse().unwrap();
    BasicTableWriter::create::<&str>(dir, &schema, &[])
        .unwrap()
        .finish()
        .unwrap();
    dir.to_path_buf()
}

fn schema(text: &str) -> Schema {
    text.parse().unwrap()
}

#[test]
fn test_union_is_associative() {
    let p1 = schema("a:int, b:string");
    let p2 = schema("c:long, a:int");
    let p3 = schema("d:map(string), b:string, e:bytes");

    let left = union_all([&union_all([&p1, &p2]).unwrap(), &p3]).unwrap();
    let right = union_all([&p1, &union_all([&p2, &p3]).unwrap()]).unwrap();
    assert_eq!(left, right);
    assert_eq!(left.to_string(), "a:int, b:string, c:long, d:map(string), e:bytes");
}

#[test]
fn test_column_order_difference_keeps_name_set() {
    let merged = union_all([&schema("a:int, b:string, c:double"), &schema("c:double, a:int, b:string")]).unwrap();
    let mut names: Vec<&str> = merged.names().collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_resolve_over_tables_on_disk() {
    let tmp = TempDir::new().unwrap();
    let t1 = create(&tmp.path().join("t1"), "id:int, name:string");
    let t2 = create(&tmp.path().join("t2"), "id:int, score:double");

    let merged = resolve_schema(&LocalTableStorage::new(), &[t1, t2], &JobEnv::new()).unwrap();
    assert_eq!(merged.to_string(), "id:int, name:string, score:double");
}

#[test]
fn test_conflicting_types_abort_get_schema() {
    let tmp = TempDir::new().unwrap();
    create(&tmp.path().join("t1"), "id:int, name:string");
    create(&tmp.path().join("t2"), "id:long");

    let location = format!("{}/t*", tmp.path().display());
    let err = TableLoader::new()
        .get_schema(&location, &mut JobEnv::new())
        .unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::SchemaUnionError);
    assert!(err.aborts_planning());
}
