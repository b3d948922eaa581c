//! Sort key tests
//!
//! - Byte order of keys equals tuple order of the sort columns
//! - seek_near followed by next yields non-decreasing keys, all >= target

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tableload::config::JobEnv;
use tableload::loader::{IteratorState, RecordIterator, TaskDescriptor};
use tableload::record::{Record, Value};
use tableload::schema::Schema;
use tableload::sortkey::{KeyGenerator, SortSpec};
use tableload::storage::{BasicTableWriter, LocalTableStorage};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn spec(text: &str) -> SortSpec {
    let schema: Schema = text.parse().unwrap();
    SortSpec::new(schema.columns().to_vec()).unwrap()
}

fn int_string_grid() -> Vec<(i32, String)> {
    let ints = [i32::MIN, -1_000_000, -1, 0, 1, 255, 256, 65_536, i32::MAX];
    let strings = ["", "\0", "\0\0", "a", "a\0", "a\0b", "ab", "b", "\u{e9}", "zzz"];
    let mut grid = Vec::new();
    for i in ints {
        for s in strings {
            grid.push((i, s.to_string()));
        }
    }
    grid
}

// =============================================================================
// Ordering property
// =============================================================================

#[test]
fn test_int_string_key_order_matches_tuple_order() {
    let generator = KeyGenerator::for_key_tuple(&spec("c1:int, c2:string")).unwrap();
    let grid = int_string_grid();
    let keys: Vec<_> = grid
        .iter()
        .map(|(i, s)| {
            generator
                .key_for_values(&[Value::Int(*i), Value::String(s.clone())])
                .unwrap()
        })
        .collect();

    for (a, ka) in grid.iter().zip(&keys) {
        for (b, kb) in grid.iter().zip(&keys) {
            assert_eq!(ka.cmp(kb), a.cmp(b), "{:?} vs {:?}", a, b);
        }
    }
}

#[test]
fn test_record_key_matches_key_tuple() {
    let spec = spec("c1:int, c2:string");
    let projection: Schema = "c2:string, other:bytes, c1:int".parse().unwrap();
    let from_record = KeyGenerator::compile(&spec, &projection).unwrap();
    let from_tuple = KeyGenerator::for_key_tuple(&spec).unwrap();

    for (i, s) in int_string_grid() {
        let record = Record::new(vec![Value::String(s.clone()), Value::Bytes(vec![7]), Value::Int(i)]);
        assert_eq!(
            from_record.generate_key(&record).unwrap(),
            from_tuple.key_for_values(&[Value::Int(i), Value::String(s)]).unwrap()
        );
    }
}

#[test]
fn test_double_key_order() {
    let generator = KeyGenerator::for_key_tuple(&spec("d:double")).unwrap();
    let values = [
        f64::NEG_INFINITY,
        -1e300,
        -2.5,
        -f64::MIN_POSITIVE,
        0.0,
        f64::MIN_POSITIVE,
        1.0,
        1.5,
        1e300,
        f64::INFINITY,
    ];

    for a in values {
        for b in values {
            let ka = generator.key_for_values(&[Value::Double(a)]).unwrap();
            let kb = generator.key_for_values(&[Value::Double(b)]).unwrap();
            assert_eq!(ka.cmp(&kb), a.partial_cmp(&b).unwrap(), "{} vs {}", a, b);
        }
    }
}

#[test]
fn test_long_bool_bytes_order() {
    let generator = KeyGenerator::for_key_tuple(&spec("l:long, b:bool, r:bytes")).unwrap();
    let tuples = [
        (i64::MIN, false, vec![]),
        (-1, false, vec![0]),
        (-1, true, vec![]),
        (0, false, vec![0, 0]),
        (0, false, vec![0, 1]),
        (0, true, vec![1]),
        (i64::MAX, true, vec![255]),
    ];
    let keys: Vec<_> = tuples
        .iter()
        .map(|(l, b, r)| {
            generator
                .key_for_values(&[Value::Long(*l), Value::Bool(*b), Value::Bytes(r.clone())])
                .unwrap()
        })
        .collect();

    for window in keys.windows(2) {
        assert_eq!(window[0].cmp(&window[1]), Ordering::Less);
    }
}

#[test]
fn test_null_sorts_first() {
    let generator = KeyGenerator::for_key_tuple(&spec("c1:int, c2:string")).unwrap();
    let null = generator.key_for_values(&[Value::Null, Value::String("a".into())]).unwrap();
    let min = generator
        .key_for_values(&[Value::Int(i32::MIN), Value::Null])
        .unwrap();
    assert!(null < min);
}

// =============================================================================
// Seek monotonicity
// =============================================================================

fn write_sorted(dir: &Path, rows: &[(i32, &str)]) {
    let schema: Schema = "c1:int, c2:string, payload:long".parse().unwrap();
    let mut writer = BasicTableWriter::create(dir, &schema, &["c1", "c2"]).unwrap();
    for (n, (c1, c2)) in rows.iter().enumerate() {
        writer
            .append(&Record::new(vec![
                Value::Int(*c1),
                Value::String(c2.to_string()),
                Value::Long(n as i64),
            ]))
            .unwrap();
    }
    writer.finish().unwrap();
}

fn sorted_descriptor(paths: Vec<PathBuf>, projection: Option<&str>) -> TaskDescriptor {
    let schema: Schema = "c1:int, c2:string, payload:long".parse().unwrap();
    TaskDescriptor {
        consumer: "test".into(),
        signature: "seek".into(),
        paths,
        projection: projection.map(str::to_string),
        sorted: true,
        sort_spec: Some(SortSpec::from_names(&["c1", "c2"], &schema).unwrap()),
        schema,
    }
}

#[test]
fn test_seek_then_next_is_monotone_and_bounded() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    write_sorted(&a, &[(-5, "x"), (0, "a"), (0, "c"), (3, ""), (9, "q")]);
    write_sorted(&b, &[(-7, "m"), (0, "b"), (2, "z"), (3, "a"), (3, "a"), (12, "k")]);

    let spec = spec("c1:int, c2:string");
    let keys = KeyGenerator::for_key_tuple(&spec).unwrap();

    let targets = [(-100, ""), (0, "b"), (0, "bb"), (3, "a"), (13, "")];
    for (t1, t2) in targets {
        let mut iterator = RecordIterator::new(
            sorted_descriptor(vec![a.clone(), b.clone()], Some("c2 , c1")),
            Arc::new(LocalTableStorage::new()),
        );
        iterator.initialize(&JobEnv::new()).unwrap();
        iterator
            .seek_near(&Record::new(vec![Value::String(t2.to_string()), Value::Int(t1)]))
            .unwrap();
        assert_eq!(iterator.state(), IteratorState::Seeked);

        let target = keys
            .key_for_values(&[Value::Int(t1), Value::String(t2.to_string())])
            .unwrap();
        let mut previous = None;
        while let Some(record) = iterator.next().unwrap() {
            let key = keys
                .key_for_values(&[record.get(1).cloned().unwrap(), record.get(0).cloned().unwrap()])
                .unwrap();
            assert!(key >= target);
            if let Some(prev) = &previous {
                assert!(&key >= prev);
            }
            previous = Some(key);
        }
        assert_eq!(iterator.state(), IteratorState::Exhausted);
        iterator.close().unwrap();
    }
}

#[test]
fn test_seek_lands_on_first_key_at_or_after_target() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a");
    write_sorted(&a, &[(1, "a"), (2, "a"), (2, "c"), (4, "a")]);

    let mut iterator = RecordIterator::new(sorted_descriptor(vec![a], None), Arc::new(LocalTableStorage::new()));
    iterator.initialize(&JobEnv::new()).unwrap();
    iterator
        .seek_near_key(&[Value::Int(2), Value::String("b".into())])
        .unwrap();

    let first = iterator.next().unwrap().unwrap();
    assert_eq!(first.get(0), Some(&Value::Int(2)));
    assert_eq!(first.get(1), Some(&Value::String("c".into())));
}
