//! Integration tests for the executor tree and its index maintenance

use std::sync::Arc;

use stratadb::buffer::BufferPoolManager;
use stratadb::catalog::{Catalog, ColDef, ColType};
use stratadb::common::{Context, Rid};
use stratadb::execution::{
    execute, CompOp, Condition, DeleteExecutor, Executor, InsertExecutor, NestedLoopJoinExecutor,
    ProjectionExecutor, SeqScanExecutor, SetClause, TabCol, UpdateExecutor, Value,
};
use stratadb::storage::disk::DiskManager;

fn setup() -> (Catalog, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let dm = Arc::new(DiskManager::new());
    let bpm = Arc::new(BufferPoolManager::new(64, Arc::clone(&dm)));
    let mut catalog = Catalog::new(dir.path(), dm, bpm);
    catalog.create_db("testdb").unwrap();
    catalog.open_db("testdb").unwrap();
    (catalog, dir)
}

fn insert_row(catalog: &Catalog, tab: &str, values: Vec<Value>) -> Rid {
    let mut ins = InsertExecutor::new(catalog, tab, values, Context::default()).unwrap();
    execute(&mut ins).unwrap();
    ins.rid()
}

fn int_at(rec: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(rec[offset..offset + 4].try_into().unwrap())
}

/// Table of three int columns with the given rows.
fn int3_table(catalog: &mut Catalog, name: &str, rows: &[(i32, i32, i32)]) {
    catalog
        .create_table(
            name,
            &[
                ColDef::new("a", ColType::Int, 4),
                ColDef::new("b", ColType::Int, 4),
                ColDef::new("c", ColType::Int, 4),
            ],
        )
        .unwrap();
    for &(a, b, c) in rows {
        insert_row(
            catalog,
            name,
            vec![Value::Int(a), Value::Int(b), Value::Int(c)],
        );
    }
}

#[test]
fn test_seq_scan_with_literal_predicate() {
    let (mut catalog, _dir) = setup();
    int3_table(
        &mut catalog,
        "t",
        &[(1, 10, 0), (2, 20, 0), (3, 30, 0), (4, 40, 0)],
    );

    let mut scan = SeqScanExecutor::new(
        &catalog,
        "t",
        vec![Condition::with_value(
            TabCol::bare("b"),
            CompOp::Gt,
            Value::Int(20),
        )],
    )
    .unwrap();

    let rows = execute(&mut scan).unwrap();
    let got: Vec<i32> = rows.iter().map(|r| int_at(r.data(), 0)).collect();
    assert_eq!(got, vec![3, 4]);
}

#[test]
fn test_seq_scan_with_column_to_column_predicate() {
    let (mut catalog, _dir) = setup();
    int3_table(&mut catalog, "t", &[(1, 1, 0), (2, 5, 0), (7, 7, 0)]);

    let mut scan = SeqScanExecutor::new(
        &catalog,
        "t",
        vec![Condition::with_col(
            TabCol::bare("a"),
            CompOp::Eq,
            TabCol::bare("b"),
        )],
    )
    .unwrap();

    let rows = execute(&mut scan).unwrap();
    let got: Vec<i32> = rows.iter().map(|r| int_at(r.data(), 0)).collect();
    assert_eq!(got, vec![1, 7]);
}

#[test]
fn test_seq_scan_empty_predicate_matches_all() {
    let (mut catalog, _dir) = setup();
    int3_table(&mut catalog, "t", &[(1, 0, 0), (2, 0, 0)]);

    let mut scan = SeqScanExecutor::new(&catalog, "t", vec![]).unwrap();
    assert_eq!(execute(&mut scan).unwrap().len(), 2);
}

#[test]
fn test_projection_reorders_columns() {
    let (mut catalog, _dir) = setup();
    int3_table(&mut catalog, "t", &[(1, 2, 3), (4, 5, 6)]);

    let scan = SeqScanExecutor::new(&catalog, "t", vec![]).unwrap();
    let mut proj =
        ProjectionExecutor::new(Box::new(scan), &[TabCol::bare("c"), TabCol::bare("a")]).unwrap();
    assert_eq!(proj.tuple_len(), 8);

    let rows = execute(&mut proj).unwrap();
    let got: Vec<(i32, i32)> = rows
        .iter()
        .map(|r| (int_at(r.data(), 0), int_at(r.data(), 4)))
        .collect();
    assert_eq!(got, vec![(3, 1), (6, 4)]);
}

#[test]
fn test_nested_loop_join() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table("r", &[ColDef::new("x", ColType::Int, 4)])
        .unwrap();
    catalog
        .create_table("s", &[ColDef::new("y", ColType::Int, 4)])
        .unwrap();
    for x in [1, 2] {
        insert_row(&catalog, "r", vec![Value::Int(x)]);
    }
    for y in [1, 3] {
        insert_row(&catalog, "s", vec![Value::Int(y)]);
    }

    let left = SeqScanExecutor::new(&catalog, "r", vec![]).unwrap();
    let right = SeqScanExecutor::new(&catalog, "s", vec![]).unwrap();
    let mut join = NestedLoopJoinExecutor::new(
        Box::new(left),
        Box::new(right),
        vec![Condition::with_col(
            TabCol::new("r", "x"),
            CompOp::Eq,
            TabCol::new("s", "y"),
        )],
    );

    join.begin().unwrap();
    assert!(!join.is_end());
    let row = join.current().unwrap().unwrap();
    assert_eq!(join.tuple_len(), 8);
    assert_eq!((int_at(row.data(), 0), int_at(row.data(), 4)), (1, 1));

    join.next().unwrap();
    assert!(join.is_end());
    assert!(join.current().unwrap().is_none());
}

#[test]
fn test_join_without_predicate_is_cartesian() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table("r", &[ColDef::new("x", ColType::Int, 4)])
        .unwrap();
    catalog
        .create_table("s", &[ColDef::new("y", ColType::Int, 4)])
        .unwrap();
    for x in [1, 2, 3] {
        insert_row(&catalog, "r", vec![Value::Int(x)]);
    }
    for y in [10, 20] {
        insert_row(&catalog, "s", vec![Value::Int(y)]);
    }

    let left = SeqScanExecutor::new(&catalog, "r", vec![]).unwrap();
    let right = SeqScanExecutor::new(&catalog, "s", vec![]).unwrap();
    let mut join = NestedLoopJoinExecutor::new(Box::new(left), Box::new(right), vec![]);

    assert_eq!(execute(&mut join).unwrap().len(), 6);
}

#[test]
fn test_join_with_empty_inner_is_empty() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table("r", &[ColDef::new("x", ColType::Int, 4)])
        .unwrap();
    catalog
        .create_table("s", &[ColDef::new("y", ColType::Int, 4)])
        .unwrap();
    insert_row(&catalog, "r", vec![Value::Int(1)]);

    let left = SeqScanExecutor::new(&catalog, "r", vec![]).unwrap();
    let right = SeqScanExecutor::new(&catalog, "s", vec![]).unwrap();
    let mut join = NestedLoopJoinExecutor::new(Box::new(left), Box::new(right), vec![]);

    assert!(execute(&mut join).unwrap().is_empty());
}

#[test]
fn test_insert_maintains_indexes() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table(
            "emp",
            &[
                ColDef::new("id", ColType::Int, 4),
                ColDef::new("dept", ColType::Int, 4),
            ],
        )
        .unwrap();
    catalog.create_index("emp", &["id"]).unwrap();

    let mut rids = Vec::new();
    for id in [5, 1, 9] {
        rids.push(insert_row(
            &catalog,
            "emp",
            vec![Value::Int(id), Value::Int(0)],
        ));
    }

    let ix = catalog.index("emp_id").unwrap();
    assert_eq!(ix.len(), 3);
    assert_eq!(ix.lookup(&5i32.to_le_bytes()), Some(rids[0]));
    assert_eq!(ix.lookup(&1i32.to_le_bytes()), Some(rids[1]));
    assert_eq!(ix.lookup(&9i32.to_le_bytes()), Some(rids[2]));

    // ordered iteration follows key order, not insertion order
    let in_order: Vec<Rid> = ix.entries().into_iter().map(|(_, rid)| rid).collect();
    assert_eq!(in_order, vec![rids[1], rids[0], rids[2]]);
}

#[test]
fn test_delete_removes_index_entries_then_rows() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table(
            "emp",
            &[
                ColDef::new("id", ColType::Int, 4),
                ColDef::new("dept", ColType::Int, 4),
            ],
        )
        .unwrap();
    catalog.create_index("emp", &["id"]).unwrap();

    let mut rids = Vec::new();
    for id in [1, 2, 3] {
        rids.push(insert_row(
            &catalog,
            "emp",
            vec![Value::Int(id), Value::Int(0)],
        ));
    }

    let mut del =
        DeleteExecutor::new(&catalog, "emp", vec![rids[1]], Context::default()).unwrap();
    execute(&mut del).unwrap();

    let ix = catalog.index("emp_id").unwrap();
    assert_eq!(ix.lookup(&2i32.to_le_bytes()), None);
    assert_eq!(ix.len(), 2);

    let mut scan = SeqScanExecutor::new(&catalog, "emp", vec![]).unwrap();
    let remaining: Vec<i32> = execute(&mut scan)
        .unwrap()
        .iter()
        .map(|r| int_at(r.data(), 0))
        .collect();
    assert_eq!(remaining, vec![1, 3]);
}

#[test]
fn test_update_rewrites_rows_in_place() {
    let (mut catalog, _dir) = setup();
    int3_table(&mut catalog, "t", &[(1, 10, 0), (2, 20, 0)]);

    let rid = Rid::new(1, 1);
    let mut upd = UpdateExecutor::new(
        &catalog,
        "t",
        vec![SetClause::new("b", Value::Int(99))],
        vec![rid],
        Context::default(),
    )
    .unwrap();
    execute(&mut upd).unwrap();

    let rec = catalog.heap("t").unwrap().get_record(rid).unwrap();
    assert_eq!(int_at(rec.data(), 0), 2);
    assert_eq!(int_at(rec.data(), 4), 99);
}

#[test]
fn test_update_of_indexed_column_moves_the_entry() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table(
            "emp",
            &[
                ColDef::new("id", ColType::Int, 4),
                ColDef::new("dept", ColType::Int, 4),
            ],
        )
        .unwrap();
    catalog.create_index("emp", &["id"]).unwrap();

    let rid = insert_row(&catalog, "emp", vec![Value::Int(2), Value::Int(0)]);
    insert_row(&catalog, "emp", vec![Value::Int(3), Value::Int(0)]);

    let mut upd = UpdateExecutor::new(
        &catalog,
        "emp",
        vec![SetClause::new("id", Value::Int(20))],
        vec![rid],
        Context::default(),
    )
    .unwrap();
    execute(&mut upd).unwrap();

    let ix = catalog.index("emp_id").unwrap();
    // the old key is gone, not orphaned
    assert_eq!(ix.lookup(&2i32.to_le_bytes()), None);
    assert_eq!(ix.lookup(&20i32.to_le_bytes()), Some(rid));
    assert_eq!(ix.len(), 2);
}

#[test]
fn test_update_of_unindexed_column_keeps_entry() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table(
            "emp",
            &[
                ColDef::new("id", ColType::Int, 4),
                ColDef::new("dept", ColType::Int, 4),
            ],
        )
        .unwrap();
    catalog.create_index("emp", &["id"]).unwrap();

    let rid = insert_row(&catalog, "emp", vec![Value::Int(7), Value::Int(1)]);

    let mut upd = UpdateExecutor::new(
        &catalog,
        "emp",
        vec![SetClause::new("dept", Value::Int(42))],
        vec![rid],
        Context::default(),
    )
    .unwrap();
    execute(&mut upd).unwrap();

    let ix = catalog.index("emp_id").unwrap();
    assert_eq!(ix.lookup(&7i32.to_le_bytes()), Some(rid));

    let rec = catalog.heap("emp").unwrap().get_record(rid).unwrap();
    assert_eq!(int_at(rec.data(), 4), 42);
}

#[test]
fn test_composite_index_key_order() {
    let (mut catalog, _dir) = setup();
    catalog
        .create_table(
            "emp",
            &[
                ColDef::new("dept", ColType::Int, 4),
                ColDef::new("id", ColType::Int, 4),
            ],
        )
        .unwrap();
    catalog.create_index("emp", &["dept", "id"]).unwrap();

    let r1 = insert_row(&catalog, "emp", vec![Value::Int(2), Value::Int(1)]);
    let r2 = insert_row(&catalog, "emp", vec![Value::Int(1), Value::Int(9)]);
    let r3 = insert_row(&catalog, "emp", vec![Value::Int(1), Value::Int(3)]);

    let ix = catalog.index("emp_dept_id").unwrap();
    let in_order: Vec<Rid> = ix.entries().into_iter().map(|(_, rid)| rid).collect();
    // (1,3), (1,9), (2,1)
    assert_eq!(in_order, vec![r3, r2, r1]);
}
