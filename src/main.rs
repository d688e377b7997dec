use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stratadb::buffer::BufferPoolManager;
use stratadb::catalog::{Catalog, ColDef, ColType};
use stratadb::common::Context;
use stratadb::execution::{
    execute, CompOp, Condition, Executor, InsertExecutor, ProjectionExecutor, SeqScanExecutor,
    TabCol, Value,
};
use stratadb::storage::disk::DiskManager;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    println!("Stratadb - a disk-oriented RDBMS core in Rust");
    println!("=============================================\n");

    let disk_manager = Arc::new(DiskManager::new());
    let buffer_pool = Arc::new(BufferPoolManager::new(64, Arc::clone(&disk_manager)));
    let mut catalog = Catalog::new(".", disk_manager, buffer_pool);

    let db_name = "stratadb_demo";
    catalog.create_db(db_name).expect("create database");
    catalog.open_db(db_name).expect("open database");

    catalog
        .create_table(
            "emp",
            &[
                ColDef::new("id", ColType::Int, 4),
                ColDef::new("name", ColType::Str, 16),
                ColDef::new("dept", ColType::Int, 4),
            ],
        )
        .expect("create table");
    catalog.create_index("emp", &["id"]).expect("create index");

    let rows = [
        (1, "ada", 10),
        (2, "grace", 10),
        (3, "edsger", 20),
        (4, "barbara", 30),
    ];
    for (id, name, dept) in rows {
        let mut insert = InsertExecutor::new(
            &catalog,
            "emp",
            vec![Value::Int(id), Value::Str(name.into()), Value::Int(dept)],
            Context::default(),
        )
        .expect("build insert");
        execute(&mut insert).expect("run insert");
    }
    println!("inserted {} rows into emp", rows.len());

    // SELECT name, id FROM emp WHERE dept = 10
    let scan = SeqScanExecutor::new(
        &catalog,
        "emp",
        vec![Condition::with_value(
            TabCol::bare("dept"),
            CompOp::Eq,
            Value::Int(10),
        )],
    )
    .expect("build scan");
    let mut proj = ProjectionExecutor::new(
        Box::new(scan),
        &[TabCol::bare("name"), TabCol::bare("id")],
    )
    .expect("build projection");

    println!("\nemployees in dept 10:");
    let out_cols = proj.cols().to_vec();
    for row in execute(&mut proj).expect("run query") {
        let name_col = &out_cols[0];
        let id_col = &out_cols[1];
        let name_bytes = &row.data()[name_col.offset..name_col.offset + name_col.len];
        let name = String::from_utf8_lossy(name_bytes)
            .trim_end_matches('\0')
            .to_string();
        let id = i32::from_le_bytes(
            row.data()[id_col.offset..id_col.offset + 4]
                .try_into()
                .unwrap(),
        );
        println!("  - {name} (id {id})");
    }

    catalog.close_db().expect("close database");
    catalog.drop_db(db_name).expect("drop database");
    println!("\ndemo completed, database dropped");
}
