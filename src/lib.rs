//! Stratadb - the storage and execution core of a disk-oriented RDBMS
//!
//! The engine stores fixed-width records in bitmap-slotted heap files and
//! runs queries as pull-based executor trees over them, with all page I/O
//! mediated by a buffer pool.
//!
//! # Architecture
//!
//! Bottom up:
//!
//! - **Disk** (`storage::disk`): block-aligned page I/O against open files,
//!   a per-file page number allocator, file lifecycle, and append-only log
//!   I/O. `DiskManager` does no caching; every request hits the OS.
//!
//! - **Buffer Pool** (`buffer`): `BufferPoolManager` maps page identities to
//!   a fixed set of frames, pinning, evicting (LRU over unpin order via the
//!   `Replacer` contract), and writing back dirty frames. `PageHandle` is a
//!   scoped pin that unpins exactly once on drop.
//!
//! - **Heap** (`storage::heap`): `HeapFile` stores fixed-width records in
//!   bitmap-addressed slots, threading pages with empty slots onto a
//!   free-page chain for the insert fast path. `HeapScan` walks occupied
//!   slots in RID order.
//!
//! - **Index** (`index`): a unique ordered index per declared column list,
//!   with the type-aware comparator and the order-preserving key encoding
//!   shared by predicate evaluation.
//!
//! - **Catalog** (`catalog`): database, table, and index lifecycle; resolves
//!   table names to metadata and owns the open heap and index handles.
//!
//! - **Execution** (`execution`): tuple-at-a-time executors (seq scan,
//!   nested loop join, projection, insert, update, delete) that keep every
//!   table's indexes consistent with its heap rows.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stratadb::buffer::BufferPoolManager;
//! use stratadb::catalog::{Catalog, ColDef, ColType};
//! use stratadb::execution::{execute, InsertExecutor, SeqScanExecutor};
//! use stratadb::common::Context;
//! use stratadb::execution::Value;
//!
//! let disk_manager = Arc::new(stratadb::storage::disk::DiskManager::new());
//! let buffer_pool = Arc::new(BufferPoolManager::new(64, Arc::clone(&disk_manager)));
//! let mut catalog = Catalog::new(".", disk_manager, buffer_pool);
//!
//! catalog.create_db("demo").unwrap();
//! catalog.open_db("demo").unwrap();
//! catalog
//!     .create_table(
//!         "emp",
//!         &[ColDef::new("id", ColType::Int, 4), ColDef::new("name", ColType::Str, 16)],
//!     )
//!     .unwrap();
//!
//! let mut insert = InsertExecutor::new(
//!     &catalog,
//!     "emp",
//!     vec![Value::Int(1), Value::Str("ada".into())],
//!     Context::default(),
//! )
//! .unwrap();
//! execute(&mut insert).unwrap();
//!
//! let mut scan = SeqScanExecutor::new(&catalog, "emp", vec![]).unwrap();
//! let rows = execute(&mut scan).unwrap();
//! assert_eq!(rows.len(), 1);
//! catalog.close_db().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{Context, DbError, PageId, Result, Rid};
