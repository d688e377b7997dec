use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Catalog, ColMeta, IndexMeta, TabMeta};
use crate::common::{Context, DbError, Result, Rid};
use crate::index::IndexHandle;
use crate::storage::heap::{HeapFile, Record};

use super::predicate::Value;
use super::Executor;

/// Inserts one row: serializes the values per the table layout, places the
/// record in the heap, then adds an entry to every index on the table.
pub struct InsertExecutor {
    tab: TabMeta,
    file: Arc<HeapFile>,
    indexes: Vec<(IndexMeta, Arc<IndexHandle>)>,
    values: Vec<Value>,
    ctx: Context,
    rid: Rid,
    done: bool,
}

impl InsertExecutor {
    pub fn new(catalog: &Catalog, tab_name: &str, values: Vec<Value>, ctx: Context) -> Result<Self> {
        Ok(Self {
            tab: catalog.table(tab_name)?.clone(),
            file: Arc::clone(catalog.heap(tab_name)?),
            indexes: catalog.table_indexes(tab_name)?,
            values,
            ctx,
            rid: Rid::INVALID,
            done: false,
        })
    }

    /// RID of the inserted row, valid once the executor has run.
    pub fn rid(&self) -> Rid {
        self.rid
    }
}

impl Executor for InsertExecutor {
    fn begin(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        if self.values.len() != self.tab.cols.len() {
            return Err(DbError::Internal(format!(
                "expected {} values, got {}",
                self.tab.cols.len(),
                self.values.len()
            )));
        }

        let mut rec = Record::new(self.tab.record_size());
        for (col, value) in self.tab.cols.iter().zip(&self.values) {
            let bytes = value.to_bytes(col.ty, col.len)?;
            rec.data_mut()[col.offset..col.offset + col.len].copy_from_slice(&bytes);
        }

        let rid = self.file.insert_record(rec.data())?;
        for (ix_meta, handle) in &self.indexes {
            let key = ix_meta.build_key(rec.data());
            handle.insert_entry(&key, rid, &self.ctx)?;
        }

        debug!(table = %self.tab.name, %rid, "inserted row");
        self.rid = rid;
        self.done = true;
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        Ok(())
    }

    fn current(&self) -> Result<Option<Record>> {
        Ok(None)
    }

    fn is_end(&self) -> bool {
        self.done
    }

    fn cols(&self) -> &[ColMeta] {
        &[]
    }

    fn tuple_len(&self) -> usize {
        0
    }
}
