use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Catalog, ColMeta, IndexMeta, TabMeta};
use crate::common::{Context, Result, Rid};
use crate::index::IndexHandle;
use crate::storage::heap::{HeapFile, Record};

use super::Executor;

/// Deletes a precomputed list of rows.
///
/// For each RID the live row is read first, every index entry derived from
/// it is removed, and only then is the heap slot vacated. The order is
/// load-bearing: the key material comes from the live row.
pub struct DeleteExecutor {
    tab: TabMeta,
    file: Arc<HeapFile>,
    indexes: Vec<(IndexMeta, Arc<IndexHandle>)>,
    rids: Vec<Rid>,
    ctx: Context,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(catalog: &Catalog, tab_name: &str, rids: Vec<Rid>, ctx: Context) -> Result<Self> {
        Ok(Self {
            tab: catalog.table(tab_name)?.clone(),
            file: Arc::clone(catalog.heap(tab_name)?),
            indexes: catalog.table_indexes(tab_name)?,
            rids,
            ctx,
            done: false,
        })
    }
}

impl Executor for DeleteExecutor {
    fn begin(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }

        for &rid in &self.rids {
            let rec = self.file.get_record(rid)?;

            for (ix_meta, handle) in &self.indexes {
                let key = ix_meta.build_key(rec.data());
                handle.delete_entry(&key, &self.ctx)?;
            }
            self.file.delete_record(rid)?;
        }

        debug!(table = %self.tab.name, rows = self.rids.len(), "deleted rows");
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
