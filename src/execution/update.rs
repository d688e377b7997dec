use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Catalog, ColMeta, IndexMeta, TabMeta};
use crate::common::{Context, Result, Rid};
use crate::index::IndexHandle;
use crate::storage::heap::{HeapFile, Record};

use super::predicate::SetClause;
use super::Executor;

/// Applies a list of assignments to a precomputed list of rows.
///
/// Index keys are materialized from the row bytes before any assignment is
/// applied, so an update that changes an indexed column removes the old
/// entry rather than orphaning it. New entries are inserted from the
/// post-update bytes after the heap row is rewritten.
pub struct UpdateExecutor {
    tab: TabMeta,
    file: Arc<HeapFile>,
    indexes: Vec<(IndexMeta, Arc<IndexHandle>)>,
    set_clauses: Vec<SetClause>,
    rids: Vec<Rid>,
    ctx: Context,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(
        catalog: &Catalog,
        tab_name: &str,
        set_clauses: Vec<SetClause>,
        rids: Vec<Rid>,
        ctx: Context,
    ) -> Result<Self> {
        Ok(Self {
            tab: catalog.table(tab_name)?.clone(),
            file: Arc::clone(catalog.heap(tab_name)?),
            indexes: catalog.table_indexes(tab_name)?,
            set_clauses,
            rids,
            ctx,
            done: false,
        })
    }
}

impl Executor for UpdateExecutor {
    fn begin(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }

        for &rid in &self.rids {
            let mut rec = self.file.get_record(rid)?;

            // keys of the pre-update row, one per index
            let old_keys: Vec<Vec<u8>> = self
                .indexes
                .iter()
                .map(|(ix_meta, _)| ix_meta.build_key(rec.data()))
                .collect();

            for ((_, handle), old_key) in self.indexes.iter().zip(&old_keys) {
                handle.delete_entry(old_key, &self.ctx)?;
            }

            for clause in &self.set_clauses {
                let col = self.tab.get_col(&clause.col_name)?;
                let bytes = clause.value.to_bytes(col.ty, col.len)?;
                rec.data_mut()[col.offset..col.offset + col.len].copy_from_slice(&bytes);
            }

            self.file.update_record(rid, rec.data())?;
            for (ix_meta, handle) in &self.indexes {
                let key = ix_meta.build_key(rec.data());
                handle.insert_entry(&key, rid, &self.ctx)?;
            }
        }

        debug!(table = %self.tab.name, rows = self.rids.len(), "updated rows");
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
