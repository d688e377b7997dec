use crate::catalog::ColMeta;
use crate::common::Result;
use crate::storage::heap::Record;

use super::predicate::TabCol;
use super::Executor;

/// Rewrites each upstream record to the schema induced by the selected
/// columns. Pure passthrough for cursor movement.
pub struct ProjectionExecutor {
    child: Box<dyn Executor>,
    cols: Vec<ColMeta>,
    len: usize,
    /// For each output column, its index in the child's schema.
    sel_idxs: Vec<usize>,
}

impl ProjectionExecutor {
    pub fn new(child: Box<dyn Executor>, sel_cols: &[TabCol]) -> Result<Self> {
        let child_cols = child.cols();

        let mut cols = Vec::with_capacity(sel_cols.len());
        let mut sel_idxs = Vec::with_capacity(sel_cols.len());
        let mut offset = 0;
        for sel in sel_cols {
            let idx = child_cols
                .iter()
                .position(|c| {
                    c.name == sel.col_name
                        && (sel.tab_name.is_empty() || c.tab_name == sel.tab_name)
                })
                .ok_or_else(|| crate::common::DbError::ColumnNotFound(sel.to_string()))?;

            let mut col = child_cols[idx].clone();
            col.offset = offset;
            offset += col.len;
            sel_idxs.push(idx);
            cols.push(col);
        }

        Ok(Self {
            child,
            cols,
            len: offset,
            sel_idxs,
        })
    }
}

impl Executor for ProjectionExecutor {
    fn begin(&mut self) -> Result<()> {
        self.child.begin()
    }

    fn next(&mut self) -> Result<()> {
        self.child.next()
    }

    fn current(&self) -> Result<Option<Record>> {
        let Some(src) = self.child.current()? else {
            return Ok(None);
        };

        let mut out = Record::new(self.len);
        let child_cols = self.child.cols();
        for (out_col, &idx) in self.cols.iter().zip(&self.sel_idxs) {
            let src_col = &child_cols[idx];
            out.data_mut()[out_col.offset..out_col.offset + out_col.len]
                .copy_from_slice(&src.data()[src_col.offset..src_col.offset + src_col.len]);
        }
        Ok(Some(out))
    }

    fn is_end(&self) -> bool {
        self.child.is_end()
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn tuple_len(&self) -> usize {
        self.len
    }
}
