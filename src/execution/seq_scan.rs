use std::sync::Arc;

use crate::catalog::{Catalog, ColMeta};
use crate::common::{DbError, Result, Rid};
use crate::storage::heap::{HeapFile, HeapScan, Record};

use super::predicate::{eval_conditions, Condition};
use super::Executor;

/// Sequential scan over one table, filtered by a conjunctive predicate set.
/// Each condition compares a column of the row to a literal or to another
/// column of the same row; an empty set matches everything.
pub struct SeqScanExecutor {
    file: Arc<HeapFile>,
    conds: Vec<Condition>,
    cols: Vec<ColMeta>,
    len: usize,
    scan: Option<HeapScan>,
    rid: Rid,
}

impl SeqScanExecutor {
    pub fn new(catalog: &Catalog, tab_name: &str, conds: Vec<Condition>) -> Result<Self> {
        let tab = catalog.table(tab_name)?;
        Ok(Self {
            file: Arc::clone(catalog.heap(tab_name)?),
            conds,
            cols: tab.cols.clone(),
            len: tab.record_size(),
            scan: None,
            rid: Rid::INVALID,
        })
    }

    /// RID of the row at the cursor.
    pub fn rid(&self) -> Rid {
        self.rid
    }

    /// Advances the cursor (from its current position) to the first row
    /// satisfying every condition.
    fn seek_match(&mut self) -> Result<()> {
        loop {
            let (at_end, rid) = {
                let scan = self
                    .scan
                    .as_ref()
                    .ok_or_else(|| DbError::Internal("scan used before begin".into()))?;
                (scan.is_end(), scan.rid())
            };
            if at_end {
                self.rid = Rid::INVALID;
                return Ok(());
            }

            let rec = self.file.get_record(rid)?;
            if self.conds.is_empty() || eval_conditions(&self.cols, rec.data(), &self.conds)? {
                self.rid = rid;
                return Ok(());
            }

            if let Some(scan) = self.scan.as_mut() {
                scan.next()?;
            }
        }
    }
}

impl Executor for SeqScanExecutor {
    fn begin(&mut self) -> Result<()> {
        self.scan = Some(HeapScan::new(Arc::clone(&self.file))?);
        self.seek_match()
    }

    fn next(&mut self) -> Result<()> {
        if self.is_end() {
            self.rid = Rid::INVALID;
            return Ok(());
        }
        if let Some(scan) = self.scan.as_mut() {
            scan.next()?;
        }
        self.seek_match()
    }

    fn current(&self) -> Result<Option<Record>> {
        if self.is_end() {
            return Ok(None);
        }
        Ok(Some(self.file.get_record(self.rid)?))
    }

    fn is_end(&self) -> bool {
        self.scan.as_ref().map_or(true, |s| s.is_end())
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn tuple_len(&self) -> usize {
        self.len
    }
}
