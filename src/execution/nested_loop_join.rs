use crate::catalog::ColMeta;
use crate::common::Result;
use crate::index::key::compare_values;
use crate::storage::heap::Record;

use super::predicate::{find_col, Condition, Rhs};
use super::Executor;

/// Nested loop join: the Cartesian product of the left (outer) and right
/// (inner) children, filtered by a conjunctive predicate set whose sides
/// straddle the two children.
///
/// The result schema is the left columns followed by the right columns
/// rebased by the left tuple length. The join is terminal when the left
/// child is terminal.
pub struct NestedLoopJoinExecutor {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    conds: Vec<Condition>,
    cols: Vec<ColMeta>,
    len: usize,
    left_len: usize,
}

impl NestedLoopJoinExecutor {
    pub fn new(left: Box<dyn Executor>, right: Box<dyn Executor>, conds: Vec<Condition>) -> Self {
        let left_len = left.tuple_len();
        let len = left_len + right.tuple_len();

        let mut cols = left.cols().to_vec();
        for right_col in right.cols() {
            let mut col = right_col.clone();
            col.offset += left_len;
            cols.push(col);
        }

        Self {
            left,
            right,
            conds,
            cols,
            len,
            left_len,
        }
    }

    /// Column bytes out of the pair of child records, using the rebased
    /// offsets of the combined schema.
    fn side_bytes<'r>(&self, col: &ColMeta, left: &'r [u8], right: &'r [u8]) -> &'r [u8] {
        if col.offset < self.left_len {
            &left[col.offset..col.offset + col.len]
        } else {
            let off = col.offset - self.left_len;
            &right[off..off + col.len]
        }
    }

    fn eval_cond(&self, cond: &Condition, left: &[u8], right: &[u8]) -> Result<bool> {
        let lhs = find_col(&self.cols, &cond.lhs_col)?;
        let lhs_bytes = self.side_bytes(lhs, left, right);

        let ord = match &cond.rhs {
            Rhs::Value(v) => {
                let rhs_bytes = v.to_bytes(lhs.ty, lhs.len)?;
                compare_values(lhs_bytes, &rhs_bytes, lhs.ty, lhs.len)
            }
            Rhs::Col(c) => {
                let rhs = find_col(&self.cols, c)?;
                let rhs_bytes = self.side_bytes(rhs, left, right);
                compare_values(lhs_bytes, rhs_bytes, lhs.ty, lhs.len.min(rhs.len))
            }
        };
        Ok(cond.op.matches(ord))
    }

    fn eval_conds(&self, left: &[u8], right: &[u8]) -> Result<bool> {
        for cond in &self.conds {
            if !self.eval_cond(cond, left, right)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs the outer/inner loop from the current child positions until a
    /// pair satisfies the predicate or the outer child is exhausted.
    fn seek_match(&mut self, advance_inner: bool) -> Result<()> {
        if advance_inner {
            self.right.next()?;
        }

        loop {
            if self.left.is_end() {
                return Ok(());
            }
            let Some(left_rec) = self.left.current()? else {
                return Ok(());
            };

            while !self.right.is_end() {
                let Some(right_rec) = self.right.current()? else {
                    break;
                };
                if self.eval_conds(left_rec.data(), right_rec.data())? {
                    return Ok(());
                }
                self.right.next()?;
            }

            self.left.next()?;
            if self.left.is_end() {
                return Ok(());
            }
            self.right.begin()?;
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn begin(&mut self) -> Result<()> {
        self.left.begin()?;
        self.right.begin()?;
        if !self.left.is_end() {
            self.seek_match(false)?;
        }
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        if self.is_end() {
            return Ok(());
        }
        self.seek_match(true)
    }

    fn current(&self) -> Result<Option<Record>> {
        if self.is_end() {
            return Ok(None);
        }
        let (Some(left_rec), Some(right_rec)) = (self.left.current()?, self.right.current()?)
        else {
            return Ok(None);
        };

        let mut out = Record::new(self.len);
        out.data_mut()[..self.left_len].copy_from_slice(left_rec.data());
        out.data_mut()[self.left_len..].copy_from_slice(right_rec.data());
        Ok(Some(out))
    }

    fn is_end(&self) -> bool {
        self.left.is_end()
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn tuple_len(&self) -> usize {
        self.len
    }
}
