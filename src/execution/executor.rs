use crate::catalog::ColMeta;
use crate::common::Result;
use crate::storage::heap::Record;

/// A pull-based iterator node of the plan tree.
///
/// `begin` positions the node on its first output row, `next` advances it,
/// `current` materializes the row at the cursor, and `is_end` reports
/// exhaustion. Composite nodes own their children exclusively.
pub trait Executor {
    /// Positions the executor on its first row. Mutation executors perform
    /// their entire effect here and then read as exhausted.
    fn begin(&mut self) -> Result<()>;

    /// Advances to the next row.
    fn next(&mut self) -> Result<()>;

    /// The row at the cursor, or `None` when exhausted or when the node
    /// produces no rows.
    fn current(&self) -> Result<Option<Record>>;

    fn is_end(&self) -> bool;

    /// Output schema. Offsets are relative to the produced record.
    fn cols(&self) -> &[ColMeta];

    /// Width of a produced record in bytes.
    fn tuple_len(&self) -> usize;
}

/// Drives a root executor to completion, collecting its output rows.
pub fn execute(root: &mut dyn Executor) -> Result<Vec<Record>> {
    root.begin()?;
    let mut rows = Vec::new();
    while !root.is_end() {
        if let Some(rec) = root.current()? {
            rows.push(rec);
        }
        root.next()?;
    }
    Ok(rows)
}
