use std::sync::Arc;

use crate::common::{bitmap, Result, Rid, FIRST_RECORD_PAGE, NO_PAGE, NO_SLOT};

use super::{HeapFile, HeapPageRef};

/// Forward cursor over the occupied slots of a heap file.
///
/// Construction positions the cursor on the first occupied RID; `next` moves
/// to the following one. The page upper bound is re-read from the live
/// header as pages are visited, so growth during a scan is at best
/// opportunistically visible.
pub struct HeapScan {
    file: Arc<HeapFile>,
    rid: Rid,
}

impl HeapScan {
    pub fn new(file: Arc<HeapFile>) -> Result<Self> {
        let mut scan = Self {
            file,
            rid: Rid::new(FIRST_RECORD_PAGE, NO_SLOT),
        };
        scan.advance()?;
        Ok(scan)
    }

    /// The RID the cursor currently points at.
    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn is_end(&self) -> bool {
        self.rid.page_no == NO_PAGE
    }

    /// Moves to the next occupied slot, or to the end sentinel.
    pub fn next(&mut self) -> Result<()> {
        if self.is_end() {
            return Ok(());
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<()> {
        let layout = self.file.layout();
        let mut page_no = self.rid.page_no;
        let mut after = self.rid.slot_no;

        while page_no < self.file.num_pages() {
            let handle = self.file.fetch_page_handle(page_no)?;
            let data = handle.data();
            let page = HeapPageRef::new(&data, layout);
            if let Some(slot) = bitmap::next_set(page.bitmap(), layout.records_per_page, after) {
                self.rid = Rid::new(page_no, slot as i32);
                return Ok(());
            }
            page_no += 1;
            after = NO_SLOT;
        }

        self.rid = Rid::new(NO_PAGE, NO_SLOT);
        Ok(())
    }
}
