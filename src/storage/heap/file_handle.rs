use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BufferPoolManager, PageHandle};
use crate::common::{
    bitmap, DbError, FileId, PageNo, Result, Rid, FIRST_RECORD_PAGE, HEAP_HEADER_PAGE, NO_PAGE,
};
use crate::storage::disk::DiskManager;

use super::{HeapFileHeader, HeapPageMut, PageLayout, Record};

/// An open heap file of fixed-width records.
///
/// Record pages carry an occupancy bitmap and a `next_free_page_no` link;
/// pages with at least one empty slot are chained into a free list headed by
/// the file header's `first_free_page_no`. The header lives on page 0 and is
/// written straight through the disk manager, never through the buffer pool,
/// so exactly one copy of it exists.
///
/// The header mutex serializes header readers against the single writer this
/// layer assumes; it provides no isolation between concurrent writers.
pub struct HeapFile {
    fd: FileId,
    header: Mutex<HeapFileHeader>,
    buffer_pool: Arc<BufferPoolManager>,
    disk_manager: Arc<DiskManager>,
}

impl HeapFile {
    pub(crate) fn new(
        fd: FileId,
        header: HeapFileHeader,
        buffer_pool: Arc<BufferPoolManager>,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        Self {
            fd,
            header: Mutex::new(header),
            buffer_pool,
            disk_manager,
        }
    }

    pub fn fd(&self) -> FileId {
        self.fd
    }

    pub fn record_size(&self) -> usize {
        self.header.lock().record_size as usize
    }

    pub fn records_per_page(&self) -> usize {
        self.header.lock().records_per_page as usize
    }

    pub fn num_pages(&self) -> PageNo {
        self.header.lock().num_pages
    }

    pub fn first_free_page_no(&self) -> PageNo {
        self.header.lock().first_free_page_no
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout::from(&*self.header.lock())
    }

    /// Copies the record at `rid` out of its page.
    pub fn get_record(&self, rid: Rid) -> Result<Record> {
        let (layout, num_pages) = self.snapshot();
        let handle = self.fetch_page_inner(rid.page_no, num_pages)?;
        let data = handle.data();
        let page = super::HeapPageRef::new(&data, layout);
        Ok(Record::from_bytes(page.slot(rid.slot_no as usize)))
    }

    /// Inserts a record, returning its RID.
    ///
    /// Takes the head of the free list, or creates and links a fresh page
    /// when the list is empty. A page that becomes full is unlinked.
    pub fn insert_record(&self, buf: &[u8]) -> Result<Rid> {
        let mut hdr = self.header.lock();
        let layout = PageLayout::from(&*hdr);
        assert_eq!(buf.len(), layout.record_size, "record size mismatch");

        let (mut handle, page_no) = if hdr.first_free_page_no == NO_PAGE {
            let mut handle = self.buffer_pool.new_page(self.fd)?;
            let page_no = handle.page_id().page_no;
            debug_assert_eq!(page_no, hdr.num_pages);
            {
                let mut data = handle.data_mut();
                HeapPageMut::new(&mut data, layout).init();
            }
            hdr.num_pages += 1;
            hdr.first_free_page_no = page_no;
            self.write_header(&hdr)?;
            debug!(fd = %self.fd, page_no, "heap grew by one page");
            (handle, page_no)
        } else {
            let page_no = hdr.first_free_page_no;
            (self.fetch_page_inner(page_no, hdr.num_pages)?, page_no)
        };

        let mut now_full = false;
        let slot_no;
        {
            let mut data = handle.data_mut();
            let mut page = HeapPageMut::new(&mut data, layout);

            let slot = bitmap::first_zero(page.bitmap(), layout.records_per_page)
                .ok_or_else(|| DbError::Internal("page on free list has no empty slot".into()))?;
            bitmap::set(page.bitmap_mut(), slot);
            page.slot_mut(slot).copy_from_slice(buf);
            page.set_num_records(page.num_records() + 1);

            if page.num_records() as usize == layout.records_per_page {
                hdr.first_free_page_no = page.next_free_page_no();
                page.set_next_free_page_no(NO_PAGE);
                now_full = true;
            }
            slot_no = slot as i32;
        }
        if now_full {
            self.write_header(&hdr)?;
        }

        Ok(Rid::new(page_no, slot_no))
    }

    /// Clears the slot at `rid`. A page that had been full is relinked onto
    /// the free list, unless it is already on it.
    pub fn delete_record(&self, rid: Rid) -> Result<()> {
        let mut hdr = self.header.lock();
        let layout = PageLayout::from(&*hdr);
        let mut handle = self.fetch_page_inner(rid.page_no, hdr.num_pages)?;

        let mut relinked = false;
        {
            let mut data = handle.data_mut();
            let mut page = HeapPageMut::new(&mut data, layout);

            let was_full = page.num_records() as usize == layout.records_per_page;
            bitmap::reset(page.bitmap_mut(), rid.slot_no as usize);
            page.set_num_records(page.num_records() - 1);

            // `next_free_page_no == NO_PAGE` alone cannot distinguish the
            // list tail from an unlisted page, so also check the head.
            if was_full
                && page.next_free_page_no() == NO_PAGE
                && hdr.first_free_page_no != rid.page_no
            {
                page.set_next_free_page_no(hdr.first_free_page_no);
                hdr.first_free_page_no = rid.page_no;
                relinked = true;
            }
        }
        if relinked {
            self.write_header(&hdr)?;
            debug!(fd = %self.fd, page_no = rid.page_no, "page relinked onto free list");
        }
        Ok(())
    }

    /// Overwrites the slot at `rid` in place. Bitmap and counts are
    /// untouched; the caller must ensure the slot is occupied.
    pub fn update_record(&self, rid: Rid, buf: &[u8]) -> Result<()> {
        let (layout, num_pages) = self.snapshot();
        assert_eq!(buf.len(), layout.record_size, "record size mismatch");

        let mut handle = self.fetch_page_inner(rid.page_no, num_pages)?;
        let mut data = handle.data_mut();
        let mut page = HeapPageMut::new(&mut data, layout);
        page.slot_mut(rid.slot_no as usize).copy_from_slice(buf);
        Ok(())
    }

    /// Fetches a record page through the buffer pool, range-checked against
    /// the current page count.
    pub fn fetch_page_handle(&self, page_no: PageNo) -> Result<PageHandle<'_>> {
        let num_pages = self.header.lock().num_pages;
        self.fetch_page_inner(page_no, num_pages)
    }

    /// Writes the current in-memory header to page 0.
    pub(crate) fn persist_header(&self) -> Result<()> {
        let hdr = self.header.lock();
        self.write_header(&hdr)
    }

    fn snapshot(&self) -> (PageLayout, PageNo) {
        let hdr = self.header.lock();
        (PageLayout::from(&*hdr), hdr.num_pages)
    }

    fn fetch_page_inner(&self, page_no: PageNo, num_pages: PageNo) -> Result<PageHandle<'_>> {
        if !(FIRST_RECORD_PAGE..num_pages).contains(&page_no) {
            return Err(DbError::PageNotExist(page_no));
        }
        self.buffer_pool
            .fetch_page(crate::common::PageId::new(self.fd, page_no))
            .map_err(|e| match e {
                DbError::BufferPoolExhausted => DbError::PageNotExist(page_no),
                other => other,
            })
    }

    fn write_header(&self, hdr: &HeapFileHeader) -> Result<()> {
        self.disk_manager
            .write_page(self.fd, HEAP_HEADER_PAGE, &hdr.to_bytes())
    }
}
