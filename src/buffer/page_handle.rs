use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard,
};

use crate::common::{FrameId, PageId};

use super::{BufferPoolManager, Frame};

/// Scoped pin on a buffer pool page.
///
/// Holding a handle keeps the frame pinned; dropping it performs exactly one
/// unpin, carrying the dirty flag accumulated through `data_mut` and
/// `mark_dirty`. Page bytes are reached through short-lived lock guards so
/// the handle itself can be kept across calls.
pub struct PageHandle<'a> {
    pool: &'a BufferPoolManager,
    frame: &'a Frame,
    page_id: PageId,
    frame_id: FrameId,
    dirty: bool,
}

impl<'a> PageHandle<'a> {
    pub(crate) fn new(
        pool: &'a BufferPoolManager,
        frame: &'a Frame,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Self {
        Self {
            pool,
            frame,
            page_id,
            frame_id,
            dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Read access to the page bytes.
    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.frame.data.read(), |b| &b[..])
    }

    /// Write access to the page bytes. Marks the handle dirty.
    pub fn data_mut(&mut self) -> MappedRwLockWriteGuard<'_, [u8]> {
        self.dirty = true;
        RwLockWriteGuard::map(self.frame.data.write(), |b| &mut b[..])
    }

    /// Records that the page was modified without going through `data_mut`.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Drop for PageHandle<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty);
    }
}
