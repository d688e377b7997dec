use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{DbError, FileId, FrameId, PageId, Result, PAGE_SIZE};
use crate::storage::disk::DiskManager;

use super::{Frame, LruReplacer, PageHandle, Replacer};

/// Metadata for one frame, guarded by the pool latch.
#[derive(Clone, Copy)]
pub(crate) struct FrameMeta {
    pub(crate) page_id: PageId,
    pub(crate) pin_count: u32,
    pub(crate) is_dirty: bool,
}

impl FrameMeta {
    fn empty() -> Self {
        Self {
            page_id: PageId::INVALID,
            pin_count: 0,
            is_dirty: false,
        }
    }
}

/// Everything the pool latch protects: the page table, per-frame metadata,
/// the free-frame list, and the replacer.
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    meta: Vec<FrameMeta>,
    free_list: VecDeque<FrameId>,
    replacer: Box<dyn Replacer>,
}

/// BufferPoolManager caches disk pages in a fixed set of frames and mediates
/// all page I/O. Victims come from the free list first and the replacer
/// second; dirty victims are written back before reuse.
///
/// A single mutex covers the page table, the free list, frame metadata, and
/// the replacer. Frame contents sit behind per-frame locks so callers can
/// read and write page bytes while holding only a pin.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Arc<Frame>>,
    state: Mutex<PoolState>,
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    /// Creates a pool of `pool_size` frames over `disk_manager`, evicting
    /// with strict LRU.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        Self::with_replacer(pool_size, disk_manager, Box::new(LruReplacer::new()))
    }

    /// Creates a pool with a caller-supplied replacement policy.
    pub fn with_replacer(
        pool_size: usize,
        disk_manager: Arc<DiskManager>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        assert!(pool_size > 0, "buffer pool must have at least one frame");

        let frames = (0..pool_size).map(|_| Arc::new(Frame::new())).collect();
        let free_list = (0..pool_size).map(FrameId).collect();

        Self {
            pool_size,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                meta: vec![FrameMeta::empty(); pool_size],
                free_list,
                replacer,
            }),
            disk_manager,
        }
    }

    /// Fetches a page, pinning its frame. If the page is resident its pin
    /// count is bumped; otherwise a victim frame is claimed (writing the old
    /// contents back if dirty) and the page is read from disk.
    ///
    /// Fails with `BufferPoolExhausted` when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageHandle<'_>> {
        assert!(page_id.is_valid(), "cannot fetch the invalid page id");

        let mut st = self.state.lock();

        if let Some(&frame_id) = st.page_table.get(&page_id) {
            st.meta[frame_id.0].pin_count += 1;
            st.replacer.pin(frame_id);
            return Ok(self.handle(page_id, frame_id));
        }

        let frame_id = self.take_victim_frame(&mut st)?;

        let mut buf = [0u8; PAGE_SIZE];
        self.disk_manager
            .read_page(page_id.fd, page_id.page_no, &mut buf)?;
        self.frames[frame_id.0].copy_from(&buf);

        st.meta[frame_id.0] = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
        st.page_table.insert(page_id, frame_id);
        st.replacer.pin(frame_id);

        Ok(self.handle(page_id, frame_id))
    }

    /// Allocates a fresh page of `fd` into a victim frame, pinned and
    /// zeroed. The new page number comes from the disk manager.
    pub fn new_page(&self, fd: FileId) -> Result<PageHandle<'_>> {
        let mut st = self.state.lock();

        let frame_id = self.take_victim_frame(&mut st)?;
        let page_no = self.disk_manager.allocate_page(fd)?;
        let page_id = PageId::new(fd, page_no);

        self.frames[frame_id.0].reset();
        st.meta[frame_id.0] = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
        st.page_table.insert(page_id, frame_id);
        st.replacer.pin(frame_id);

        debug!(%page_id, %frame_id, "allocated new page");
        Ok(self.handle(page_id, frame_id))
    }

    /// Drops one pin on a resident page, OR-ing `is_dirty` into its dirty
    /// flag. Returns false if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut st = self.state.lock();

        let Some(&frame_id) = st.page_table.get(&page_id) else {
            return false;
        };
        let meta = &mut st.meta[frame_id.0];
        if meta.pin_count == 0 {
            return false;
        }

        meta.pin_count -= 1;
        if is_dirty {
            meta.is_dirty = true;
        }
        if meta.pin_count == 0 {
            st.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes a resident page to disk unconditionally and clears its dirty
    /// flag. Returns false if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut st = self.state.lock();

        let Some(&frame_id) = st.page_table.get(&page_id) else {
            return Ok(false);
        };

        let mut buf = [0u8; PAGE_SIZE];
        self.frames[frame_id.0].copy_to(&mut buf);
        self.disk_manager
            .write_page(page_id.fd, page_id.page_no, &buf)?;
        st.meta[frame_id.0].is_dirty = false;

        debug!(%page_id, "flushed page");
        Ok(true)
    }

    /// Evicts a page from the pool. Returns true if the page was not
    /// resident or was dropped; false if it is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut st = self.state.lock();

        let Some(&frame_id) = st.page_table.get(&page_id) else {
            return Ok(true);
        };
        if st.meta[frame_id.0].pin_count > 0 {
            return Ok(false);
        }

        if st.meta[frame_id.0].is_dirty {
            let mut buf = [0u8; PAGE_SIZE];
            self.frames[frame_id.0].copy_to(&mut buf);
            self.disk_manager
                .write_page(page_id.fd, page_id.page_no, &buf)?;
        }

        st.page_table.remove(&page_id);
        st.meta[frame_id.0] = FrameMeta::empty();
        self.frames[frame_id.0].reset();
        st.replacer.pin(frame_id);
        st.free_list.push_back(frame_id);
        Ok(true)
    }

    /// Writes every resident page of `fd` back to disk, clearing dirty
    /// flags.
    pub fn flush_all_pages(&self, fd: FileId) -> Result<()> {
        let mut st = self.state.lock();

        let targets: Vec<(PageId, FrameId)> = st
            .page_table
            .iter()
            .filter(|(pid, _)| pid.fd == fd)
            .map(|(&pid, &fid)| (pid, fid))
            .collect();

        for (page_id, frame_id) in targets {
            let mut buf = [0u8; PAGE_SIZE];
            self.frames[frame_id.0].copy_to(&mut buf);
            self.disk_manager
                .write_page(page_id.fd, page_id.page_no, &buf)?;
            st.meta[frame_id.0].is_dirty = false;
        }
        Ok(())
    }

    /// Pin count of a resident page, or `None` if the page is not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let st = self.state.lock();
        st.page_table
            .get(&page_id)
            .map(|&frame_id| st.meta[frame_id.0].pin_count)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }

    fn handle(&self, page_id: PageId, frame_id: FrameId) -> PageHandle<'_> {
        PageHandle::new(self, &self.frames[frame_id.0], page_id, frame_id)
    }

    /// Claims a reusable frame: free list first, replacer second. A dirty
    /// victim is written back and its mapping dropped before the frame is
    /// handed out.
    fn take_victim_frame(&self, st: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = st.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = st.replacer.victim().ok_or(DbError::BufferPoolExhausted)?;
        let old = st.meta[frame_id.0];
        if old.page_id.is_valid() {
            if old.is_dirty {
                let mut buf = [0u8; PAGE_SIZE];
                self.frames[frame_id.0].copy_to(&mut buf);
                self.disk_manager
                    .write_page(old.page_id.fd, old.page_id.page_no, &buf)?;
                debug!(page_id = %old.page_id, %frame_id, "wrote back dirty victim");
            }
            st.page_table.remove(&old.page_id);
        }
        Ok(frame_id)
    }
}
