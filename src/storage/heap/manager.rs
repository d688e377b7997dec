use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferPoolManager;
use crate::common::{DbError, Result, HEAP_HEADER_PAGE, PAGE_SIZE};
use crate::storage::disk::DiskManager;

use super::{HeapFile, HeapFileHeader, FILE_HEADER_SIZE};

/// Creates, opens, closes, and destroys heap files.
pub struct HeapFileManager {
    disk_manager: Arc<DiskManager>,
    buffer_pool: Arc<BufferPoolManager>,
}

impl HeapFileManager {
    pub fn new(disk_manager: Arc<DiskManager>, buffer_pool: Arc<BufferPoolManager>) -> Self {
        Self {
            disk_manager,
            buffer_pool,
        }
    }

    /// Creates a heap file for records of `record_size` bytes and writes its
    /// initialized header page.
    pub fn create_file(&self, path: &Path, record_size: usize) -> Result<()> {
        let hdr = HeapFileHeader::new(record_size).ok_or_else(|| {
            DbError::Internal(format!(
                "record size {record_size} does not fit in a {PAGE_SIZE} byte page"
            ))
        })?;

        self.disk_manager.create_file(path)?;
        let fd = self.disk_manager.open_file(path)?;

        // the header page is written full-size so the page allocator counts it
        let mut page = [0u8; PAGE_SIZE];
        page[..FILE_HEADER_SIZE].copy_from_slice(&hdr.to_bytes());
        self.disk_manager.write_page(fd, HEAP_HEADER_PAGE, &page)?;
        self.disk_manager.close_file(fd)?;

        debug!(path = %path.display(), record_size, "created heap file");
        Ok(())
    }

    /// Opens an existing heap file and loads its header.
    pub fn open_file(&self, path: &Path) -> Result<HeapFile> {
        let fd = self.disk_manager.open_file(path)?;
        let mut buf = [0u8; FILE_HEADER_SIZE];
        self.disk_manager.read_page(fd, HEAP_HEADER_PAGE, &mut buf)?;
        let hdr = HeapFileHeader::from_bytes(&buf);

        Ok(HeapFile::new(
            fd,
            hdr,
            Arc::clone(&self.buffer_pool),
            Arc::clone(&self.disk_manager),
        ))
    }

    /// Persists the header, flushes every cached page of the file, and
    /// closes it.
    pub fn close_file(&self, file: &HeapFile) -> Result<()> {
        file.persist_header()?;
        self.buffer_pool.flush_all_pages(file.fd())?;
        self.disk_manager.close_file(file.fd())
    }

    /// Removes a heap file from disk. The file must be closed.
    pub fn destroy_file(&self, path: &Path) -> Result<()> {
        self.disk_manager.destroy_file(path)
    }
}
