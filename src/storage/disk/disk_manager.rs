use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::common::{DbError, FileId, PageNo, Result, PAGE_SIZE};

/// A file opened through the disk manager.
struct OpenFile {
    file: Mutex<File>,
    path: PathBuf,
    /// Next page number handed out by `allocate_page`. Seeded from the
    /// on-disk file size when the file is opened.
    next_page_no: AtomicI32,
}

struct Inner {
    files: HashMap<FileId, OpenFile>,
    path2fd: HashMap<PathBuf, FileId>,
}

struct LogFile {
    file: File,
    path: PathBuf,
}

/// DiskManager performs block-aligned page I/O against previously opened
/// files, hands out page numbers, and owns file lifecycle. There is no
/// caching at this layer; every request hits the OS.
///
/// The outer RwLock guards the fd maps; the per-file Mutex serializes the
/// file cursor.
pub struct DiskManager {
    inner: RwLock<Inner>,
    log: Mutex<Option<LogFile>>,
    next_fd: AtomicU32,
    num_reads: AtomicU32,
    num_writes: AtomicU32,
}

impl DiskManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                files: HashMap::new(),
                path2fd: HashMap::new(),
            }),
            log: Mutex::new(None),
            next_fd: AtomicU32::new(0),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        }
    }

    pub fn is_file(path: &Path) -> bool {
        path.is_file()
    }

    pub fn is_dir(path: &Path) -> bool {
        path.is_dir()
    }

    pub fn create_dir(path: &Path) -> Result<()> {
        fs::create_dir(path)?;
        Ok(())
    }

    pub fn destroy_dir(path: &Path) -> Result<()> {
        fs::remove_dir_all(path)?;
        Ok(())
    }

    /// Creates an empty file. Fails with `FileExists` if the path already
    /// names a file.
    pub fn create_file(&self, path: &Path) -> Result<()> {
        if Self::is_file(path) {
            return Err(DbError::FileExists(path.to_path_buf()));
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(())
    }

    /// Removes a file from disk. The file must exist and must not be open.
    pub fn destroy_file(&self, path: &Path) -> Result<()> {
        if !Self::is_file(path) {
            return Err(DbError::FileNotFound(path.to_path_buf()));
        }
        if self.inner.read().path2fd.contains_key(path) {
            return Err(DbError::FileNotClosed(path.to_path_buf()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Opens a file and returns its handle. Each path may be open at most
    /// once.
    pub fn open_file(&self, path: &Path) -> Result<FileId> {
        if !Self::is_file(path) {
            return Err(DbError::FileNotFound(path.to_path_buf()));
        }

        let mut inner = self.inner.write();
        if inner.path2fd.contains_key(path) {
            return Err(DbError::FileNotClosed(path.to_path_buf()));
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let size = file.metadata()?.len();
        let next_page_no = (size / PAGE_SIZE as u64) as i32;

        let fd = FileId(self.next_fd.fetch_add(1, Ordering::SeqCst));
        inner.path2fd.insert(path.to_path_buf(), fd);
        inner.files.insert(
            fd,
            OpenFile {
                file: Mutex::new(file),
                path: path.to_path_buf(),
                next_page_no: AtomicI32::new(next_page_no),
            },
        );

        debug!(%fd, path = %path.display(), next_page_no, "opened file");
        Ok(fd)
    }

    /// Closes an open file handle.
    pub fn close_file(&self, fd: FileId) -> Result<()> {
        let mut inner = self.inner.write();
        let open = inner.files.remove(&fd).ok_or(DbError::FileNotOpen(fd))?;
        inner.path2fd.remove(&open.path);
        open.file.lock().sync_all()?;
        Ok(())
    }

    /// Returns the path an open handle was opened with.
    pub fn file_path(&self, fd: FileId) -> Result<PathBuf> {
        let inner = self.inner.read();
        inner
            .files
            .get(&fd)
            .map(|f| f.path.clone())
            .ok_or(DbError::FileNotOpen(fd))
    }

    /// Reads exactly `buf.len()` bytes from page `page_no` of `fd`.
    /// A short read is fatal (`IoShort`).
    pub fn read_page(&self, fd: FileId, page_no: PageNo, buf: &mut [u8]) -> Result<()> {
        assert!(page_no >= 0, "page number must be non-negative");
        assert!(buf.len() <= PAGE_SIZE, "transfer may not exceed a page");

        let inner = self.inner.read();
        let open = inner.files.get(&fd).ok_or(DbError::FileNotOpen(fd))?;

        let mut file = open.file.lock();
        file.seek(SeekFrom::Start(page_no as u64 * PAGE_SIZE as u64))?;

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..])? {
                0 => break,
                n => total += n,
            }
        }
        if total != buf.len() {
            return Err(DbError::IoShort {
                expected: buf.len(),
                actual: total,
            });
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes exactly `buf.len()` bytes to page `page_no` of `fd`.
    pub fn write_page(&self, fd: FileId, page_no: PageNo, buf: &[u8]) -> Result<()> {
        assert!(page_no >= 0, "page number must be non-negative");
        assert!(buf.len() <= PAGE_SIZE, "transfer may not exceed a page");

        let inner = self.inner.read();
        let open = inner.files.get(&fd).ok_or(DbError::FileNotOpen(fd))?;

        let mut file = open.file.lock();
        file.seek(SeekFrom::Start(page_no as u64 * PAGE_SIZE as u64))?;
        file.write_all(buf)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Allocates the next page number of `fd`. The counter is monotonic;
    /// deallocation does not recycle numbers.
    pub fn allocate_page(&self, fd: FileId) -> Result<PageNo> {
        let inner = self.inner.read();
        let open = inner.files.get(&fd).ok_or(DbError::FileNotOpen(fd))?;
        Ok(open.next_page_no.fetch_add(1, Ordering::SeqCst))
    }

    /// Page deallocation is not supported at this layer.
    pub fn deallocate_page(&self, _fd: FileId, _page_no: PageNo) {}

    /// Opens the append-only log file.
    pub fn open_log(&self, path: &Path) -> Result<()> {
        if !Self::is_file(path) {
            return Err(DbError::FileNotFound(path.to_path_buf()));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        *self.log.lock() = Some(LogFile {
            file,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    pub fn close_log(&self) {
        *self.log.lock() = None;
    }

    /// Reads up to `buf.len()` log bytes starting at `offset`. Returns the
    /// number of bytes read, or `None` when `offset` is past end of file.
    pub fn read_log(&self, buf: &mut [u8], offset: u64) -> Result<Option<usize>> {
        let mut log = self.log.lock();
        let log = log
            .as_mut()
            .ok_or_else(|| DbError::Internal("log file not open".into()))?;

        let size = log.file.metadata()?.len();
        if offset > size {
            return Ok(None);
        }
        let n = buf.len().min((size - offset) as usize);
        if n == 0 {
            return Ok(Some(0));
        }

        log.file.seek(SeekFrom::Start(offset))?;
        log.file.read_exact(&mut buf[..n])?;
        Ok(Some(n))
    }

    /// Appends `buf` to the log file.
    pub fn write_log(&self, buf: &[u8]) -> Result<()> {
        let mut log = self.log.lock();
        let log = log
            .as_mut()
            .ok_or_else(|| DbError::Internal("log file not open".into()))?;

        log.file.seek(SeekFrom::End(0))?;
        log.file.write_all(buf)?;
        debug!(bytes = buf.len(), path = %log.path.display(), "appended to log");
        Ok(())
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl Default for DiskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_lifecycle_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let dm = DiskManager::new();

        assert!(matches!(
            dm.open_file(&path),
            Err(DbError::FileNotFound(_))
        ));
        dm.create_file(&path).unwrap();
        assert!(matches!(
            dm.create_file(&path),
            Err(DbError::FileExists(_))
        ));

        let fd = dm.open_file(&path).unwrap();
        assert!(matches!(
            dm.open_file(&path),
            Err(DbError::FileNotClosed(_))
        ));
        assert!(matches!(
            dm.destroy_file(&path),
            Err(DbError::FileNotClosed(_))
        ));

        dm.close_file(fd).unwrap();
        assert!(matches!(dm.close_file(fd), Err(DbError::FileNotOpen(_))));
        dm.destroy_file(&path).unwrap();
        assert!(matches!(
            dm.destroy_file(&path),
            Err(DbError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rw.dat");
        let dm = DiskManager::new();
        dm.create_file(&path).unwrap();
        let fd = dm.open_file(&path).unwrap();

        let mut page = [0u8; PAGE_SIZE];
        page[0] = 42;
        page[PAGE_SIZE - 1] = 128;
        dm.write_page(fd, 3, &page).unwrap();

        let mut back = [0u8; PAGE_SIZE];
        dm.read_page(fd, 3, &mut back).unwrap();
        assert_eq!(back[0], 42);
        assert_eq!(back[PAGE_SIZE - 1], 128);
        assert_eq!(dm.num_reads(), 1);
        assert_eq!(dm.num_writes(), 1);
    }

    #[test]
    fn test_short_read_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dat");
        let dm = DiskManager::new();
        dm.create_file(&path).unwrap();
        let fd = dm.open_file(&path).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        assert!(matches!(
            dm.read_page(fd, 0, &mut buf),
            Err(DbError::IoShort { .. })
        ));
    }

    #[test]
    fn test_allocate_page_seeded_from_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alloc.dat");
        let dm = DiskManager::new();
        dm.create_file(&path).unwrap();

        let fd = dm.open_file(&path).unwrap();
        assert_eq!(dm.allocate_page(fd).unwrap(), 0);
        assert_eq!(dm.allocate_page(fd).unwrap(), 1);
        dm.write_page(fd, 1, &[7u8; PAGE_SIZE]).unwrap();
        dm.close_file(fd).unwrap();

        // two pages on disk now, counter resumes at 2
        let fd = dm.open_file(&path).unwrap();
        assert_eq!(dm.allocate_page(fd).unwrap(), 2);
        dm.close_file(fd).unwrap();
    }

    #[test]
    fn test_log_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LOG_FILE");
        let dm = DiskManager::new();
        dm.create_file(&path).unwrap();
        dm.open_log(&path).unwrap();

        dm.write_log(b"hello").unwrap();
        dm.write_log(b" world").unwrap();

        let mut buf = [0u8; 16];
        let n = dm.read_log(&mut buf, 0).unwrap().unwrap();
        assert_eq!(&buf[..n], b"hello world");

        let n = dm.read_log(&mut buf, 6).unwrap().unwrap();
        assert_eq!(&buf[..n], b"world");

        // offset exactly at EOF reads zero bytes, past EOF is None
        assert_eq!(dm.read_log(&mut buf, 11).unwrap(), Some(0));
        assert_eq!(dm.read_log(&mut buf, 12).unwrap(), None);
    }
}
