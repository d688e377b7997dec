/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Sentinel page number terminating free-page chains and exhausted scans
pub const NO_PAGE: PageNo = -1;

/// Sentinel slot number ("one before the first slot" for scan cursors)
pub const NO_SLOT: i32 = -1;

/// Page 0 of every heap file holds the file header
pub const HEAP_HEADER_PAGE: PageNo = 0;

/// First page that can hold records
pub const FIRST_RECORD_PAGE: PageNo = 1;

/// Default buffer pool size (number of frames)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 64;

/// Catalog file name inside a database directory
pub const DB_META_NAME: &str = "DB_META";

/// Append-only log file name inside a database directory
pub const LOG_FILE_NAME: &str = "LOG_FILE";

use super::types::PageNo;
