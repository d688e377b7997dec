use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::NO_PAGE;

/// Page number within a single file. Negative values are sentinels
/// (`NO_PAGE` terminates free lists and marks exhausted scans).
pub type PageNo = i32;

/// Handle for a file opened through the disk manager.
/// Allocated monotonically and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub const INVALID: FileId = FileId(u32::MAX);

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd{}", self.0)
    }
}

/// Identity of a page on disk: which file, which page within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub fd: FileId,
    pub page_no: PageNo,
}

impl PageId {
    pub const INVALID: PageId = PageId {
        fd: FileId::INVALID,
        page_no: NO_PAGE,
    };

    pub fn new(fd: FileId, page_no: PageNo) -> Self {
        Self { fd, page_no }
    }

    pub fn is_valid(&self) -> bool {
        self.fd != FileId::INVALID && self.page_no >= 0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.fd, self.page_no)
    }
}

/// Record identifier: page number plus slot number within that page.
/// Stable for the lifetime of the record; reusable after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page_no: PageNo,
    pub slot_no: i32,
}

impl Rid {
    /// The "no record" sentinel.
    pub const INVALID: Rid = Rid {
        page_no: NO_PAGE,
        slot_no: -1,
    };

    pub fn new(page_no: PageNo, slot_no: i32) -> Self {
        Self { page_no, slot_no }
    }

    pub fn is_valid(&self) -> bool {
        self.page_no >= 0 && self.slot_no >= 0
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}

/// Index of a frame in the buffer pool's frame table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame{}", self.0)
    }
}

/// Opaque per-operation transaction context. Threaded through executor and
/// index calls; this layer never inspects it beyond carrying it along.
#[derive(Debug, Default, Clone, Copy)]
pub struct Context {
    pub txn_id: u64,
}

impl Context {
    pub fn new(txn_id: u64) -> Self {
        Self { txn_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rid_sentinel() {
        assert!(!Rid::INVALID.is_valid());
        assert!(Rid::new(1, 0).is_valid());
        assert!(!Rid::new(NO_PAGE, 3).is_valid());
    }

    #[test]
    fn test_page_id_display() {
        let pid = PageId::new(FileId(2), 7);
        assert_eq!(pid.to_string(), "fd2:7");
        assert!(pid.is_valid());
        assert!(!PageId::INVALID.is_valid());
    }
}
