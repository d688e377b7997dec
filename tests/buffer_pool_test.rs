//! Integration tests for the buffer pool manager

use std::sync::Arc;
use std::thread;

use stratadb::buffer::BufferPoolManager;
use stratadb::common::{DbError, FileId, PageId, PAGE_SIZE};
use stratadb::storage::disk::DiskManager;

/// Pool over a file pre-populated with `pages` pages, page N filled with
/// byte N.
fn setup(pool_size: usize, pages: i32) -> (Arc<BufferPoolManager>, FileId, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pool.dat");
    let dm = Arc::new(DiskManager::new());
    dm.create_file(&path).unwrap();
    let fd = dm.open_file(&path).unwrap();

    for page_no in 0..pages {
        let buf = [page_no as u8; PAGE_SIZE];
        dm.write_page(fd, page_no, &buf).unwrap();
    }

    (Arc::new(BufferPoolManager::new(pool_size, dm)), fd, dir)
}

#[test]
fn test_fetch_reads_disk_contents() {
    let (bpm, fd, _dir) = setup(4, 3);

    for page_no in 0..3 {
        let h = bpm.fetch_page(PageId::new(fd, page_no)).unwrap();
        assert_eq!(h.data()[0], page_no as u8);
        assert_eq!(h.data()[PAGE_SIZE - 1], page_no as u8);
    }
}

#[test]
fn test_lru_evicts_longest_unpinned() {
    // pool of 3; touch pages A, B, C, D in that order with immediate unpins.
    // After D, the victim must have been A.
    let (bpm, fd, _dir) = setup(3, 4);
    let [a, b, c, d] =
        [0, 1, 2, 3].map(|page_no| PageId::new(fd, page_no));

    for pid in [a, b, c] {
        let _h = bpm.fetch_page(pid).unwrap();
    }
    {
        let _h = bpm.fetch_page(d).unwrap();
    }

    assert!(bpm.pin_count(a).is_none());
    assert_eq!(bpm.pin_count(b), Some(0));
    assert_eq!(bpm.pin_count(c), Some(0));
    assert_eq!(bpm.pin_count(d), Some(0));
}

#[test]
fn test_lru_follows_unpin_order_not_fetch_order() {
    let (bpm, fd, _dir) = setup(2, 3);
    let [a, b, c] = [0, 1, 2].map(|page_no| PageId::new(fd, page_no));

    let ha = bpm.fetch_page(a).unwrap();
    let hb = bpm.fetch_page(b).unwrap();
    drop(hb);
    drop(ha);

    // B was unpinned before A, so B is the victim
    let _hc = bpm.fetch_page(c).unwrap();
    assert!(bpm.pin_count(b).is_none());
    assert_eq!(bpm.pin_count(a), Some(0));
}

#[test]
fn test_pinned_frames_are_not_victims() {
    let (bpm, fd, _dir) = setup(2, 3);

    let _ha = bpm.fetch_page(PageId::new(fd, 0)).unwrap();
    let _hb = bpm.fetch_page(PageId::new(fd, 1)).unwrap();

    assert!(matches!(
        bpm.fetch_page(PageId::new(fd, 2)),
        Err(DbError::BufferPoolExhausted)
    ));
}

#[test]
fn test_double_unpin_returns_false() {
    let (bpm, fd, _dir) = setup(4, 2);
    let pid = PageId::new(fd, 0);

    {
        let _h = bpm.fetch_page(pid).unwrap();
        assert_eq!(bpm.pin_count(pid), Some(1));
    }
    // the handle already unpinned; a second unpin must fail
    assert!(!bpm.unpin_page(pid, false));
    // and so must unpinning a page that was never fetched
    assert!(!bpm.unpin_page(PageId::new(fd, 1), false));
}

#[test]
fn test_eviction_writes_back_dirty_page() {
    let (bpm, fd, _dir) = setup(1, 2);
    let [a, b] = [0, 1].map(|page_no| PageId::new(fd, page_no));

    {
        let mut h = bpm.fetch_page(a).unwrap();
        h.data_mut()[10] = 0xEE;
    }
    // single frame: fetching B evicts dirty A
    {
        let h = bpm.fetch_page(b).unwrap();
        assert_eq!(h.data()[0], 1);
    }
    // fetching A again reads the written-back bytes
    let h = bpm.fetch_page(a).unwrap();
    assert_eq!(h.data()[10], 0xEE);
    assert_eq!(h.data()[0], 0);
}

#[test]
fn test_flush_all_pages_targets_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let dm = Arc::new(DiskManager::new());
    let paths = [dir.path().join("a.dat"), dir.path().join("b.dat")];
    for p in &paths {
        dm.create_file(p).unwrap();
    }
    let fd_a = dm.open_file(&paths[0]).unwrap();
    let fd_b = dm.open_file(&paths[1]).unwrap();
    let bpm = BufferPoolManager::new(4, Arc::clone(&dm));

    let pid_a = {
        let mut h = bpm.new_page(fd_a).unwrap();
        h.data_mut()[0] = 0xAA;
        h.page_id()
    };
    let pid_b = {
        let mut h = bpm.new_page(fd_b).unwrap();
        h.data_mut()[0] = 0xBB;
        h.page_id()
    };

    bpm.flush_all_pages(fd_a).unwrap();

    let mut buf = [0u8; PAGE_SIZE];
    dm.read_page(fd_a, pid_a.page_no, &mut buf).unwrap();
    assert_eq!(buf[0], 0xAA);
    // pid_b was not flushed, its disk page still holds allocation-time bytes
    assert!(matches!(
        dm.read_page(fd_b, pid_b.page_no, &mut buf),
        Err(DbError::IoShort { .. })
    ));
}

#[test]
fn test_concurrent_fetches_of_one_page() {
    let (bpm, fd, _dir) = setup(4, 1);
    let pid = PageId::new(fd, 0);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bpm = Arc::clone(&bpm);
            thread::spawn(move || {
                for _ in 0..100 {
                    let h = bpm.fetch_page(pid).unwrap();
                    assert_eq!(h.data()[0], 0);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(bpm.pin_count(pid), Some(0));
}
