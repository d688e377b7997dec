use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::IndexMeta;
use crate::common::{DbError, Result};

use super::IndexHandle;

/// Deterministic index name for a table and its indexed columns in
/// declaration order. Used as both the filename and the key into the open
/// index map, so equal `(table, cols)` always meet the same index.
pub fn index_name(tab_name: &str, col_names: &[&str]) -> String {
    let mut name = tab_name.to_string();
    for col in col_names {
        name.push('_');
        name.push_str(col);
    }
    name
}

/// Creates, opens, closes, and destroys index files inside one database
/// directory.
pub struct IndexManager {
    home: PathBuf,
}

impl IndexManager {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn index_path(&self, meta: &IndexMeta) -> PathBuf {
        self.home
            .join(index_name(&meta.tab_name, &meta.col_names()))
    }

    /// Creates an empty index file.
    pub fn create_index(&self, meta: &IndexMeta) -> Result<IndexHandle> {
        let path = self.index_path(meta);
        if path.exists() {
            return Err(DbError::IndexExists(
                index_name(&meta.tab_name, &meta.col_names()),
            ));
        }
        let handle = IndexHandle::create(meta.clone(), path.clone());
        handle.store()?;
        debug!(path = %path.display(), "created index file");
        Ok(handle)
    }

    /// Opens an existing index file and loads its entries.
    pub fn open_index(&self, meta: &IndexMeta) -> Result<IndexHandle> {
        let path = self.index_path(meta);
        if !path.is_file() {
            return Err(DbError::IndexNotFound(
                index_name(&meta.tab_name, &meta.col_names()),
            ));
        }
        IndexHandle::load(meta.clone(), path)
    }

    /// Persists an open index to its file.
    pub fn close_index(&self, handle: &IndexHandle) -> Result<()> {
        handle.store()
    }

    /// Removes an index file from disk.
    pub fn destroy_index(&self, meta: &IndexMeta) -> Result<()> {
        let path = self.index_path(meta);
        if !path.is_file() {
            return Err(DbError::IndexNotFound(
                index_name(&meta.tab_name, &meta.col_names()),
            ));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_is_deterministic() {
        assert_eq!(index_name("emp", &["dept", "age"]), "emp_dept_age");
        assert_eq!(index_name("emp", &["age", "dept"]), "emp_age_dept");
        assert_eq!(index_name("emp", &[]), "emp");
    }
}
