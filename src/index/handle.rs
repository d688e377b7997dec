use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::catalog::IndexMeta;
use crate::common::{Context, DbError, Result, Rid};

use super::key::normalize_key;

/// A unique secondary index: normalized key bytes mapped to the RID of the
/// row they describe, kept in key order.
///
/// The entry set lives in memory and is persisted wholesale when the index
/// is closed; the on-disk structure is deliberately simple because the index
/// internals are not this engine's subject.
pub struct IndexHandle {
    meta: IndexMeta,
    path: PathBuf,
    entries: Mutex<BTreeMap<Vec<u8>, Rid>>,
}

impl IndexHandle {
    pub(crate) fn create(meta: IndexMeta, path: PathBuf) -> Self {
        Self {
            meta,
            path,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn load(meta: IndexMeta, path: PathBuf) -> Result<Self> {
        let file = File::open(&path)?;
        let pairs: Vec<(Vec<u8>, Rid)> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            meta,
            path,
            entries: Mutex::new(pairs.into_iter().collect()),
        })
    }

    /// Writes the entry set to the index file.
    pub(crate) fn store(&self) -> Result<()> {
        let pairs: Vec<(Vec<u8>, Rid)> = self
            .entries
            .lock()
            .iter()
            .map(|(k, &rid)| (k.clone(), rid))
            .collect();
        let file = File::create(&self.path)?;
        serde_json::to_writer(BufWriter::new(file), &pairs)?;
        Ok(())
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Inserts an entry for `key` (raw concatenated column bytes).
    pub fn insert_entry(&self, key: &[u8], rid: Rid, _ctx: &Context) -> Result<()> {
        let norm = normalize_key(&self.meta, key);
        let mut entries = self.entries.lock();
        if entries.contains_key(&norm) {
            return Err(DbError::DuplicateKey);
        }
        entries.insert(norm, rid);
        Ok(())
    }

    /// Removes the entry for `key`.
    pub fn delete_entry(&self, key: &[u8], _ctx: &Context) -> Result<()> {
        let norm = normalize_key(&self.meta, key);
        self.entries
            .lock()
            .remove(&norm)
            .map(|_| ())
            .ok_or(DbError::KeyNotFound)
    }

    /// RID stored under `key`, if any.
    pub fn lookup(&self, key: &[u8]) -> Option<Rid> {
        let norm = normalize_key(&self.meta, key);
        self.entries.lock().get(&norm).copied()
    }

    /// All entries as `(normalized_key, rid)` in ascending key order.
    pub fn entries(&self) -> Vec<(Vec<u8>, Rid)> {
        self.entries
            .lock()
            .iter()
            .map(|(k, &rid)| (k.clone(), rid))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
