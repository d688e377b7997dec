use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::buffer::BufferPoolManager;
use crate::common::{Context, DbError, Result, DB_META_NAME, LOG_FILE_NAME};
use crate::index::{index_name, IndexHandle, IndexManager};
use crate::storage::disk::DiskManager;
use crate::storage::heap::{HeapFile, HeapFileManager, HeapScan};

use super::{build_cols, ColDef, DbMeta, IndexMeta, TabMeta};

/// Owns database, table, and index lifecycle.
///
/// A database is a directory named after it under `root`, holding one heap
/// file per table, one file per index, the `DB_META` catalog file, and the
/// append-only `LOG_FILE`. The open database's directory is carried
/// explicitly and joined into every path; the process working directory is
/// never changed.
pub struct Catalog {
    root: PathBuf,
    disk_manager: Arc<DiskManager>,
    heap_manager: HeapFileManager,
    /// State of the currently open database, if any.
    open: Option<OpenDb>,
}

struct OpenDb {
    home: PathBuf,
    db: DbMeta,
    index_manager: IndexManager,
    /// table name -> open heap file
    fhs: HashMap<String, Arc<HeapFile>>,
    /// index name -> open index
    ihs: HashMap<String, Arc<IndexHandle>>,
}

impl Catalog {
    /// A catalog managing databases under `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        disk_manager: Arc<DiskManager>,
        buffer_pool: Arc<BufferPoolManager>,
    ) -> Self {
        Self {
            root: root.into(),
            heap_manager: HeapFileManager::new(Arc::clone(&disk_manager), buffer_pool),
            disk_manager,
            open: None,
        }
    }

    fn db_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn open_db_mut(&mut self) -> Result<&mut OpenDb> {
        self.open
            .as_mut()
            .ok_or_else(|| DbError::DatabaseNotFound("no database open".into()))
    }

    fn open_db_ref(&self) -> Result<&OpenDb> {
        self.open
            .as_ref()
            .ok_or_else(|| DbError::DatabaseNotFound("no database open".into()))
    }

    /// Creates a database: its directory, an empty `DB_META`, and the log
    /// file.
    pub fn create_db(&self, name: &str) -> Result<()> {
        let dir = self.db_dir(name);
        if DiskManager::is_dir(&dir) {
            return Err(DbError::DatabaseExists(name.to_string()));
        }
        DiskManager::create_dir(&dir)?;

        let meta = DbMeta::new(name);
        write_meta(&dir, &meta)?;
        self.disk_manager.create_file(&dir.join(LOG_FILE_NAME))?;

        info!(db = name, "created database");
        Ok(())
    }

    /// Removes a database directory and everything in it. The database must
    /// not be open.
    pub fn drop_db(&self, name: &str) -> Result<()> {
        let dir = self.db_dir(name);
        if !DiskManager::is_dir(&dir) {
            return Err(DbError::DatabaseNotFound(name.to_string()));
        }
        if let Some(open) = &self.open {
            if open.db.name == name {
                return Err(DbError::Internal(format!(
                    "database {name} is open and cannot be dropped"
                )));
            }
        }
        DiskManager::destroy_dir(&dir)?;
        info!(db = name, "dropped database");
        Ok(())
    }

    /// Opens a database: loads `DB_META`, opens every table file, every
    /// declared index, and the log file.
    pub fn open_db(&mut self, name: &str) -> Result<()> {
        let dir = self.db_dir(name);
        if !DiskManager::is_dir(&dir) {
            return Err(DbError::DatabaseNotFound(name.to_string()));
        }
        if let Some(open) = &self.open {
            return Err(DbError::DatabaseExists(open.db.name.clone()));
        }

        let db = read_meta(&dir)?;
        let index_manager = IndexManager::new(dir.clone());

        let mut fhs = HashMap::new();
        let mut ihs = HashMap::new();
        for (tab_name, tab) in &db.tabs {
            let file = self.heap_manager.open_file(&dir.join(tab_name))?;
            fhs.insert(tab_name.clone(), Arc::new(file));

            for ix in &tab.indexes {
                let handle = index_manager.open_index(ix)?;
                ihs.insert(
                    index_name(tab_name, &ix.col_names()),
                    Arc::new(handle),
                );
            }
        }

        self.disk_manager.open_log(&dir.join(LOG_FILE_NAME))?;
        self.open = Some(OpenDb {
            home: dir,
            db,
            index_manager,
            fhs,
            ihs,
        });

        info!(db = name, "opened database");
        Ok(())
    }

    /// Flushes metadata, closes every table and index, and clears the open
    /// state.
    pub fn close_db(&mut self) -> Result<()> {
        let open = self
            .open
            .take()
            .ok_or_else(|| DbError::DatabaseNotFound("no database open".into()))?;

        write_meta(&open.home, &open.db)?;
        for file in open.fhs.values() {
            self.heap_manager.close_file(file)?;
        }
        for handle in open.ihs.values() {
            open.index_manager.close_index(handle)?;
        }
        self.disk_manager.close_log();

        info!(db = %open.db.name, "closed database");
        Ok(())
    }

    /// Persists the in-memory metadata to `DB_META`.
    pub fn flush_meta(&self) -> Result<()> {
        let open = self.open_db_ref()?;
        write_meta(&open.home, &open.db)
    }

    /// Creates a table and its heap file inside the open database.
    pub fn create_table(&mut self, tab_name: &str, col_defs: &[ColDef]) -> Result<()> {
        let heap_manager = &self.heap_manager;
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| DbError::DatabaseNotFound("no database open".into()))?;
        if open.db.is_table(tab_name) {
            return Err(DbError::TableExists(tab_name.to_string()));
        }

        let cols = build_cols(tab_name, col_defs);
        let tab = TabMeta {
            name: tab_name.to_string(),
            cols,
            indexes: Vec::new(),
        };

        let path = open.home.join(tab_name);
        heap_manager.create_file(&path, tab.record_size())?;
        let file = heap_manager.open_file(&path)?;

        open.fhs.insert(tab_name.to_string(), Arc::new(file));
        open.db.tabs.insert(tab_name.to_string(), tab);
        write_meta(&open.home, &open.db)?;

        info!(table = tab_name, "created table");
        Ok(())
    }

    /// Drops a table: closes and destroys its heap file and every index on
    /// it, then removes it from the metadata.
    pub fn drop_table(&mut self, tab_name: &str) -> Result<()> {
        let heap_manager = &self.heap_manager;
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| DbError::DatabaseNotFound("no database open".into()))?;
        let tab = open.db.get_table(tab_name)?.clone();

        for ix in &tab.indexes {
            let name = index_name(tab_name, &ix.col_names());
            if let Some(handle) = open.ihs.remove(&name) {
                open.index_manager.close_index(&handle)?;
            }
            open.index_manager.destroy_index(ix)?;
        }

        if let Some(file) = open.fhs.remove(tab_name) {
            heap_manager.close_file(&file)?;
        }
        heap_manager.destroy_file(&open.home.join(tab_name))?;

        open.db.tabs.remove(tab_name);
        write_meta(&open.home, &open.db)?;

        info!(table = tab_name, "dropped table");
        Ok(())
    }

    /// Creates an index on `col_names` of `tab_name` and backfills it from
    /// the existing rows.
    pub fn create_index(&mut self, tab_name: &str, col_names: &[&str]) -> Result<()> {
        let open = self.open_db_mut()?;
        let tab = open.db.get_table_mut(tab_name)?;
        if tab.has_index(col_names) {
            return Err(DbError::IndexExists(index_name(tab_name, col_names)));
        }

        let mut ix_cols = Vec::with_capacity(col_names.len());
        for col_name in col_names {
            ix_cols.push(tab.get_col(col_name)?.clone());
        }
        let ix_meta = IndexMeta {
            tab_name: tab_name.to_string(),
            col_tot_len: ix_cols.iter().map(|c| c.len).sum(),
            cols: ix_cols,
        };

        let handle = open.index_manager.create_index(&ix_meta)?;

        // backfill from every existing row
        let file = open
            .fhs
            .get(tab_name)
            .ok_or_else(|| DbError::TableNotFound(tab_name.to_string()))?;
        let ctx = Context::default();
        let mut entries = 0usize;
        let mut scan = HeapScan::new(Arc::clone(file))?;
        while !scan.is_end() {
            let rid = scan.rid();
            let record = file.get_record(rid)?;
            let key = ix_meta.build_key(record.data());
            handle.insert_entry(&key, rid, &ctx)?;
            entries += 1;
            scan.next()?;
        }

        tab.indexes.push(ix_meta);
        for col in tab.cols.iter_mut() {
            if col_names.contains(&col.name.as_str()) {
                col.indexed = true;
            }
        }

        open.ihs
            .insert(index_name(tab_name, col_names), Arc::new(handle));
        write_meta(&open.home, &open.db)?;

        info!(table = tab_name, index = %index_name(tab_name, col_names), entries, "created index");
        Ok(())
    }

    /// Drops an index: closes and destroys its file and clears the columns'
    /// indexed flags.
    pub fn drop_index(&mut self, tab_name: &str, col_names: &[&str]) -> Result<()> {
        let open = self.open_db_mut()?;
        let tab = open.db.get_table_mut(tab_name)?;
        let ix_meta = tab.get_index(col_names)?.clone();

        let name = index_name(tab_name, col_names);
        if let Some(handle) = open.ihs.remove(&name) {
            open.index_manager.close_index(&handle)?;
        }
        open.index_manager.destroy_index(&ix_meta)?;

        tab.indexes.retain(|ix| ix.col_names() != col_names);
        for col in tab.cols.iter_mut() {
            if col_names.contains(&col.name.as_str()) {
                col.indexed = false;
            }
        }
        write_meta(&open.home, &open.db)?;

        info!(table = tab_name, index = %name, "dropped index");
        Ok(())
    }

    /// Metadata of a table in the open database.
    pub fn table(&self, tab_name: &str) -> Result<&TabMeta> {
        self.open_db_ref()?.db.get_table(tab_name)
    }

    /// The open heap file of a table.
    pub fn heap(&self, tab_name: &str) -> Result<&Arc<HeapFile>> {
        let open = self.open_db_ref()?;
        open.fhs
            .get(tab_name)
            .ok_or_else(|| DbError::TableNotFound(tab_name.to_string()))
    }

    /// The open index handles of a table, paired with their metadata, in
    /// declaration order.
    pub fn table_indexes(&self, tab_name: &str) -> Result<Vec<(IndexMeta, Arc<IndexHandle>)>> {
        let open = self.open_db_ref()?;
        let tab = open.db.get_table(tab_name)?;
        let mut out = Vec::with_capacity(tab.indexes.len());
        for ix in &tab.indexes {
            let name = index_name(tab_name, &ix.col_names());
            let handle = open
                .ihs
                .get(&name)
                .ok_or_else(|| DbError::IndexNotFound(name.clone()))?;
            out.push((ix.clone(), Arc::clone(handle)));
        }
        Ok(out)
    }

    /// An open index handle by its deterministic name.
    pub fn index(&self, name: &str) -> Result<&Arc<IndexHandle>> {
        let open = self.open_db_ref()?;
        open.ihs
            .get(name)
            .ok_or_else(|| DbError::IndexNotFound(name.to_string()))
    }

    pub fn db_name(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.db.name.as_str())
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

fn write_meta(home: &Path, db: &DbMeta) -> Result<()> {
    let file = File::create(home.join(DB_META_NAME))?;
    serde_json::to_writer_pretty(BufWriter::new(file), db)?;
    Ok(())
}

fn read_meta(home: &Path) -> Result<DbMeta> {
    let file = File::open(home.join(DB_META_NAME))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
