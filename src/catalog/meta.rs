use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{DbError, Result};

/// Column data types. Every value is stored fixed-width: `Int` and `Float`
/// in 4 little-endian bytes, `Str` NUL-padded to the declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColType {
    Int,
    Float,
    Str,
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColType::Int => write!(f, "INT"),
            ColType::Float => write!(f, "FLOAT"),
            ColType::Str => write!(f, "STR"),
        }
    }
}

/// Column definition as supplied to `create_table`.
#[derive(Debug, Clone)]
pub struct ColDef {
    pub name: String,
    pub ty: ColType,
    pub len: usize,
}

impl ColDef {
    pub fn new(name: impl Into<String>, ty: ColType, len: usize) -> Self {
        Self {
            name: name.into(),
            ty,
            len,
        }
    }
}

/// Column metadata with its precomputed byte offset within a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColMeta {
    pub tab_name: String,
    pub name: String,
    pub ty: ColType,
    pub len: usize,
    pub offset: usize,
    pub indexed: bool,
}

/// Metadata of one secondary index: the indexed columns in declaration
/// order and the total key width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub tab_name: String,
    pub col_tot_len: usize,
    pub cols: Vec<ColMeta>,
}

impl IndexMeta {
    /// Materializes the key for `record`: the indexed columns' bytes
    /// concatenated in declaration order.
    pub fn build_key(&self, record: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.col_tot_len);
        for col in &self.cols {
            key.extend_from_slice(&record[col.offset..col.offset + col.len]);
        }
        key
    }

    pub fn col_names(&self) -> Vec<&str> {
        self.cols.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Table metadata: column layout plus declared indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabMeta {
    pub name: String,
    pub cols: Vec<ColMeta>,
    pub indexes: Vec<IndexMeta>,
}

impl TabMeta {
    pub fn get_col(&self, name: &str) -> Result<&ColMeta> {
        self.cols
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string()))
    }

    /// Record width in bytes.
    pub fn record_size(&self) -> usize {
        self.cols.iter().map(|c| c.len).sum()
    }

    /// Whether an index on exactly `col_names`, in that order, exists.
    pub fn has_index(&self, col_names: &[&str]) -> bool {
        self.indexes.iter().any(|ix| ix.col_names() == col_names)
    }

    pub fn get_index(&self, col_names: &[&str]) -> Result<&IndexMeta> {
        self.indexes
            .iter()
            .find(|ix| ix.col_names() == col_names)
            .ok_or_else(|| DbError::IndexNotFound(format!("{}_{}", self.name, col_names.join("_"))))
    }
}

/// Database metadata: the open database's name and its tables. Serialized
/// to `DB_META` as JSON and round-tripped by open and close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbMeta {
    pub name: String,
    pub tabs: HashMap<String, TabMeta>,
}

impl DbMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tabs: HashMap::new(),
        }
    }

    pub fn is_table(&self, name: &str) -> bool {
        self.tabs.contains_key(name)
    }

    pub fn get_table(&self, name: &str) -> Result<&TabMeta> {
        self.tabs
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut TabMeta> {
        self.tabs
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }
}

/// Builds column metadata with running offsets from a definition list.
pub fn build_cols(tab_name: &str, col_defs: &[ColDef]) -> Vec<ColMeta> {
    let mut offset = 0;
    col_defs
        .iter()
        .map(|def| {
            let col = ColMeta {
                tab_name: tab_name.to_string(),
                name: def.name.clone(),
                ty: def.ty,
                len: def.len,
                offset,
                indexed: false,
            };
            offset += def.len;
            col
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TabMeta {
        let cols = build_cols(
            "t",
            &[
                ColDef::new("id", ColType::Int, 4),
                ColDef::new("name", ColType::Str, 8),
                ColDef::new("score", ColType::Float, 4),
            ],
        );
        TabMeta {
            name: "t".into(),
            cols,
            indexes: Vec::new(),
        }
    }

    #[test]
    fn test_offsets_and_record_size() {
        let tab = sample_table();
        assert_eq!(tab.get_col("id").unwrap().offset, 0);
        assert_eq!(tab.get_col("name").unwrap().offset, 4);
        assert_eq!(tab.get_col("score").unwrap().offset, 12);
        assert_eq!(tab.record_size(), 16);
        assert!(matches!(
            tab.get_col("missing"),
            Err(DbError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_index_key_materialization() {
        let tab = sample_table();
        let ix = IndexMeta {
            tab_name: "t".into(),
            col_tot_len: 12,
            cols: vec![
                tab.get_col("name").unwrap().clone(),
                tab.get_col("id").unwrap().clone(),
            ],
        };

        let mut record = vec![0u8; 16];
        record[0..4].copy_from_slice(&7i32.to_le_bytes());
        record[4..12].copy_from_slice(b"abc\0\0\0\0\0");

        let key = ix.build_key(&record);
        assert_eq!(&key[..8], b"abc\0\0\0\0\0");
        assert_eq!(&key[8..], &7i32.to_le_bytes());
    }

    #[test]
    fn test_meta_json_roundtrip() {
        let mut db = DbMeta::new("demo");
        db.tabs.insert("t".into(), sample_table());

        let json = serde_json::to_string(&db).unwrap();
        let back: DbMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(db, back);
    }
}
