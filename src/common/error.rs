use std::path::PathBuf;

use thiserror::Error;

use super::types::{FileId, PageNo};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short I/O transfer: expected {expected} bytes, got {actual}")]
    IoShort { expected: usize, actual: usize },

    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("file is still open: {}", .0.display())]
    FileNotClosed(PathBuf),

    #[error("file handle {0} is not open")]
    FileNotOpen(FileId),

    #[error("page {0} does not exist")]
    PageNotExist(PageNo),

    #[error("buffer pool exhausted, all frames pinned")]
    BufferPoolExhausted,

    #[error("database {0} already exists")]
    DatabaseExists(String),

    #[error("database {0} not found")]
    DatabaseNotFound(String),

    #[error("table {0} already exists")]
    TableExists(String),

    #[error("table {0} not found")]
    TableNotFound(String),

    #[error("index {0} already exists")]
    IndexExists(String),

    #[error("index {0} not found")]
    IndexNotFound(String),

    #[error("column {0} not found")]
    ColumnNotFound(String),

    #[error("duplicate index key")]
    DuplicateKey,

    #[error("index key not found")]
    KeyNotFound,

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
