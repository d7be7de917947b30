// ─── Error ──────────────────────────────────────────────────────────────────
use smol_str::SmolStr;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`DbError`], matching the four failure classes
/// callers of the flag-based API distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OpenFailure,
    OutOfRange,
    Corruption,
    NotFound,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("cannot open database file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("database files not open")]
    Closed,
    #[error("record {ordinal} out of range (database holds {count} records)")]
    RecordOutOfRange { ordinal: u64, count: u64 },
    #[error("attribute {ordinal} out of range (schema has {count} attributes)")]
    AttributeOutOfRange { ordinal: usize, count: usize },
    #[error("no attribute named {0:?}")]
    UnknownAttribute(SmolStr),
    #[error("no record named {0:?}")]
    NoSuchRecord(String),
    #[error("record {ordinal} corrupted: {reason}")]
    CorruptRecord { ordinal: u64, reason: String },
    #[error("attribute {attribute:?} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        attribute: SmolStr,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("corrupted header: {0}")]
    CorruptHeader(String),
    #[error("corrupted hash file at byte {position}: {reason}")]
    CorruptHash { position: u64, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Open { .. } | DbError::Closed => ErrorKind::OpenFailure,
            DbError::RecordOutOfRange { .. } | DbError::AttributeOutOfRange { .. } => {
                ErrorKind::OutOfRange
            }
            DbError::UnknownAttribute(_) | DbError::NoSuchRecord(_) => ErrorKind::NotFound,
            DbError::CorruptRecord { .. }
            | DbError::InvalidUtf8 { .. }
            | DbError::CorruptHeader(_)
            | DbError::CorruptHash { .. }
            | DbError::Io(_) => ErrorKind::Corruption,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DbError::Open {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = DbError> = std::result::Result<T, E>;
