use crate::db::{Database, DbConfig};
use crate::error::{DbError, ErrorKind};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Returned by [`StickyDb::find_by_name`] when the lookup failed.
pub const NO_RECORD: u64 = u64::MAX;

// ─── Status ─────────────────────────────────────────────────────────────────

/// Failure flag that stays raised until [`clear`](Status::clear).
///
/// Successful calls never lower it, so a caller who checks late still sees
/// that something failed. Kind and message describe the most recent failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    failed: bool,
    kind: Option<ErrorKind>,
    message: String,
}

impl Status {
    pub fn record(&mut self, err: &DbError) {
        debug!("latching error: {err}");
        self.failed = true;
        self.kind = Some(err.kind());
        self.message = err.to_string();
    }

    pub fn clear(&mut self) {
        self.failed = false;
        self.kind = None;
        self.message.clear();
    }

    #[inline]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Kind of the most recent failure while the flag is raised.
    #[inline]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ─── StickyDb ───────────────────────────────────────────────────────────────

/// [`Database`] behind the flag-based contract: no call returns an error;
/// failures raise the [`Status`] flag and yield an empty value instead.
pub struct StickyDb<R = BufReader<File>> {
    db: Database<R>,
    status: Status,
}

impl StickyDb<BufReader<File>> {
    /// Open `base`. On failure the handle is returned closed with the flag
    /// raised.
    pub fn open(base: impl AsRef<Path>) -> Self {
        Self::open_with_config(base, DbConfig::default())
    }

    pub fn open_with_config(base: impl AsRef<Path>, config: DbConfig) -> Self {
        match Database::open_with_config(base, config.clone()) {
            Ok(db) => Self::new(db),
            Err(e) => {
                let mut status = Status::default();
                status.record(&e);
                Self {
                    db: Database::unopened(config),
                    status,
                }
            }
        }
    }
}

impl<R> StickyDb<R> {
    pub fn new(db: Database<R>) -> Self {
        Self {
            db,
            status: Status::default(),
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    #[inline]
    pub fn failed(&self) -> bool {
        self.status.failed()
    }

    #[inline]
    pub fn error_message(&self) -> &str {
        self.status.message()
    }

    /// Lower the flag. Cached data is untouched.
    pub fn clear_error(&mut self) {
        self.status.clear();
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.db.is_open()
    }

    /// Field of the cached record, or empty if `name` is not an attribute.
    pub fn attribute_value(&mut self, name: &str) -> &[u8] {
        match self.db.attribute_value(name) {
            Ok(value) => value,
            Err(e) => {
                self.status.record(&e);
                &[]
            }
        }
    }

    /// Field by attribute ordinal, or empty if out of range.
    pub fn attribute_by_ordinal(&mut self, ordinal: usize) -> &[u8] {
        match self.db.attribute_by_ordinal(ordinal) {
            Ok(value) => value,
            Err(e) => {
                self.status.record(&e);
                &[]
            }
        }
    }

    /// Attribute name by ordinal, or empty if out of range.
    pub fn attribute_name(&mut self, ordinal: usize) -> &str {
        match self.db.attribute_name(ordinal) {
            Ok(name) => name,
            Err(e) => {
                self.status.record(&e);
                ""
            }
        }
    }

    pub fn close(&mut self) {
        self.db.close();
    }

    pub fn database(&self) -> &Database<R> {
        &self.db
    }

    pub fn into_inner(self) -> (Database<R>, Status) {
        (self.db, self.status)
    }
}

impl<R: Read + Seek> StickyDb<R> {
    /// Load record `ordinal`; on failure the cache is left as the failed load
    /// left it.
    pub fn load(&mut self, ordinal: u64) {
        if let Err(e) = self.db.load(ordinal) {
            self.status.record(&e);
        }
    }

    /// Ordinal of the named record, or [`NO_RECORD`].
    pub fn find_by_name(&mut self, name: &str) -> u64 {
        match self.db.find_by_name(name) {
            Ok(ordinal) => ordinal,
            Err(e) => {
                self.status.record(&e);
                NO_RECORD
            }
        }
    }
}
