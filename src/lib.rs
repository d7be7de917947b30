//! Read-only access to a three-file record database.
//!
//! A database named `reads` lives in three files:
//!
//! - `reads`: a hash-multiplier word, the attribute names (one per line, ended
//!   by a blank line), then every record as length-prefixed fields;
//! - `reads_idx`: the byte offset of each record in `reads`;
//! - `reads_hash`: an open-addressed table mapping record names to ordinals.
//!
//! [`Database`] returns a `Result` from every fallible call. [`StickyDb`]
//! wraps it for callers that expect a sticky failure flag and empty values.

pub mod codec;
pub mod compat;
pub mod db;
pub mod error;
pub mod hash;
pub mod index;
pub mod record;
pub mod schema;
pub mod types;

#[cfg(test)]
mod test_support;

pub use compat::{NO_RECORD, Status, StickyDb};
pub use db::{Database, DbConfig, DbPaths, Records};
pub use error::{DbError, ErrorKind, Result};
pub use hash::{NameHasher, ProbeArithmetic, Xxh64Hasher};
pub use record::Record;
pub use schema::Schema;
