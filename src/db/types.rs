use crate::codec::Endian;
use crate::hash::ProbeArithmetic;
use serde::Deserialize;
use smol_str::SmolStr;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Configuration for [`Database::open_with_config`](super::Database::open_with_config).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Read the whole offset index into memory at open.
    ///
    /// When false the index file stays open and one entry is read per load.
    /// Default: true.
    pub preload_index: bool,

    /// Byte order of every integer in the three files. Default: big-endian.
    pub endian: Endian,

    /// Attribute compared against the queried name by `find_by_name`.
    /// Default: `"name"`.
    pub key_attribute: SmolStr,

    /// How the probe position is reduced between hash-file reads.
    pub probe: ProbeArithmetic,

    /// Give up a hash lookup after this many collisions. `None` probes until
    /// a match or an empty bucket, which is what well-formed hash files need.
    pub max_probes: Option<u32>,

    /// Largest field length accepted from a record's length prefix.
    /// Default: 1 GiB.
    pub max_field_len: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            preload_index: true,
            endian: Endian::Big,
            key_attribute: SmolStr::new_inline("name"),
            probe: ProbeArithmetic::ByteOffset,
            max_probes: None,
            max_field_len: 1 << 30,
        }
    }
}

impl DbConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The three files making up one database, derived from its base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPaths {
    pub data: PathBuf,
    pub index: PathBuf,
    pub hash: PathBuf,
}

impl DbPaths {
    /// `base` is the data file; the index and hash files sit beside it as
    /// `<base>_idx` and `<base>_hash`.
    pub fn from_base(base: impl AsRef<Path>) -> Self {
        let data = base.as_ref().to_path_buf();
        Self {
            index: with_suffix(&data, "_idx"),
            hash: with_suffix(&data, "_hash"),
            data,
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
