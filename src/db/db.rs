use super::types::{DbConfig, DbPaths};
use crate::codec;
use crate::error::{DbError, Result};
use crate::hash::{self, NameHasher, Probe, Xxh64Hasher};
use crate::index::OffsetIndex;
use crate::record::{Record, RecordCache};
use crate::schema::Schema;
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Everything that exists only while the database is open. Dropping it
/// releases the three streams and the offset index.
struct OpenDb<R> {
    data: R,
    hash: R,
    index: OffsetIndex<R>,
    schema: Schema,
    cache: RecordCache,
    hash_multiplier: u64,
}

/// Read-only handle on one three-file database.
///
/// Holds at most one decoded record at a time: [`load`](Self::load) fills the
/// cache and the attribute accessors read from it.
pub struct Database<R = BufReader<File>> {
    state: Option<OpenDb<R>>,
    config: DbConfig,
    hasher: Box<dyn NameHasher>,
}

impl Database<BufReader<File>> {
    /// Open the database whose data file is `base`, with default settings.
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(base, DbConfig::default())
    }

    /// Open `base`, `base_idx` and `base_hash`.
    ///
    /// The index and hash files are opened first; the data file last. Any
    /// failure drops whatever was already opened.
    pub fn open_with_config(base: impl AsRef<Path>, config: DbConfig) -> Result<Self> {
        let paths = DbPaths::from_base(base);
        let open = |path: &Path| {
            File::open(path)
                .map(BufReader::new)
                .map_err(|e| DbError::open(path, e))
        };

        let index = open(paths.index.as_path())?;
        let hash = open(paths.hash.as_path())?;
        let index = build_index(index, &config)?;
        let data = open(paths.data.as_path())?;

        debug!("opening database {}", paths.data.display());
        Self::assemble(data, index, hash, config)
    }
}

impl<R: Read + Seek> Database<R> {
    /// Open a database over already-open streams.
    pub fn from_streams(data: R, index: R, hash: R, config: DbConfig) -> Result<Self> {
        let index = build_index(index, &config)?;
        Self::assemble(data, index, hash, config)
    }

    fn assemble(mut data: R, index: OffsetIndex<R>, hash: R, config: DbConfig) -> Result<Self> {
        data.seek(SeekFrom::Start(0))?;
        let hash_multiplier = codec::read_u64(&mut data, config.endian).map_err(|e| {
            DbError::CorruptHeader(format!("hash multiplier unreadable: {e}"))
        })?;
        let schema = Schema::read_from(&mut data)?;

        debug!(
            "database holds {} records of {} attributes, hash multiplier {}",
            index.len(),
            schema.len(),
            hash_multiplier
        );

        Ok(Self {
            state: Some(OpenDb {
                data,
                hash,
                index,
                cache: RecordCache::new(schema.len()),
                schema,
                hash_multiplier,
            }),
            config,
            hasher: Box::new(Xxh64Hasher::default()),
        })
    }

    /// Replace the hasher used by [`find_by_name`](Self::find_by_name). It must
    /// match the one the hash file was built with.
    pub fn with_hasher(mut self, hasher: impl NameHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Load record `ordinal` into the cache.
    ///
    /// Reloading the record already cached touches no stream.
    pub fn load(&mut self, ordinal: u64) -> Result<()> {
        let config = &self.config;
        open_mut(&mut self.state)?.load(ordinal, config)
    }

    /// Ordinal of the record whose key attribute equals `name`.
    ///
    /// Leaves that record loaded on success. On failure the cache holds
    /// whichever candidate was compared last.
    pub fn find_by_name(&mut self, name: &str) -> Result<u64> {
        self.find_by_key(name.as_bytes())
    }

    /// Byte-keyed form of [`find_by_name`](Self::find_by_name).
    pub fn find_by_key(&mut self, key: &[u8]) -> Result<u64> {
        let config = &self.config;
        let hasher = &*self.hasher;
        open_mut(&mut self.state)?.find(key, hasher, config)
    }

    /// Load record `ordinal` and return an owned copy of it.
    pub fn record(&mut self, ordinal: u64) -> Result<Record> {
        self.load(ordinal)?;
        let db = open_ref(&self.state)?;
        Ok(Record::snapshot(ordinal, &db.schema, &db.cache))
    }

    /// Every record in ordinal order. Each step reloads the cache.
    pub fn iter(&mut self) -> Records<'_, R> {
        Records {
            db: self,
            next: 0,
            done: false,
        }
    }
}

impl<R> Database<R> {
    /// A handle that failed to open. Every operation on it reports
    /// [`DbError::Closed`].
    pub(crate) fn unopened(config: DbConfig) -> Self {
        Self {
            state: None,
            config,
            hasher: Box::new(Xxh64Hasher::default()),
        }
    }

    /// Field of the cached record for attribute `name`.
    pub fn attribute_value(&self, name: &str) -> Result<&[u8]> {
        let db = open_ref(&self.state)?;
        let ordinal = db
            .schema
            .ordinal(name)
            .ok_or_else(|| DbError::UnknownAttribute(name.into()))?;
        Ok(db.cache.field(ordinal).unwrap_or_default())
    }

    /// Field of the cached record for the attribute at `ordinal`, resolved
    /// through its name.
    pub fn attribute_by_ordinal(&self, ordinal: usize) -> Result<&[u8]> {
        let name = self.attribute_name(ordinal)?;
        self.attribute_value(name)
    }

    /// Schema name of attribute `ordinal`.
    pub fn attribute_name(&self, ordinal: usize) -> Result<&str> {
        let db = open_ref(&self.state)?;
        db.schema
            .name(ordinal)
            .ok_or(DbError::AttributeOutOfRange {
                ordinal,
                count: db.schema.len(),
            })
    }

    /// Field of the cached record as UTF-8.
    pub fn attribute_str(&self, name: &str) -> Result<&str> {
        let bytes = self.attribute_value(name)?;
        std::str::from_utf8(bytes).map_err(|source| DbError::InvalidUtf8 {
            attribute: name.into(),
            source,
        })
    }

    /// `(name, bytes)` for every attribute of the cached record.
    pub fn fields(&self) -> Result<impl ExactSizeIterator<Item = (&str, &[u8])> + '_> {
        let db = open_ref(&self.state)?;
        Ok(db.schema.names().zip(db.cache.fields().iter().map(Vec::as_slice)))
    }

    pub fn schema(&self) -> Result<&Schema> {
        open_ref(&self.state).map(|db| &db.schema)
    }

    pub fn record_count(&self) -> Result<u64> {
        open_ref(&self.state).map(|db| db.index.len())
    }

    pub fn attribute_count(&self) -> Result<usize> {
        open_ref(&self.state).map(|db| db.schema.len())
    }

    pub fn hash_multiplier(&self) -> Result<u64> {
        open_ref(&self.state).map(|db| db.hash_multiplier)
    }

    /// Ordinal of the cached record, if one is fully loaded.
    pub fn loaded(&self) -> Option<u64> {
        self.state.as_ref().and_then(|db| db.cache.current())
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Release the streams and the offset index. Later calls report
    /// [`DbError::Closed`]. Closing twice is harmless.
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            debug!("database closed");
        }
    }
}

fn open_ref<R>(state: &Option<OpenDb<R>>) -> Result<&OpenDb<R>> {
    state.as_ref().ok_or(DbError::Closed)
}

fn open_mut<R>(state: &mut Option<OpenDb<R>>) -> Result<&mut OpenDb<R>> {
    state.as_mut().ok_or(DbError::Closed)
}

fn build_index<R: Read + Seek>(index: R, config: &DbConfig) -> Result<OffsetIndex<R>> {
    if config.preload_index {
        OffsetIndex::preload(index, config.endian)
    } else {
        OffsetIndex::on_demand(index, config.endian)
    }
}

impl<R: Read + Seek> OpenDb<R> {
    fn load(&mut self, ordinal: u64, config: &DbConfig) -> Result<()> {
        let count = self.index.len();
        if ordinal >= count {
            return Err(DbError::RecordOutOfRange { ordinal, count });
        }
        if self.cache.current() == Some(ordinal) {
            trace!("record {ordinal} already cached");
            return Ok(());
        }

        let offset = self.index.offset_of(ordinal)?;
        debug!("loading record {ordinal} at offset {offset}");
        self.cache.fill(
            &mut self.data,
            ordinal,
            offset,
            config.endian,
            config.max_field_len,
        )
    }

    fn find(&mut self, key: &[u8], hasher: &dyn NameHasher, config: &DbConfig) -> Result<u64> {
        let key_ordinal = self
            .schema
            .ordinal(&config.key_attribute)
            .ok_or_else(|| DbError::UnknownAttribute(config.key_attribute.clone()))?;

        let record_count = self.index.len();
        let bucket_count = record_count
            .checked_mul(self.hash_multiplier)
            .filter(|&n| hash::table_bytes(n).is_some())
            .ok_or_else(|| {
                DbError::CorruptHeader(format!(
                    "hash multiplier {} over {record_count} records overflows the bucket table",
                    self.hash_multiplier
                ))
            })?;
        if bucket_count == 0 {
            return Err(no_such_record(key));
        }

        let home = hasher.bucket(key, bucket_count);
        let mut probe = Probe::new(home, bucket_count, config.probe);
        loop {
            if let Some(limit) = config.max_probes {
                if probe.collisions() > limit {
                    return Err(DbError::CorruptHash {
                        position: probe.position(),
                        reason: format!("no empty bucket after {limit} collisions"),
                    });
                }
            }

            let position = probe.position();
            let entry = self.read_hash_entry(position, config)?;
            debug!(
                "hash probe at byte {position} (collisions {}): entry {entry}",
                probe.collisions()
            );
            if entry == 0 {
                return Err(no_such_record(key));
            }

            let candidate = entry - 1;
            if candidate >= record_count {
                return Err(DbError::CorruptHash {
                    position,
                    reason: format!(
                        "entry names record {candidate}, database holds {record_count}"
                    ),
                });
            }
            self.load(candidate, config)?;
            if self.cache.field(key_ordinal) == Some(key) {
                return Ok(candidate);
            }
            probe.advance();
        }
    }

    fn read_hash_entry(&mut self, position: u64, config: &DbConfig) -> Result<u64> {
        let corrupt = |e: std::io::Error| DbError::CorruptHash {
            position,
            reason: e.to_string(),
        };
        self.hash.seek(SeekFrom::Start(position)).map_err(corrupt)?;
        codec::read_u64(&mut self.hash, config.endian).map_err(corrupt)
    }
}

fn no_such_record(key: &[u8]) -> DbError {
    DbError::NoSuchRecord(String::from_utf8_lossy(key).into_owned())
}

// ─── Records ────────────────────────────────────────────────────────────────

/// Iterator over every record, produced by [`Database::iter`].
pub struct Records<'a, R> {
    db: &'a mut Database<R>,
    next: u64,
    done: bool,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let count = match self.db.record_count() {
            Ok(count) => count,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        if self.next >= count {
            self.done = true;
            return None;
        }
        let ordinal = self.next;
        self.next += 1;
        Some(self.db.record(ordinal))
    }
}
