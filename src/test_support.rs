// ═══════════════════════════════════════════════════════════════════════
// Test fixtures: a minimal writer for the three-file format
// ═══════════════════════════════════════════════════════════════════════
use crate::codec::{Endian, WORD_SIZE, encode_u64};
use crate::db::{Database, DbConfig};
use crate::hash::{NameHasher, Probe, ProbeArithmetic, Xxh64Hasher};
use std::cell::Cell;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub type BucketFn = fn(&[u8], u64) -> u64;

pub fn xxh64_bucket(key: &[u8], bucket_count: u64) -> u64 {
    Xxh64Hasher::default().bucket(key, bucket_count)
}

/// The three files of one database, as bytes.
pub struct Built {
    pub data: Vec<u8>,
    pub index: Vec<u8>,
    pub hash: Vec<u8>,
}

pub struct Fixture {
    attributes: Vec<String>,
    records: Vec<Vec<Vec<u8>>>,
    multiplier: u64,
    endian: Endian,
    hasher: BucketFn,
    hash_override: Option<Vec<u64>>,
}

impl Fixture {
    pub fn new(attributes: &[&str]) -> Self {
        Self {
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            records: Vec::new(),
            multiplier: 2,
            endian: Endian::Big,
            hasher: xxh64_bucket,
            hash_override: None,
        }
    }

    pub fn record(mut self, fields: &[&str]) -> Self {
        assert_eq!(fields.len(), self.attributes.len());
        self.records
            .push(fields.iter().map(|f| f.as_bytes().to_vec()).collect());
        self
    }

    pub fn record_bytes(mut self, fields: &[&[u8]]) -> Self {
        assert_eq!(fields.len(), self.attributes.len());
        self.records.push(fields.iter().map(|f| f.to_vec()).collect());
        self
    }

    pub fn multiplier(mut self, multiplier: u64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn hasher(mut self, hasher: BucketFn) -> Self {
        self.hasher = hasher;
        self
    }

    /// Use these hash-file words verbatim instead of placing records.
    pub fn hash_entries(mut self, entries: Vec<u64>) -> Self {
        self.hash_override = Some(entries);
        self
    }

    pub fn config(&self) -> DbConfig {
        DbConfig {
            endian: self.endian,
            ..DbConfig::default()
        }
    }

    pub fn build(&self) -> Built {
        let e = self.endian;
        let mut data = encode_u64(self.multiplier, e).to_vec();
        for name in &self.attributes {
            data.extend_from_slice(name.as_bytes());
            data.push(b'\n');
        }
        data.push(b'\n');

        let mut index = Vec::new();
        for record in &self.records {
            index.extend_from_slice(&encode_u64(data.len() as u64, e));
            for field in record {
                data.extend_from_slice(&encode_u64(field.len() as u64, e));
                data.extend_from_slice(field);
            }
        }

        let entries = match &self.hash_override {
            Some(entries) => entries.clone(),
            None => self.place_records(),
        };
        let hash = entries.iter().flat_map(|w| encode_u64(*w, e)).collect();

        Built { data, index, hash }
    }

    /// Insert every record with the same probe walk the reader uses.
    fn place_records(&self) -> Vec<u64> {
        let bucket_count = self.records.len() as u64 * self.multiplier;
        let mut table = vec![0u64; bucket_count as usize];
        if bucket_count == 0 {
            return table;
        }
        let Some(key) = self.attributes.iter().position(|a| a == "name") else {
            return table;
        };
        for (ordinal, record) in self.records.iter().enumerate() {
            let home = (self.hasher)(&record[key], bucket_count);
            let slot = Probe::new(home, bucket_count, ProbeArithmetic::ByteOffset)
                .map(|p| (p / WORD_SIZE) as usize)
                .take(64 * bucket_count as usize + 64)
                .find(|&b| table[b] == 0)
                .expect("probe walk found no empty bucket");
            table[slot] = ordinal as u64 + 1;
        }
        table
    }

    pub fn open_in_memory(&self) -> Database<Cursor<Vec<u8>>> {
        self.open_in_memory_with(self.config())
    }

    pub fn open_in_memory_with(&self, config: DbConfig) -> Database<Cursor<Vec<u8>>> {
        let built = self.build();
        Database::from_streams(
            Cursor::new(built.data),
            Cursor::new(built.index),
            Cursor::new(built.hash),
            config,
        )
        .expect("fixture opens")
        .with_hasher(self.hasher)
    }

    /// Open over streams that count every `read` call into `reads`.
    pub fn open_counting(&self, reads: Rc<Cell<usize>>) -> Database<Counting<Cursor<Vec<u8>>>> {
        let built = self.build();
        let wrap = |bytes: Vec<u8>| Counting {
            inner: Cursor::new(bytes),
            reads: Rc::clone(&reads),
        };
        Database::from_streams(
            wrap(built.data),
            wrap(built.index),
            wrap(built.hash),
            self.config(),
        )
        .expect("fixture opens")
        .with_hasher(self.hasher)
    }

    /// Write `<dir>/<base>`, `<base>_idx` and `<base>_hash`; returns the base path.
    pub fn write_to(&self, dir: &Path, base: &str) -> io::Result<PathBuf> {
        let built = self.build();
        let path = dir.join(base);
        std::fs::write(&path, built.data)?;
        std::fs::write(dir.join(format!("{base}_idx")), built.index)?;
        std::fs::write(dir.join(format!("{base}_hash")), built.hash)?;
        Ok(path)
    }
}

/// Stream wrapper counting `read` calls, shared across clones of `reads`.
pub struct Counting<R> {
    inner: R,
    reads: Rc<Cell<usize>>,
}

impl<R: Read> Read for Counting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for Counting<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
