use crate::codec::{self, Endian};
use crate::error::{DbError, Result};
use crate::schema::Schema;
use serde::ser::{Serialize, SerializeMap, Serializer};
use smol_str::SmolStr;
use std::io::{Read, Seek, SeekFrom};

// ─── Record Layout ──────────────────────────────────────────────────────────
//
//  Records follow the header back to back, each one:
//
//  ┌──────────────────────────────────────────────┐
//  │ field 0:  length: u64   bytes: [u8; length]  │
//  │ field 1:  length: u64   bytes: [u8; length]  │
//  │ ...       one field per schema attribute     │
//  └──────────────────────────────────────────────┘
//
//  No separators, no per-record header.

// ─── RecordCache ────────────────────────────────────────────────────────────

/// Decoded fields of the most recently loaded record.
///
/// Always holds exactly one slot per schema attribute. `current` is `None`
/// until a load completes, and is reset whenever a load fails part-way so the
/// partially-written slots are never mistaken for a cached record.
#[derive(Debug, Clone)]
pub struct RecordCache {
    fields: Vec<Vec<u8>>,
    current: Option<u64>,
}

impl RecordCache {
    pub fn new(attribute_count: usize) -> Self {
        Self {
            fields: vec![Vec::new(); attribute_count],
            current: None,
        }
    }

    /// Ordinal of the record currently held, if any.
    #[inline]
    pub fn current(&self) -> Option<u64> {
        self.current
    }

    #[inline]
    pub fn field(&self, ordinal: usize) -> Option<&[u8]> {
        self.fields.get(ordinal).map(Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    /// Read record `ordinal` starting at byte `offset` of `data`.
    ///
    /// Fields are decoded in schema order, each slot reassigned as soon as its
    /// bytes arrive. A short read stops the load with the slots before it
    /// already overwritten.
    pub fn fill<R: Read + Seek>(
        &mut self,
        data: &mut R,
        ordinal: u64,
        offset: u64,
        endian: Endian,
        max_field_len: u64,
    ) -> Result<()> {
        self.current = None;
        data.seek(SeekFrom::Start(offset))?;

        for (attribute, slot) in self.fields.iter_mut().enumerate() {
            let len = codec::read_u64(data, endian).map_err(|e| DbError::CorruptRecord {
                ordinal,
                reason: format!("length of field {attribute} unreadable: {e}"),
            })?;
            if len > max_field_len {
                return Err(DbError::CorruptRecord {
                    ordinal,
                    reason: format!(
                        "field {attribute} declares {len} bytes, limit is {max_field_len}"
                    ),
                });
            }

            let mut value = vec![0u8; len as usize];
            data.read_exact(&mut value)
                .map_err(|e| DbError::CorruptRecord {
                    ordinal,
                    reason: format!("field {attribute} truncated: {e}"),
                })?;
            *slot = value;
        }

        self.current = Some(ordinal);
        Ok(())
    }
}

// ─── Record ─────────────────────────────────────────────────────────────────

/// Owned copy of one record, detached from the handle's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub ordinal: u64,
    fields: Vec<(SmolStr, Vec<u8>)>,
}

impl Record {
    pub(crate) fn snapshot(ordinal: u64, schema: &Schema, cache: &RecordCache) -> Self {
        let fields = schema
            .names()
            .zip(cache.fields())
            .map(|(name, value)| (SmolStr::from(name), value.clone()))
            .collect();
        Self { ordinal, fields }
    }

    /// Field bytes by attribute name.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Field as UTF-8, if it is valid UTF-8.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        std::str::from_utf8(self.get(name)?).ok()
    }

    /// `(name, bytes)` pairs in schema order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &[u8])> + '_ {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// JSON object of attribute name → field text (lossy UTF-8).
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    serde_json::Value::String(String::from_utf8_lossy(value).into_owned()),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name.as_str(), &String::from_utf8_lossy(value))?;
        }
        map.end()
    }
}
