use crate::codec::{self, Endian, WORD_SIZE};
use crate::error::{DbError, Result};
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

// ─── Offset Index ───────────────────────────────────────────────────────────

/// Record ordinal → byte offset of that record in the data file.
pub enum OffsetIndex<R> {
    /// Every entry read and swapped to host order at open.
    Preloaded(Vec<u64>),
    /// Entries read from the index stream on each lookup.
    OnDemand {
        stream: R,
        len: u64,
        endian: Endian,
    },
}

impl<R> OffsetIndex<R> {
    /// Number of records the index describes.
    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            OffsetIndex::Preloaded(offsets) => offsets.len() as u64,
            OffsetIndex::OnDemand { len, .. } => *len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Read + Seek> OffsetIndex<R> {
    /// Load the whole index into memory. The stream is consumed and dropped.
    pub fn preload(mut stream: R, endian: Endian) -> Result<Self> {
        let len = entry_count(&mut stream)?;
        stream.seek(SeekFrom::Start(0))?;

        let mut raw = vec![0u8; (len * WORD_SIZE) as usize];
        stream.read_exact(&mut raw)?;
        let offsets = raw
            .chunks_exact(WORD_SIZE as usize)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                codec::decode_u64(word, endian)
            })
            .collect::<Vec<_>>();

        debug!("preloaded offset index with {len} entries");
        Ok(OffsetIndex::Preloaded(offsets))
    }

    /// Keep the stream and read one entry per lookup.
    pub fn on_demand(mut stream: R, endian: Endian) -> Result<Self> {
        let len = entry_count(&mut stream)?;
        debug!("using on-demand offset index with {len} entries");
        Ok(OffsetIndex::OnDemand {
            stream,
            len,
            endian,
        })
    }

    /// Byte offset of record `ordinal`. The caller has already checked
    /// `ordinal < len()`.
    pub fn offset_of(&mut self, ordinal: u64) -> Result<u64> {
        match self {
            OffsetIndex::Preloaded(offsets) => {
                offsets
                    .get(ordinal as usize)
                    .copied()
                    .ok_or(DbError::RecordOutOfRange {
                        ordinal,
                        count: offsets.len() as u64,
                    })
            }
            OffsetIndex::OnDemand {
                stream, endian, ..
            } => {
                stream.seek(SeekFrom::Start(ordinal * WORD_SIZE))?;
                codec::read_u64(stream, *endian).map_err(|e| DbError::CorruptRecord {
                    ordinal,
                    reason: format!("index entry unreadable: {e}"),
                })
            }
        }
    }
}

/// Whole entries in the stream; a trailing partial entry is ignored.
fn entry_count<R: Seek>(stream: &mut R) -> Result<u64> {
    let bytes = stream.seek(SeekFrom::End(0))?;
    if bytes % WORD_SIZE != 0 {
        warn!(
            "index file length {bytes} is not a multiple of {WORD_SIZE}; ignoring {} trailing bytes",
            bytes % WORD_SIZE
        );
    }
    Ok(bytes / WORD_SIZE)
}
