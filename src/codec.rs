use serde::Deserialize;
use std::io::{self, Read};

// ─── Byte Order ─────────────────────────────────────────────────────────────

/// Width in bytes of every integer stored on disk: offsets, field lengths,
/// hash entries and the hash multiplier are all `u64`.
pub const WORD_SIZE: u64 = 8;

/// Byte order the database files were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Big,
    Little,
}

impl Endian {
    /// True when on-disk integers must be swapped to reach host order.
    #[inline]
    pub fn needs_swap(self) -> bool {
        match self {
            Endian::Big => cfg!(target_endian = "little"),
            Endian::Little => cfg!(target_endian = "big"),
        }
    }
}

// ─── Swap ───────────────────────────────────────────────────────────────────

/// Fixed-width integers whose byte order can be reversed.
pub trait Swap: Copy {
    fn swap_bytes(self) -> Self;

    /// Convert a value read verbatim from disk into host order.
    #[inline]
    fn from_disk(self, endian: Endian) -> Self {
        if endian.needs_swap() {
            self.swap_bytes()
        } else {
            self
        }
    }
}

macro_rules! impl_swap {
    ($($t:ty),*) => {
        $(
            impl Swap for $t {
                #[inline]
                fn swap_bytes(self) -> Self {
                    <$t>::swap_bytes(self)
                }
            }
        )*
    };
}

impl_swap!(u16, u32, u64);

/// Decode one on-disk word.
#[inline]
pub fn decode_u64(bytes: [u8; 8], endian: Endian) -> u64 {
    u64::from_ne_bytes(bytes).from_disk(endian)
}

/// Read exactly one on-disk word from `reader`.
pub fn read_u64<R: Read + ?Sized>(reader: &mut R, endian: Endian) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(decode_u64(buf, endian))
}

/// Encode a host value in on-disk order. Used by fixture builders.
#[inline]
pub fn encode_u64(value: u64, endian: Endian) -> [u8; 8] {
    match endian {
        Endian::Big => value.to_be_bytes(),
        Endian::Little => value.to_le_bytes(),
    }
}
