use crate::error::{DbError, Result};
use crate::types::FastMap;
use smol_str::SmolStr;
use std::io::{self, Read};

// ─── Schema ─────────────────────────────────────────────────────────────────
//
//  The data file header, after the leading hash multiplier word:
//
//      name\n
//      sequence\n
//      quality\n
//      \n            ← blank line ends the header
//
//  Ordinals are assigned in header order starting at 0.

/// Ordered attribute names plus the reverse name → ordinal map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    names: Vec<SmolStr>,
    ordinals: FastMap<SmolStr, usize>,
}

impl Schema {
    /// Build a schema directly from names in ordinal order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut schema = Schema::default();
        for name in names {
            schema.push(name.into());
        }
        schema
    }

    /// Parse the header from a stream positioned just after the hash multiplier.
    /// Consumes the blank separator line, leaving the stream at the first record.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut schema = Schema::default();
        loop {
            let line = read_line(reader)?;
            if line.is_empty() {
                return Ok(schema);
            }
            let name = String::from_utf8(line).map_err(|e| {
                DbError::CorruptHeader(format!(
                    "attribute {} is not valid UTF-8: {e}",
                    schema.len()
                ))
            })?;
            schema.push(SmolStr::from(name));
        }
    }

    fn push(&mut self, name: SmolStr) {
        let ordinal = self.names.len();
        // A repeated name re-points the map at the later ordinal.
        self.ordinals.insert(name.clone(), ordinal);
        self.names.push(name);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Ordinal of `name`, or `None` if the schema has no such attribute.
    #[inline]
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.ordinals.get(name).copied()
    }

    /// Name assigned to `ordinal`.
    #[inline]
    pub fn name(&self, ordinal: usize) -> Option<&str> {
        self.names.get(ordinal).map(SmolStr::as_str)
    }

    /// Attribute names in ordinal order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.names.iter().map(SmolStr::as_str)
    }
}

/// Read bytes up to and including `\n`, returning them without the terminator.
fn read_line<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(DbError::CorruptHeader(
                    "data file ended before the blank line closing the attribute list".into(),
                ));
            }
            Ok(_) if byte[0] == b'\n' => return Ok(line),
            Ok(_) => line.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
