//! Fixed-width binary layouts for persisted account records.
//!
//! Every record starts with an 8-byte discriminator (the first 8 bytes of
//! `SHA-256("account:<TypeName>")`), followed by its fields in declaration
//! order as little-endian integers. [`RecordWriter`] and [`RecordReader`]
//! keep the encoding symmetric and bounds-checked.

use sha2::{Digest, Sha256};

/// Length of the account discriminator prefix.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Errors produced while decoding a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Buffer length does not match the record's fixed size.
    #[error("invalid record length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Fixed size of the record type.
        expected: usize,
        /// Size of the buffer that was supplied.
        actual: usize,
    },

    /// Discriminator prefix names a different record type.
    #[error("discriminator mismatch for {record}")]
    DiscriminatorMismatch {
        /// Record type that was being decoded.
        record: &'static str,
    },

    /// A boolean byte held something other than 0 or 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// An enum tag byte names no known variant.
    #[error("invalid {field} tag {value}")]
    InvalidTag {
        /// Field being decoded.
        field: &'static str,
        /// Byte found.
        value: u8,
    },

    /// A length prefix exceeds the field's reserved capacity.
    #[error("{field} length {len} exceeds capacity {max}")]
    FieldTooLong {
        /// Field being decoded.
        field: &'static str,
        /// Declared length.
        len: usize,
        /// Reserved capacity.
        max: usize,
    },
}

/// Compute the discriminator for a record type name.
pub fn discriminator(type_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("account:{type_name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// A record with a fixed-size binary layout.
pub trait AccountLayout: Sized {
    /// Type name hashed into the discriminator.
    const NAME: &'static str;

    /// Total encoded size, discriminator included.
    const LEN: usize;

    /// Write the fields (without discriminator) in layout order.
    fn write_fields(&self, writer: &mut RecordWriter);

    /// Read the fields (without discriminator) in layout order.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] for malformed field values.
    fn read_fields(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError>;

    /// Encode the record, discriminator first.
    fn encode(&self) -> Vec<u8> {
        let mut writer = RecordWriter::with_capacity(Self::LEN);
        writer.put_bytes(&discriminator(Self::NAME));
        self.write_fields(&mut writer);
        writer.into_inner()
    }

    /// Decode a record, checking length and discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the buffer is not a valid encoding.
    fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() != Self::LEN {
            return Err(LayoutError::InvalidLength {
                expected: Self::LEN,
                actual: data.len(),
            });
        }
        let mut reader = RecordReader::new(data);
        let prefix: [u8; DISCRIMINATOR_LEN] = reader.take_array()?;
        if prefix != discriminator(Self::NAME) {
            return Err(LayoutError::DiscriminatorMismatch { record: Self::NAME });
        }
        Self::read_fields(&mut reader)
    }
}

/// Append-only little-endian writer.
#[derive(Debug, Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a `u8`.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a boolean as a single 0/1 byte.
    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Append a `u16`.
    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a `u32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a `u64`.
    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append an `i64`.
    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked little-endian reader over a record buffer.
#[derive(Debug)]
pub struct RecordReader<'a> {
    data: &'a [u8],
}

impl<'a> RecordReader<'a> {
    /// Wrap a buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Take exactly `N` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] when fewer than `N` bytes remain.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LayoutError> {
        let (head, tail) = self
            .data
            .split_first_chunk::<N>()
            .ok_or(LayoutError::InvalidLength {
                expected: N,
                actual: self.data.len(),
            })?;
        self.data = tail;
        Ok(*head)
    }

    /// Read a `u8`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] on a short buffer.
    pub fn read_u8(&mut self) -> Result<u8, LayoutError> {
        let [byte] = self.take_array::<1>()?;
        Ok(byte)
    }

    /// Read a strict 0/1 boolean.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidBool`] for any other byte value.
    pub fn read_bool(&mut self) -> Result<bool, LayoutError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LayoutError::InvalidBool(other)),
        }
    }

    /// Read a `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] on a short buffer.
    pub fn read_u16(&mut self) -> Result<u16, LayoutError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] on a short buffer.
    pub fn read_u32(&mut self) -> Result<u32, LayoutError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] on a short buffer.
    pub fn read_u64(&mut self) -> Result<u64, LayoutError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read an `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] on a short buffer.
    pub fn read_i64(&mut self) -> Result<i64, LayoutError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Take `len` bytes as a slice.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLength`] on a short buffer.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], LayoutError> {
        if len > self.data.len() {
            return Err(LayoutError::InvalidLength {
                expected: len,
                actual: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }
}
