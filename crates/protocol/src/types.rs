//! Core data types for the sample/event stream
//!
//! These types flow through the whole system: the codec builds them from
//! wire payloads, the store retains them, and responses carry them back.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::Result;

/// Sample encoding for one session
///
/// Fixed enumeration; the tag values are the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    I64 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    U64 = 7,
    F32 = 8,
    F64 = 9,
}

impl DataType {
    /// Size of one sample value in bytes
    #[inline]
    pub fn size_bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Parse a wire tag
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::I8),
            1 => Ok(Self::I16),
            2 => Ok(Self::I32),
            3 => Ok(Self::I64),
            4 => Ok(Self::U8),
            5 => Ok(Self::U16),
            6 => Ok(Self::U32),
            7 => Ok(Self::U64),
            8 => Ok(Self::F32),
            9 => Ok(Self::F64),
            other => Err(ProtocolError::InvalidDataType(other)),
        }
    }
}

/// Byte order of the raw sample payload
///
/// Pass-through metadata: the store never reorders sample bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SampleByteOrder {
    Little = 0,
    Big = 1,
}

impl SampleByteOrder {
    /// Byte order of the machine the server runs on
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// Parse a wire tag
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Little),
            1 => Ok(Self::Big),
            other => Err(ProtocolError::InvalidByteOrder(other)),
        }
    }
}

/// Channel layout and sample encoding for a streaming session
///
/// Immutable once accepted by the store until an explicit header flush.
/// `sample_rate` of 0 means "unspecified/event-only". `aux` is opaque
/// auxiliary metadata carried verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub channels: u32,
    pub sample_rate: f32,
    pub data_type: DataType,
    pub byte_order: SampleByteOrder,
    pub aux: Bytes,
}

impl Header {
    /// Create a header with no auxiliary metadata and native byte order
    pub fn new(channels: u32, sample_rate: f32, data_type: DataType) -> Self {
        Self {
            channels,
            sample_rate,
            data_type,
            byte_order: SampleByteOrder::native(),
            aux: Bytes::new(),
        }
    }

    /// Bytes per column (one sample for every channel)
    #[inline]
    pub fn row_size(&self) -> usize {
        self.channels as usize * self.data_type.size_bytes()
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.channels);
        buf.put_f32(self.sample_rate);
        buf.put_u8(self.data_type as u8);
        buf.put_u8(self.byte_order as u8);
        buf.put_u32(self.aux.len() as u32);
        buf.put_slice(&self.aux);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < 10 {
            return Err(ProtocolError::truncated("header"));
        }
        let channels = buf.get_u32();
        let sample_rate = buf.get_f32();
        let data_type = DataType::from_u8(buf.get_u8())?;
        let byte_order = SampleByteOrder::from_u8(buf.get_u8())?;
        let aux = decode_bytes(buf, "header aux")?;

        Ok(Self {
            channels,
            sample_rate,
            data_type,
            byte_order,
            aux,
        })
    }
}

/// A contiguous run of samples: `channels` rows by `columns` time steps
///
/// `data` holds the raw sample values column-major (all channels of the
/// first time step, then all channels of the second, ...), exactly
/// `channels * columns * data_type.size_bytes()` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    channels: u32,
    columns: u64,
    data_type: DataType,
    data: Bytes,
}

impl SampleBlock {
    /// Create a block, validating the payload length against the shape
    pub fn new(channels: u32, columns: u64, data_type: DataType, data: Bytes) -> Result<Self> {
        let expected = channels as u64 * columns * data_type.size_bytes() as u64;
        if expected != data.len() as u64 {
            return Err(ProtocolError::BlockSizeMismatch {
                channels,
                columns,
                data_type,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            channels,
            columns,
            data_type,
            data,
        })
    }

    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Number of time steps in this block
    #[inline]
    pub fn columns(&self) -> u64 {
        self.columns
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Raw sample payload
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Bytes per column
    #[inline]
    pub fn row_size(&self) -> usize {
        self.channels as usize * self.data_type.size_bytes()
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.channels);
        buf.put_u64(self.columns);
        buf.put_u8(self.data_type as u8);
        buf.put_u32(self.data.len() as u32);
        buf.put_slice(&self.data);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < 13 {
            return Err(ProtocolError::truncated("sample block"));
        }
        let channels = buf.get_u32();
        let columns = buf.get_u64();
        let data_type = DataType::from_u8(buf.get_u8())?;
        let data = decode_bytes(buf, "sample data")?;
        Self::new(channels, columns, data_type, data)
    }
}

/// A discrete annotation in the stream
///
/// `sample` is the sample index the event refers to; it may point at a
/// sample that has not been written yet. `kind` is a short type label,
/// `value` an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub value: Bytes,
    pub sample: u64,
    pub offset: i32,
    pub duration: u32,
}

impl Event {
    /// Create an event with empty value and zero offset/duration
    pub fn marker(kind: impl Into<String>, sample: u64) -> Self {
        Self {
            kind: kind.into(),
            value: Bytes::new(),
            sample,
            offset: 0,
            duration: 0,
        }
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        // kind carries a u16 length prefix; decode can never yield a
        // longer one, so only locally built events can violate this
        debug_assert!(
            self.kind.len() <= u16::MAX as usize,
            "event kind length {} exceeds the u16 length prefix",
            self.kind.len()
        );
        buf.put_u16(self.kind.len() as u16);
        buf.put_slice(self.kind.as_bytes());
        buf.put_u32(self.value.len() as u32);
        buf.put_slice(&self.value);
        buf.put_u64(self.sample);
        buf.put_i32(self.offset);
        buf.put_u32(self.duration);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < 2 {
            return Err(ProtocolError::truncated("event kind length"));
        }
        let kind_len = buf.get_u16() as usize;
        if buf.remaining() < kind_len {
            return Err(ProtocolError::truncated("event kind"));
        }
        let kind = String::from_utf8(buf.split_to(kind_len).to_vec())
            .map_err(|_| ProtocolError::InvalidUtf8("event kind"))?;
        let value = decode_bytes(buf, "event value")?;
        if buf.remaining() < 16 {
            return Err(ProtocolError::truncated("event fields"));
        }
        let sample = buf.get_u64();
        let offset = buf.get_i32();
        let duration = buf.get_u32();

        Ok(Self {
            kind,
            value,
            sample,
            offset,
            duration,
        })
    }
}

/// Total samples and events accepted since the respective flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub samples: u64,
    pub events: u64,
}

impl Counts {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64(self.samples);
        buf.put_u64(self.events);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < 16 {
            return Err(ProtocolError::truncated("counts"));
        }
        Ok(Self {
            samples: buf.get_u64(),
            events: buf.get_u64(),
        })
    }
}

/// Why a wait-for-data call returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WakeReason {
    /// Sample or event threshold was met
    Satisfied = 0,
    /// Timeout elapsed with the thresholds unmet (not an error)
    Timeout = 1,
    /// A header reset or flush forced the wait to end
    Flushed = 2,
}

impl WakeReason {
    /// Parse a wire tag
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Satisfied),
            1 => Ok(Self::Timeout),
            2 => Ok(Self::Flushed),
            other => Err(ProtocolError::InvalidWakeReason(other)),
        }
    }
}

/// Decode a u32-length-prefixed byte string
pub(crate) fn decode_bytes(buf: &mut Bytes, field: &'static str) -> Result<Bytes> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::truncated(field));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::truncated(field));
    }
    Ok(buf.split_to(len))
}
