//! Frame head: version, command/status, payload length
//!
//! The same 8-byte layout frames both directions. The second field is a
//! command code on the request path and a status code on the response
//! path; [`FrameHead`] keeps it raw and the typed accessors interpret it.

use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::{Result, MAX_PAYLOAD_LEN, PROTOCOL_VERSION};

/// Size of the fixed frame head in bytes
pub const FRAME_HEAD_LEN: usize = 8;

/// Command codes for the request path
///
/// Grouped by nibble: 0x01xx put, 0x02xx get, 0x03xx flush, 0x04xx query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    PutHeader = 0x0101,
    PutSamples = 0x0102,
    PutEvents = 0x0103,
    GetHeader = 0x0201,
    GetSamples = 0x0202,
    GetEvents = 0x0203,
    FlushHeader = 0x0301,
    FlushData = 0x0302,
    FlushEvents = 0x0303,
    GetCounts = 0x0401,
    WaitForData = 0x0402,
}

impl Command {
    /// Parse a wire command code
    pub fn from_u16(code: u16) -> Result<Self> {
        match code {
            0x0101 => Ok(Self::PutHeader),
            0x0102 => Ok(Self::PutSamples),
            0x0103 => Ok(Self::PutEvents),
            0x0201 => Ok(Self::GetHeader),
            0x0202 => Ok(Self::GetSamples),
            0x0203 => Ok(Self::GetEvents),
            0x0301 => Ok(Self::FlushHeader),
            0x0302 => Ok(Self::FlushData),
            0x0303 => Ok(Self::FlushEvents),
            0x0401 => Ok(Self::GetCounts),
            0x0402 => Ok(Self::WaitForData),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    /// Wire representation
    #[inline]
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Status codes for the response path
///
/// `Ok` carries a command-specific payload; every other status carries a
/// UTF-8 diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Status {
    Ok = 0x0000,
    /// Data or events submitted before any header
    NoHeader = 0x0001,
    /// Block channel count differs from the current header
    ChannelMismatch = 0x0002,
    /// Requested index fell out of the retained window
    Evicted = 0x0003,
    /// Requested index beyond the total accepted
    OutOfRange = 0x0004,
    /// Request was well-framed but semantically invalid
    BadRequest = 0x0005,
}

impl Status {
    /// Parse a wire status code
    pub fn from_u16(code: u16) -> Result<Self> {
        match code {
            0x0000 => Ok(Self::Ok),
            0x0001 => Ok(Self::NoHeader),
            0x0002 => Ok(Self::ChannelMismatch),
            0x0003 => Ok(Self::Evicted),
            0x0004 => Ok(Self::OutOfRange),
            0x0005 => Ok(Self::BadRequest),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }

    /// Wire representation
    #[inline]
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// True for the success status
    #[inline]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Decoded 8-byte frame head
///
/// `code` is the raw second field; use [`FrameHead::command`] or
/// [`FrameHead::status`] depending on direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub version: u16,
    pub code: u16,
    pub payload_len: u32,
}

impl FrameHead {
    /// Decode a frame head, validating version and payload length
    pub fn decode(buf: &[u8; FRAME_HEAD_LEN]) -> Result<Self> {
        let version = u16::from_be_bytes([buf[0], buf[1]]);
        let code = u16::from_be_bytes([buf[2], buf[3]]);
        let payload_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                len: payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }

        Ok(Self {
            version,
            code,
            payload_len,
        })
    }

    /// Interpret the second field as a command code
    pub fn command(&self) -> Result<Command> {
        Command::from_u16(self.code)
    }

    /// Interpret the second field as a status code
    pub fn status(&self) -> Result<Status> {
        Status::from_u16(self.code)
    }

    /// Append an encoded frame head for the given code and payload length
    pub(crate) fn encode_into(code: u16, payload_len: u32, buf: &mut BytesMut) {
        buf.put_u16(PROTOCOL_VERSION);
        buf.put_u16(code);
        buf.put_u32(payload_len);
    }
}
