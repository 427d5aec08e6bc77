//! Request and response messages
//!
//! [`Request`] and [`Response`] pair a command/status with its payload and
//! know how to encode themselves into a complete frame (head included)
//! and decode themselves from a frame's payload.
//!
//! Decoding is strict: a payload with trailing bytes after the last field
//! is malformed, the same as a truncated one.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::frame::{Command, FrameHead, Status};
use crate::types::{Counts, Event, Header, SampleBlock, WakeReason};
use crate::{Result, FRAME_HEAD_LEN};

/// A client request, one variant per command
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    PutHeader(Header),
    PutSamples(SampleBlock),
    PutEvents(Vec<Event>),
    GetHeader,
    GetSamples { from: u64, to: u64 },
    GetEvents { from: u64, to: u64 },
    FlushHeader,
    FlushData,
    FlushEvents,
    GetCounts,
    WaitForData {
        min_samples: u64,
        min_events: u64,
        timeout_ms: u32,
    },
}

impl Request {
    /// Command code for this request
    pub fn command(&self) -> Command {
        match self {
            Self::PutHeader(_) => Command::PutHeader,
            Self::PutSamples(_) => Command::PutSamples,
            Self::PutEvents(_) => Command::PutEvents,
            Self::GetHeader => Command::GetHeader,
            Self::GetSamples { .. } => Command::GetSamples,
            Self::GetEvents { .. } => Command::GetEvents,
            Self::FlushHeader => Command::FlushHeader,
            Self::FlushData => Command::FlushData,
            Self::FlushEvents => Command::FlushEvents,
            Self::GetCounts => Command::GetCounts,
            Self::WaitForData { .. } => Command::WaitForData,
        }
    }

    /// Encode into a complete frame (head + payload)
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEAD_LEN + 64);
        FrameHead::encode_into(self.command().to_u16(), 0, &mut buf);

        match self {
            Self::PutHeader(header) => header.encode(&mut buf),
            Self::PutSamples(block) => block.encode(&mut buf),
            Self::PutEvents(events) => encode_events(events, &mut buf),
            Self::GetSamples { from, to } | Self::GetEvents { from, to } => {
                buf.put_u64(*from);
                buf.put_u64(*to);
            }
            Self::WaitForData {
                min_samples,
                min_events,
                timeout_ms,
            } => {
                buf.put_u64(*min_samples);
                buf.put_u64(*min_events);
                buf.put_u32(*timeout_ms);
            }
            Self::GetHeader
            | Self::FlushHeader
            | Self::FlushData
            | Self::FlushEvents
            | Self::GetCounts => {}
        }

        patch_payload_len(&mut buf);
        buf.freeze()
    }

    /// Decode a request payload for the given command
    pub fn decode(command: Command, mut payload: Bytes) -> Result<Self> {
        let request = match command {
            Command::PutHeader => Self::PutHeader(Header::decode(&mut payload)?),
            Command::PutSamples => Self::PutSamples(SampleBlock::decode(&mut payload)?),
            Command::PutEvents => Self::PutEvents(decode_events(&mut payload)?),
            Command::GetHeader => Self::GetHeader,
            Command::GetSamples => {
                let (from, to) = decode_range(&mut payload)?;
                Self::GetSamples { from, to }
            }
            Command::GetEvents => {
                let (from, to) = decode_range(&mut payload)?;
                Self::GetEvents { from, to }
            }
            Command::FlushHeader => Self::FlushHeader,
            Command::FlushData => Self::FlushData,
            Command::FlushEvents => Self::FlushEvents,
            Command::GetCounts => Self::GetCounts,
            Command::WaitForData => {
                if payload.remaining() < 20 {
                    return Err(ProtocolError::truncated("wait parameters"));
                }
                Self::WaitForData {
                    min_samples: payload.get_u64(),
                    min_events: payload.get_u64(),
                    timeout_ms: payload.get_u32(),
                }
            }
        };

        if payload.has_remaining() {
            return Err(ProtocolError::TrailingBytes(payload.remaining()));
        }
        Ok(request)
    }
}

/// A server response
///
/// `Ok`-status payload shape depends on the command being answered, so
/// [`Response::decode`] takes the originating command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Mutation or flush succeeded; empty payload
    Ok,
    Header(Header),
    Samples(SampleBlock),
    Events(Vec<Event>),
    Counts(Counts),
    Wait { counts: Counts, wake: WakeReason },
    /// Store-level failure; the connection stays usable
    Error { status: Status, message: String },
}

impl Response {
    /// Status code for this response
    pub fn status(&self) -> Status {
        match self {
            Self::Error { status, .. } => *status,
            _ => Status::Ok,
        }
    }

    /// Encode into a complete frame (head + payload)
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEAD_LEN + 64);
        FrameHead::encode_into(self.status().to_u16(), 0, &mut buf);

        match self {
            Self::Ok => {}
            Self::Header(header) => header.encode(&mut buf),
            Self::Samples(block) => block.encode(&mut buf),
            Self::Events(events) => encode_events(events, &mut buf),
            Self::Counts(counts) => counts.encode(&mut buf),
            Self::Wait { counts, wake } => {
                counts.encode(&mut buf);
                buf.put_u8(*wake as u8);
            }
            Self::Error { message, .. } => buf.put_slice(message.as_bytes()),
        }

        patch_payload_len(&mut buf);
        buf.freeze()
    }

    /// Decode a response payload for the command that produced it
    pub fn decode(command: Command, status: Status, mut payload: Bytes) -> Result<Self> {
        if !status.is_ok() {
            let message = String::from_utf8(payload.to_vec())
                .map_err(|_| ProtocolError::InvalidUtf8("error message"))?;
            return Ok(Self::Error { status, message });
        }

        let response = match command {
            Command::GetHeader => Self::Header(Header::decode(&mut payload)?),
            Command::GetSamples => Self::Samples(SampleBlock::decode(&mut payload)?),
            Command::GetEvents => Self::Events(decode_events(&mut payload)?),
            Command::GetCounts => Self::Counts(Counts::decode(&mut payload)?),
            Command::WaitForData => {
                let counts = Counts::decode(&mut payload)?;
                if payload.remaining() < 1 {
                    return Err(ProtocolError::truncated("wake reason"));
                }
                let wake = WakeReason::from_u8(payload.get_u8())?;
                Self::Wait { counts, wake }
            }
            Command::PutHeader
            | Command::PutSamples
            | Command::PutEvents
            | Command::FlushHeader
            | Command::FlushData
            | Command::FlushEvents => Self::Ok,
        };

        if payload.has_remaining() {
            return Err(ProtocolError::TrailingBytes(payload.remaining()));
        }
        Ok(response)
    }
}

fn encode_events(events: &[Event], buf: &mut BytesMut) {
    buf.put_u32(events.len() as u32);
    for event in events {
        event.encode(buf);
    }
}

fn decode_events(buf: &mut Bytes) -> Result<Vec<Event>> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::truncated("event count"));
    }
    let count = buf.get_u32() as usize;
    let mut events = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        events.push(Event::decode(buf)?);
    }
    Ok(events)
}

fn decode_range(buf: &mut Bytes) -> Result<(u64, u64)> {
    if buf.remaining() < 16 {
        return Err(ProtocolError::truncated("index range"));
    }
    Ok((buf.get_u64(), buf.get_u64()))
}

/// Patch the payload length into a frame built head-first
fn patch_payload_len(buf: &mut BytesMut) {
    let len = (buf.len() - FRAME_HEAD_LEN) as u32;
    buf[4..8].copy_from_slice(&len.to_be_bytes());
}
