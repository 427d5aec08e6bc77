//! Pulse Client - minimal async client for the pulse buffer server
//!
//! One method per protocol command, blocking request/response over a
//! single TCP connection. Primarily used by integration tests and as a
//! reference implementation for acquisition-side SDKs.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pulse_client::BufferClient;
//! use pulse_protocol::{DataType, Header};
//!
//! let mut client = BufferClient::connect("127.0.0.1:1972").await?;
//! client.put_header(Header::new(4, 100.0, DataType::F32)).await?;
//! let (counts, wake) = client
//!     .wait_for_data(100, u64::MAX, Duration::from_secs(5))
//!     .await?;
//! ```

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use pulse_protocol::{
    Counts, Event, FrameHead, Header, ProtocolError, Request, Response, SampleBlock, Status,
    WakeReason, FRAME_HEAD_LEN,
};

/// Errors on the client side of the protocol
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection or transport failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server sent a frame the client cannot decode
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Server rejected the request
    #[error("server error ({status:?}): {message}")]
    Server { status: Status, message: String },

    /// Response did not match the request's command
    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// A connected buffer client
pub struct BufferClient {
    stream: TcpStream,
}

impl BufferClient {
    /// Connect to a buffer server
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Submit a header, resetting the server's counters and retained data
    pub async fn put_header(&mut self, header: Header) -> Result<()> {
        self.expect_ok(Request::PutHeader(header), "PutHeader").await
    }

    /// Append a block of samples
    pub async fn put_samples(&mut self, block: SampleBlock) -> Result<()> {
        self.expect_ok(Request::PutSamples(block), "PutSamples").await
    }

    /// Append events in order
    pub async fn put_events(&mut self, events: Vec<Event>) -> Result<()> {
        self.expect_ok(Request::PutEvents(events), "PutEvents").await
    }

    /// Fetch the current header
    pub async fn get_header(&mut self) -> Result<Header> {
        match self.request(Request::GetHeader).await? {
            Response::Header(header) => Ok(header),
            _ => Err(ClientError::UnexpectedResponse("GetHeader")),
        }
    }

    /// Fetch samples in the half-open index range `[from, to)`
    pub async fn get_samples(&mut self, from: u64, to: u64) -> Result<SampleBlock> {
        match self.request(Request::GetSamples { from, to }).await? {
            Response::Samples(block) => Ok(block),
            _ => Err(ClientError::UnexpectedResponse("GetSamples")),
        }
    }

    /// Fetch events in the half-open index range `[from, to)`
    pub async fn get_events(&mut self, from: u64, to: u64) -> Result<Vec<Event>> {
        match self.request(Request::GetEvents { from, to }).await? {
            Response::Events(events) => Ok(events),
            _ => Err(ClientError::UnexpectedResponse("GetEvents")),
        }
    }

    /// Clear header, samples and events on the server
    pub async fn flush_header(&mut self) -> Result<()> {
        self.expect_ok(Request::FlushHeader, "FlushHeader").await
    }

    /// Clear retained samples only
    pub async fn flush_data(&mut self) -> Result<()> {
        self.expect_ok(Request::FlushData, "FlushData").await
    }

    /// Clear retained events only
    pub async fn flush_events(&mut self) -> Result<()> {
        self.expect_ok(Request::FlushEvents, "FlushEvents").await
    }

    /// Current sample/event totals, without blocking
    pub async fn get_counts(&mut self) -> Result<Counts> {
        match self.request(Request::GetCounts).await? {
            Response::Counts(counts) => Ok(counts),
            _ => Err(ClientError::UnexpectedResponse("GetCounts")),
        }
    }

    /// Block server-side until a threshold is met, a flush occurs or the
    /// timeout elapses
    ///
    /// Either threshold satisfies the wait; pass `u64::MAX` for the side
    /// you do not care about. Timeout resolution is milliseconds.
    pub async fn wait_for_data(
        &mut self,
        min_samples: u64,
        min_events: u64,
        timeout: Duration,
    ) -> Result<(Counts, WakeReason)> {
        let request = Request::WaitForData {
            min_samples,
            min_events,
            timeout_ms: timeout.as_millis().min(u32::MAX as u128) as u32,
        };
        match self.request(request).await? {
            Response::Wait { counts, wake } => Ok((counts, wake)),
            _ => Err(ClientError::UnexpectedResponse("WaitForData")),
        }
    }

    /// Send one request frame and read back one response frame
    async fn request(&mut self, request: Request) -> Result<Response> {
        let command = request.command();
        self.stream.write_all(&request.encode()).await?;

        let mut head_buf = [0u8; FRAME_HEAD_LEN];
        self.stream.read_exact(&mut head_buf).await?;
        let head = FrameHead::decode(&head_buf)?;
        let status = head.status()?;

        let mut payload = vec![0u8; head.payload_len as usize];
        self.stream.read_exact(&mut payload).await?;

        match Response::decode(command, status, Bytes::from(payload))? {
            Response::Error { status, message } => Err(ClientError::Server { status, message }),
            response => Ok(response),
        }
    }

    async fn expect_ok(&mut self, request: Request, what: &'static str) -> Result<()> {
        match self.request(request).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse(what)),
        }
    }
}
