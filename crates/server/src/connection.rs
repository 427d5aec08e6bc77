//! Per-connection protocol handler
//!
//! One handler task per accepted connection, looping read-frame →
//! dispatch → write-response. The wait command parks inside the store's
//! wait primitive, raced against the connection's cancellation token so
//! a supervisor-initiated disconnect interrupts it immediately instead
//! of riding out the timeout.
//!
//! Error policy: protocol violations and I/O failures end the
//! connection; store precondition failures become error response frames
//! and the loop continues.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use pulse_protocol::{FrameHead, Request, Response, Status, FRAME_HEAD_LEN};
use pulse_store::{wait_for_data, DataError, DataStore};

use crate::monitor::{ClientId, MonitorSlot};
use crate::{now_ms, Result};

/// Everything a handler needs besides the stream itself
pub(crate) struct ConnectionContext {
    pub id: ClientId,
    pub peer: SocketAddr,
    pub store: Arc<dyn DataStore>,
    pub monitor: MonitorSlot,
    pub cancel: CancellationToken,
}

/// Drive one connection until peer close, error or cancellation
pub(crate) async fn handle_connection(
    ctx: ConnectionContext,
    mut stream: TcpStream,
) -> Result<()> {
    let mut head_buf = [0u8; FRAME_HEAD_LEN];

    loop {
        // Idle between requests: either a new frame head arrives or the
        // supervisor disconnects us.
        tokio::select! {
            _ = ctx.cancel.cancelled() => return Ok(()),
            res = stream.read_exact(&mut head_buf) => {
                match res {
                    Ok(_) => {}
                    // Peer closed between frames
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let head = FrameHead::decode(&head_buf)?;
        let command = head.command()?;

        let mut payload = vec![0u8; head.payload_len as usize];
        tokio::select! {
            _ = ctx.cancel.cancelled() => return Ok(()),
            res = stream.read_exact(&mut payload) => { res?; }
        }

        let request = Request::decode(command, Bytes::from(payload))?;

        let response = match dispatch(&ctx, request).await {
            Some(response) => response,
            // Cancelled while parked in a wait
            None => return Ok(()),
        };

        stream.write_all(&response.encode()).await?;
    }
}

/// Execute one request against the shared store
///
/// Returns `None` only when the connection was cancelled mid-wait.
async fn dispatch(ctx: &ConnectionContext, request: Request) -> Option<Response> {
    let response = match request {
        Request::PutHeader(header) => match ctx.store.put_header(header.clone()) {
            Ok(()) => {
                ctx.monitor.notify(|m| m.header_put(ctx.id, &header, now_ms()));
                Response::Ok
            }
            Err(e) => error_response(e),
        },

        Request::PutSamples(block) => match ctx.store.put_samples(&block) {
            Ok(total) => {
                ctx.monitor
                    .notify(|m| m.samples_put(ctx.id, block.columns(), total, now_ms()));
                Response::Ok
            }
            Err(e) => error_response(e),
        },

        Request::PutEvents(events) => {
            let count = events.len() as u64;
            match ctx.store.put_events(events) {
                Ok(total) => {
                    ctx.monitor
                        .notify(|m| m.events_put(ctx.id, count, total, now_ms()));
                    Response::Ok
                }
                Err(e) => error_response(e),
            }
        }

        Request::GetHeader => match ctx.store.get_header() {
            Ok(header) => Response::Header(header),
            Err(e) => error_response(e),
        },

        Request::GetSamples { from, to } => match ctx.store.get_samples(from, to) {
            Ok(block) => Response::Samples(block),
            Err(e) => error_response(e),
        },

        Request::GetEvents { from, to } => match ctx.store.get_events(from, to) {
            Ok(events) => Response::Events(events),
            Err(e) => error_response(e),
        },

        Request::FlushHeader => {
            ctx.store.flush_header();
            ctx.monitor.notify(|m| m.header_flushed(ctx.id, now_ms()));
            Response::Ok
        }

        Request::FlushData => {
            ctx.store.flush_data();
            ctx.monitor.notify(|m| m.data_flushed(ctx.id, now_ms()));
            Response::Ok
        }

        Request::FlushEvents => {
            ctx.store.flush_events();
            ctx.monitor.notify(|m| m.events_flushed(ctx.id, now_ms()));
            Response::Ok
        }

        Request::GetCounts => Response::Counts(ctx.store.counts()),

        Request::WaitForData {
            min_samples,
            min_events,
            timeout_ms,
        } => {
            let timeout = Duration::from_millis(u64::from(timeout_ms));
            let outcome = tokio::select! {
                _ = ctx.cancel.cancelled() => return None,
                outcome = wait_for_data(ctx.store.as_ref(), min_samples, min_events, timeout) => outcome,
            };
            Response::Wait {
                counts: outcome.counts,
                wake: outcome.wake,
            }
        }
    };

    Some(response)
}

/// Map a store failure to an error response frame
fn error_response(err: DataError) -> Response {
    let status = match err {
        DataError::NoHeader => Status::NoHeader,
        DataError::ChannelMismatch { .. } => Status::ChannelMismatch,
        DataError::Evicted { .. } => Status::Evicted,
        DataError::OutOfRange { .. } => Status::OutOfRange,
        DataError::InvalidRange { .. }
        | DataError::TypeMismatch { .. }
        | DataError::InvalidHeader(_)
        | DataError::InvalidBlock(_) => Status::BadRequest,
    };
    Response::Error {
        status,
        message: err.to_string(),
    }
}
