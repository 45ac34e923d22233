// Connection handling module
// Reads one request per connection, dispatches it and flushes the reply

use bytes::{Bytes, BytesMut};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, Receiver};
use tokio::time::timeout;

use crate::config::AppState;
use crate::handler;
use crate::http::{parse_request, ChannelSink, ParsedRequest, Request, RequestDescriptor, WireError};
use crate::logger::{self, AccessLogEntry};

/// Upper bound for a request head, blank line included
const MAX_HEAD_SIZE: usize = 16 * 1024;

const READ_BUFFER_SIZE: usize = 4096;

/// Response chunks queued between the dispatch thread and the socket writer
const RESPONSE_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    #[error("request body of {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { size: usize, limit: u64 },

    #[error("peer closed the connection mid-request")]
    UnexpectedEof,

    #[error("request not received within {0}s")]
    ReadTimeout(u64),

    #[error("response not flushed within {0}s")]
    WriteTimeout(u64),

    #[error("dispatch task failed: {0}")]
    Dispatch(String),
}

/// Accept a connection, enforcing the connection limit, and serve it in a new task
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(err) = serve_connection(stream, peer_addr, &state).await {
            logger::log_connection_error(&peer_addr, &err);
        }
        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Serve exactly one request on `stream`
pub async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) -> Result<(), ConnectionError> {
    let perf = &state.config.performance;
    let (mut reader, writer) = stream.into_split();

    let read = read_request(&mut reader, state.config.http.max_body_size);
    let Some((parsed, body)) = timeout(Duration::from_secs(perf.read_timeout), read)
        .await
        .map_err(|_| ConnectionError::ReadTimeout(perf.read_timeout))??
    else {
        // Connected and left without sending anything
        return Ok(());
    };
    let started = Instant::now();

    let mut entry = AccessLogEntry::new(
        peer_addr.to_string(),
        parsed.http_method().to_string(),
        parsed.request_url().to_string(),
    );
    entry.http_version = parsed.http_version().to_string();
    entry.host = header_value(&parsed, "host");
    entry.referer = header_value(&parsed, "referer");
    entry.user_agent = header_value(&parsed, "user-agent");

    let (tx, rx) = mpsc::channel(RESPONSE_QUEUE_DEPTH);
    let write_task = tokio::spawn(write_responses(writer, rx, perf.write_timeout));

    // File reads and the bounded sink both block, so the reply runs on the blocking pool
    let dispatch_state = Arc::clone(state);
    let dispatched = tokio::task::spawn_blocking(move || {
        let mut request = Request::new(ChannelSink::new(tx), &parsed, body);
        handler::dispatch(&dispatch_state, &mut request)
    })
    .await
    .map_err(|e| ConnectionError::Dispatch(e.to_string()))?;

    // A writer failure closes the channel, so report it ahead of the sink error it causes
    write_task
        .await
        .map_err(|e| ConnectionError::Dispatch(e.to_string()))??;
    let sent = dispatched?;

    if state.config.logging.access_log {
        entry.status = sent.status.code();
        entry.body_bytes = sent.body_bytes;
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(())
}

/// Read one request head and its body
///
/// Returns `Ok(None)` if the peer closes before sending a single byte.
pub async fn read_request<R>(
    reader: &mut R,
    max_body_size: u64,
) -> Result<Option<(ParsedRequest, Bytes)>, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let parsed = loop {
        if let Some(parsed) = parse_request(&buf)? {
            break parsed;
        }
        if buf.len() >= MAX_HEAD_SIZE {
            return Err(ConnectionError::HeadTooLarge(MAX_HEAD_SIZE));
        }
        if reader.read_buf(&mut buf).await? == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }
    };

    if parsed.content_length as u64 > max_body_size {
        return Err(ConnectionError::BodyTooLarge {
            size: parsed.content_length,
            limit: max_body_size,
        });
    }

    let total = parsed.head_len + parsed.content_length;
    while buf.len() < total {
        if reader.read_buf(&mut buf).await? == 0 {
            return Err(ConnectionError::UnexpectedEof);
        }
    }

    let mut body = buf.split_off(parsed.head_len);
    body.truncate(parsed.content_length);
    Ok(Some((parsed, body.freeze())))
}

/// Drain the sink channel into the socket, then close the write side
///
/// `write_timeout` bounds each chunk, so a slow but progressing peer is never cut off.
async fn write_responses<W>(
    mut writer: W,
    mut rx: Receiver<Bytes>,
    write_timeout: u64,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    let limit = Duration::from_secs(write_timeout);
    while let Some(chunk) = rx.recv().await {
        timeout(limit, writer.write_all(&chunk))
            .await
            .map_err(|_| ConnectionError::WriteTimeout(write_timeout))??;
    }
    timeout(limit, writer.shutdown())
        .await
        .map_err(|_| ConnectionError::WriteTimeout(write_timeout))??;
    Ok(())
}

fn header_value(parsed: &ParsedRequest, name: &str) -> Option<String> {
    parsed
        .headers()
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}
