//! Response sink module
//!
//! A sink accepts finished response blocks and owns the actual transport I/O.

use bytes::Bytes;
use std::io;
use tokio::sync::mpsc::Sender;

/// Destination for response bytes
///
/// Scheduling the write is entirely the implementation's concern; a failed write is
/// reported once and never retried by the caller.
pub trait Sink {
    fn stream_write(&mut self, data: Bytes) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn stream_write(&mut self, data: Bytes) -> io::Result<()> {
        (**self).stream_write(data)
    }
}

/// Captures every write in order
impl Sink for Vec<Bytes> {
    fn stream_write(&mut self, data: Bytes) -> io::Result<()> {
        self.push(data);
        Ok(())
    }
}

/// Hands writes to a connection's writer task over a bounded channel
///
/// A full channel parks the calling thread until the writer catches up, so at most
/// the channel capacity in chunks is ever held in memory. Must be used from a
/// blocking thread (e.g. `spawn_blocking`), never from async code.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Bytes>,
}

impl ChannelSink {
    pub const fn new(tx: Sender<Bytes>) -> Self {
        Self { tx }
    }
}

impl Sink for ChannelSink {
    fn stream_write(&mut self, data: Bytes) -> io::Result<()> {
        self.tx
            .blocking_send(data)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "connection writer closed"))
    }
}
