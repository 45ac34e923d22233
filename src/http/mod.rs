//! HTTP protocol layer module
//!
//! Request snapshots, response building and static file resolution. The wire parser
//! and the sink are boundaries: this layer consumes a descriptor and emits bytes.

pub mod cache;
pub mod files;
pub mod mime;
pub mod request;
pub mod response;
pub mod sink;
pub mod wire;

#[cfg(test)]
pub(crate) mod scratch;

// Re-export commonly used types
pub use files::{ResolveError, Resolved, StaticFiles};
pub use request::{Request, RequestDescriptor, Sent};
pub use response::Status;
pub use sink::{ChannelSink, Sink};
pub use wire::{parse_request, ParsedRequest, WireError};
