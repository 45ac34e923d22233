//! Request handler module
//!
//! Decides which reply a request gets: CORS preflight and session traffic on the
//! bind path, static content everywhere else.

pub mod router;
pub mod session;

// Re-export main entry point
pub use router::dispatch;
pub use session::{EchoSession, SessionHandler, SessionReply, SessionRequest};
