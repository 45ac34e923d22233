//! HTTP request handling for a bridge that multiplexes HTTP onto a long-lived
//! protocol stream.
//!
//! The core is [`http::Request`]: built from a parsed request descriptor, it writes
//! complete HTTP/1.1 responses to a [`http::Sink`] for payload replies, CORS
//! preflight, and static files served with traversal protection.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
