// Server module entry point
// Listener creation, accept loop and per-connection request handling

pub mod connection;
pub mod listener;

// `loop` is a keyword, so the file is mounted under another name
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used types
pub use connection::{accept_connection, ConnectionError};
pub use listener::create_reusable_listener;
pub use server_loop::{serve_until, start_server_loop};
