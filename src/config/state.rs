// Application state module
// Shared, read-mostly state handed to every connection

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::types::Config;
use crate::handler::{EchoSession, SessionHandler};
use crate::http::StaticFiles;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Resolved once from `config.http`
    pub static_files: StaticFiles,
    /// Receives bodies posted to the bind path
    pub session: Arc<dyn SessionHandler>,
    pub active_connections: AtomicUsize,
}

impl AppState {
    /// Create `AppState` with the default echo session handler
    pub fn new(config: &Config) -> Self {
        Self::with_session(config, Arc::new(EchoSession))
    }

    pub fn with_session(config: &Config, session: Arc<dyn SessionHandler>) -> Self {
        Self {
            config: config.clone(),
            static_files: config.static_files(),
            session,
            active_connections: AtomicUsize::new(0),
        }
    }
}
