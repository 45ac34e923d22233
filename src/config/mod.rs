// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use crate::http::StaticFiles;
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Prefix for environment overrides, e.g. `BRIDGE_SERVER__PORT=8080`
const ENV_PREFIX: &str = "BRIDGE";

impl Config {
    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let builder = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );
        builder.build()?.try_deserialize()
    }

    /// Load configuration from an inline TOML document layered over the defaults
    pub fn from_toml(document: &str) -> Result<Self, config::ConfigError> {
        with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Static content settings for every path outside the bind path
    pub fn static_files(&self) -> StaticFiles {
        let files = StaticFiles::new(&self.http.public_dir).with_index_file(&self.http.index_file);
        match &self.http.not_found_page {
            Some(page) => files.with_not_found_page(page),
            None => files,
        }
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5280)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)?
        .set_default("http.bind_path", "/xmpp")?
        .set_default("http.public_dir", "web")?
        .set_default("http.index_file", "index.html")?
        .set_default("http.max_body_size", 10_485_760) // 10MB
}
