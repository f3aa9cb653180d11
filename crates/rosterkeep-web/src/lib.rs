//! HTTP transport for rosterkeep.
//!
//! Maps three routes onto the history store and serves the static
//! frontend directories:
//!
//! - `GET /history` returns the resolved history document.
//! - `POST /save-history` persists a new history document.
//! - `GET /healthz` is a liveness probe independent of store health.
//! - `/`, `/input` and `/output` serve files from disk.

use std::path::PathBuf;

pub mod api;
pub mod server;
pub mod state;

pub use server::{WebServer, build_router};
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Frontend assets served at `/`.
    pub public_dir: Option<PathBuf>,
    /// Input data files served at `/input`.
    pub input_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
            public_dir: None,
            input_dir: None,
        }
    }
}
