//! Shared application state for the web server.

use rosterkeep_store::HistoryResolver;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read/save policy over the cache and the durable file.
    pub history: HistoryResolver,

    /// Web server configuration.
    pub config: WebConfig,
}
