//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, and runs
//! the HTTP listener until Ctrl-C.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;

use rosterkeep_store::HistoryResolver;

use crate::WebConfig;
use crate::api;
use crate::state::AppState;

/// The rosterkeep web server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address, port and static directories.
    /// * `history` - The resolver shared across all requests.
    pub fn new(config: WebConfig, history: HistoryResolver) -> Self {
        let state = Arc::new(AppState {
            history,
            config: config.clone(),
        });
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let router = build_router(Arc::clone(&self.state));

        tracing::info!(
            addr = %addr,
            history = %self.state.history.file().path().display(),
            "starting web server"
        );

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("web server stopped");
        Ok(())
    }
}

/// Build the Axum router with all routes registered.
///
/// The output directory (where `history.json` lives) is always served at
/// `/output`; the frontend and input directories only when configured.
pub fn build_router(state: Arc<AppState>) -> Router {
    let output_dir = state.history.file().dir().to_path_buf();

    let mut router = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/history", get(api::get_history))
        .route("/save-history", post(api::save_history))
        .nest_service("/output", ServeDir::new(output_dir));

    if let Some(dir) = &state.config.input_dir {
        router = router.nest_service("/input", ServeDir::new(dir));
    }
    if let Some(dir) = &state.config.public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
