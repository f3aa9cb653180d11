//! CLI entry point for rosterkeep.
//!
//! This binary provides the `rosterkeep` command with subcommands for
//! serving the history API and printing the current history.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rosterkeep_store::{CacheConfig, DisabledCache, FileStore, HistoryCache, HistoryResolver, RedisCache};
use rosterkeep_web::{WebConfig, WebServer};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// rosterkeep: attendance history service with a Redis cache and a file of record.
#[derive(Parser)]
#[command(
    name = "rosterkeep",
    version,
    about = "Attendance history service",
    long_about = "Stores the attendance history document in Redis when available \
                  and always in a JSON file on local disk."
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve(ServeArgs),

    /// Print the current history document and exit.
    Show,
}

/// Where the history lives.
#[derive(Args, Debug)]
struct StoreArgs {
    /// Directory holding history.json.
    #[arg(long, env = "OUTPUT_DIR", default_value = "output", global = true)]
    output_dir: PathBuf,

    #[arg(long, env = "REDIS_HOST", default_value = "localhost", global = true)]
    redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379, global = true)]
    redis_port: u16,

    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true, global = true)]
    redis_password: Option<String>,

    /// Connect and command timeout for Redis, in milliseconds.
    #[arg(long, env = "REDIS_TIMEOUT_MS", default_value_t = 2000, global = true)]
    cache_timeout_ms: u64,

    /// Skip Redis entirely and use only the file.
    #[arg(long, env = "HISTORY_NO_CACHE", global = true)]
    no_cache: bool,
}

impl StoreArgs {
    fn cache_config(&self) -> CacheConfig {
        let timeout = Duration::from_millis(self.cache_timeout_ms);
        CacheConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            password: self.redis_password.clone().filter(|p| !p.is_empty()),
            connect_timeout: timeout,
            op_timeout: timeout,
        }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "127.0.0.1")]
    bind_addr: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Frontend assets served at `/`.
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Input data files served at `/input`.
    #[arg(long, env = "INPUT_DIR", default_value = "input")]
    input_dir: PathBuf,
}

impl ServeArgs {
    fn web_config(&self) -> WebConfig {
        WebConfig {
            bind_addr: self.bind_addr.clone(),
            port: self.port,
            public_dir: Some(self.public_dir.clone()),
            input_dir: Some(self.input_dir.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => cmd_serve(&cli.store, &args).await,
        Commands::Show => cmd_show(&cli.store).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(store: &StoreArgs, args: &ServeArgs) -> Result<()> {
    init_tracing("info");

    let history = build_resolver(store, true).await?;
    info!(path = %history.file().path().display(), cache = history.cache().name(), "store initialized");

    let server = WebServer::new(args.web_config(), history);
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("web server failed")
}

// ---------------------------------------------------------------------------
// Subcommand: show
// ---------------------------------------------------------------------------

async fn cmd_show(store: &StoreArgs) -> Result<()> {
    init_tracing("warn");

    let history = build_resolver(store, false).await?;
    let doc = history.read().await;
    let text = doc.to_pretty_json().context("failed to encode history")?;
    println!("{text}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Assemble the resolver from resolved configuration.
///
/// With `eager_connect`, one Redis connection attempt is made up front so
/// problems show in the startup log; failure is not fatal.
async fn build_resolver(store: &StoreArgs, eager_connect: bool) -> Result<HistoryResolver> {
    let file = FileStore::new(&store.output_dir);

    let cache: Arc<dyn HistoryCache> = if store.no_cache {
        info!("cache disabled, using file store only");
        Arc::new(DisabledCache)
    } else {
        let config = store.cache_config();
        let redis = RedisCache::new(&config).context("invalid redis configuration")?;
        if eager_connect && !redis.connect().await {
            warn!(addr = %config.target(), "redis unavailable at startup, will retry per request");
        }
        Arc::new(redis)
    };

    Ok(HistoryResolver::new(cache, file))
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
