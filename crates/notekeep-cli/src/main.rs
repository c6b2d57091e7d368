//! notekeep - a command-line client for a personal note service.
//!
//! Run with no arguments for the interactive shell, or pass a single
//! command (e.g. `notekeep list`) to execute it and exit.

mod app;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notekeep_core::api::ApiClient;
use notekeep_core::auth::Session;
use notekeep_core::config::Config;

use app::{App, PromptConfirm};

/// Initialize the tracing subscriber for logging.
///
/// The shell owns the terminal, so logs go to a daily-rolling file under
/// the cache directory instead of stderr. Use RUST_LOG to control the
/// level (e.g. RUST_LOG=debug).
fn init_tracing(cache_dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(cache_dir.join("logs"), "notekeep.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let cache_dir = config
        .cache_dir()
        .unwrap_or_else(|_| PathBuf::from("./.notekeep"));

    // Guard must outlive main so buffered log lines are flushed on exit
    let _guard = init_tracing(&cache_dir);
    info!("notekeep starting");

    let session = Session::new(cache_dir);
    let client = ApiClient::new(config.base_url())?;

    let mut app = App::new(config, session, client, Box::new(PromptConfirm));
    app.bootstrap().await;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = if args.is_empty() {
        app.run().await
    } else {
        app.run_once(&args.join(" ")).await
    };

    info!("notekeep shutting down");
    result
}
