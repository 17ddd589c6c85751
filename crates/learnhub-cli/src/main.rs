//! LearnHub CLI - a terminal client for the LearnHub learning platform.
//!
//! Signs in against the LearnHub backend, keeps the session between runs and
//! lists programs and dashboard data for the signed-in user.

mod app;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Directory for rolling log files; unset means stderr only
const LOG_DIR_ENV: &str = "LEARNHUB_LOG_DIR";

const USAGE: &str = "\
Usage: learnhub <command>

Commands:
  login [email]      Sign in (prompts for the password)
  register           Create an account
  logout             Sign out and forget the saved session
  status             Show the current session
  programs           List available programs
  dashboard          Show dashboard and progress data
  approve <user-id>  Approve a pending educator (admin)

Environment:
  LEARNHUB_API_URL   Backend base URL (default http://localhost:8000)
  LEARNHUB_STORAGE   Session storage: file, keyring or memory
  LEARNHUB_LOG_DIR   Also write logs to daily files in this directory
  RUST_LOG           Log filter (default warn)";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "learnhub.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(command) => command.as_str(),
        None => {
            eprintln!("{}", USAGE);
            return Ok(());
        }
    };

    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut app = App::new()?;
    info!(command, "LearnHub CLI starting");

    match command {
        "login" => app.login(args.get(1).cloned()).await,
        "register" => app.register().await,
        "logout" => app.logout().await,
        "status" => app.status().await,
        "programs" => app.programs().await,
        "dashboard" => app.dashboard().await,
        "approve" => {
            let user_id = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("approve needs a user id"))?
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("Invalid user id: {}", e))?;
            app.approve(user_id).await
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            Err(anyhow::anyhow!("Unknown command: {}", other))
        }
    }
}
