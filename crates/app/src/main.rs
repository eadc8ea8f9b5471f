use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Logs go to a file; stdout belongs to the dashboard.
fn init_tracing() -> Result<()> {
    let env = std::env::var("ONAIR_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let path = std::env::var("ONAIR_LOG_FILE").unwrap_or_else(|_| "onair.log".to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("logging setup failed: {e:#}");
    }
    let cfg = onair_tui::DashboardConfig::from_env();
    if let Err(e) = onair_tui::run(cfg).await {
        tracing::error!(error = %e, "dashboard failed");
        eprintln!("dashboard error: {e:#}");
        std::process::exit(1);
    }
}
