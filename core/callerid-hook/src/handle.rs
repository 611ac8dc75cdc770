//! Background task handler.
//!
//! Reads one telephony broadcast as JSON from stdin and runs the headless
//! resolution pipeline against it.
//!
//! ```text
//! incoming(number) → cache → directory (bounded) → alert + self-heal
//! offhook / ended  → clear alert
//! ```
//!
//! Pipeline outcomes never fail the process. Only unreadable input does.
//!
//! When a daemon answers on `daemon.sock` the foreground listener owns the
//! call, and the broadcast is left to it.

use std::io::{self, Read};
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use callerid_core::config::{load_config, CallerIdConfig};
use callerid_core::{
    BackgroundTask, FileNativeSink, RestDirectoryConnector, SpoolNotifier, StorageConfig,
    TaskOutcome,
};
use callerid_protocol::parse_event_line;

pub fn run() -> Result<(), String> {
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;

    if input.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(());
    }

    let payload = parse_event_line(&input)
        .map_err(|info| format!("Failed to parse task payload: {}", info))?;

    let storage = StorageConfig::resolve().map_err(|e| e.to_string())?;
    if foreground_alive(&storage) {
        tracing::info!(event = %payload.event, "Foreground daemon is live; skipping background task");
        return Ok(());
    }

    let config = match load_config(&storage.config_file()) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load config; using defaults");
            CallerIdConfig::default()
        }
    };

    let task = BackgroundTask::new(
        storage.clone(),
        Arc::new(RestDirectoryConnector::new(config.directory.clone())),
        Arc::new(SpoolNotifier::for_storage(&storage)),
        config.lookup.timeout(),
    )
    .with_native_sink(Arc::new(FileNativeSink::for_storage(&storage)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    let outcome = runtime.block_on(task.run(payload));
    log_outcome(&outcome);
    Ok(())
}

/// A successful connect means a daemon is accepting events. A stale socket
/// file left by a crashed daemon refuses the connection.
fn foreground_alive(storage: &StorageConfig) -> bool {
    let socket = storage.socket_file();
    if !socket.exists() {
        return false;
    }
    match UnixStream::connect(&socket) {
        Ok(_) => true,
        Err(err) => {
            tracing::debug!(error = %err, path = %socket.display(), "Daemon socket not answering");
            false
        }
    }
}

fn log_outcome(outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Resolved(resolved) => {
            tracing::info!(outcome = ?resolved, "Background task finished")
        }
        TaskOutcome::Cleared => tracing::info!("Background task cleared caller alert"),
        TaskOutcome::Skipped => tracing::debug!("Background task had nothing to do"),
    }
}
