//! callerid daemon entrypoint.
//!
//! Hosts the foreground listener. The platform telephony shim connects to
//! `daemon.sock` and streams phone-state events as NDJSON; the daemon resolves
//! callers and writes alerts into the notification spool.

use fs_err as fs;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use callerid_core::config::{load_config, CallerIdConfig};
use callerid_core::directory::{Directory, DirectoryConnector, RestDirectoryConnector};
use callerid_core::{
    ChannelTelephony, ContactCache, FileNativeSink, ForegroundOptions, ForegroundParts,
    ForegroundService, ListenerState, SessionStore, SpoolNotifier, StaticPermissions,
    StorageConfig, UnavailableDirectory,
};

mod bridge;
mod server;

use bridge::EventBridge;

const DEBUG_LOG_ENV: &str = "CALLERID_DEBUG_LOG";

#[tokio::main]
async fn main() {
    init_logging();

    let storage = match StorageConfig::resolve() {
        Ok(storage) => storage,
        Err(err) => {
            error!(error = %err, "Failed to resolve storage root");
            std::process::exit(1);
        }
    };

    if let Err(err) = storage.ensure_dirs() {
        error!(error = %err, root = %storage.root().display(), "Failed to prepare storage root");
        std::process::exit(1);
    }

    let config = match load_config(&storage.config_file()) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load config; using defaults");
            CallerIdConfig::default()
        }
    };

    let socket_path = storage.socket_file();
    if let Err(err) = remove_existing_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to remove existing socket");
        std::process::exit(1);
    }

    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    let (sender, telephony) = ChannelTelephony::new();
    let service = build_service(&storage, &config, telephony);
    if service.start().await != ListenerState::Listening {
        error!("Telephony listener did not attach; exiting");
        let _ = fs::remove_file(&socket_path);
        std::process::exit(1);
    }

    info!(
        path = %socket_path.display(),
        directory_configured = config.directory.is_configured(),
        lookup_timeout_secs = config.lookup.timeout_secs,
        post_call_prompt = config.notifications.post_call_prompt,
        "callerid daemon started"
    );

    let bridge = Arc::new(EventBridge::new(sender));
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    tokio::spawn(server::serve_connection(stream, Arc::clone(&bridge)));
                }
                Err(err) => warn!(error = %err, "Failed to accept shim connection"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    service.stop();
    if let Err(err) = fs::remove_file(&socket_path) {
        warn!(error = %err, "Failed to remove daemon socket on shutdown");
    }
}

fn init_logging() {
    let debug_enabled = env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn remove_existing_socket(socket_path: &Path) -> Result<(), String> {
    if socket_path.exists() {
        fs::remove_file(socket_path)
            .map_err(|err| format!("Failed to remove existing socket: {}", err))?;
    }
    Ok(())
}

fn build_service(
    storage: &StorageConfig,
    config: &CallerIdConfig,
    telephony: ChannelTelephony,
) -> Arc<ForegroundService> {
    let cache = ContactCache::for_storage(storage)
        .with_sink(Arc::new(FileNativeSink::for_storage(storage)));

    let session = SessionStore::for_storage(storage).load();
    if session.is_none() {
        info!("No stored session; directory queries run anonymously");
    }
    let directory: Arc<dyn Directory> =
        match RestDirectoryConnector::new(config.directory.clone()).connect(session) {
            Ok(directory) => directory,
            Err(err) => {
                warn!(error = %err, "Directory unavailable; resolving from cache only");
                Arc::new(UnavailableDirectory)
            }
        };

    ForegroundService::new(
        ForegroundParts {
            cache,
            directory,
            notifier: Arc::new(SpoolNotifier::for_storage(storage)),
            permissions: Arc::new(StaticPermissions::new(config.permissions.granted.clone())),
            telephony: Arc::new(telephony),
        },
        ForegroundOptions::from_config(config),
    )
}
