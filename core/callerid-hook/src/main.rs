//! callerid-hook: headless caller resolution for one telephony broadcast.
//!
//! The host platform spawns this binary when a phone-state broadcast arrives
//! and no foreground daemon is running.
//!
//! ## Subcommands
//!
//! - `handle`: Run the background task, reads the JSON payload from stdin
//! - `normalize`: Print the canonical forms of a phone number

mod handle;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "callerid-hook")]
#[command(about = "Incoming-call caller resolution task")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a telephony broadcast (reads JSON from stdin)
    Handle,

    /// Print digits and dashed form of a phone number as JSON
    Normalize {
        #[arg(value_name = "NUMBER")]
        number: String,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Handle => {
            if let Err(e) = handle::run() {
                tracing::error!(error = %e, "callerid-hook handle failed");
                std::process::exit(1);
            }
        }
        Commands::Normalize { number } => {
            let normalized = callerid_core::normalize(&number);
            let output = serde_json::json!({
                "digits": normalized.digits,
                "dashed": normalized.dashed,
                "candidates": normalized.candidates(&number),
            });
            println!("{}", output);
        }
    }
}
