// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifedesk - chat engine router with quota-aware fallback.
//!
//! This is the binary entry point.

mod check;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lifedesk_config::LifedeskConfig;

/// Lifedesk - chat engine router with quota-aware fallback.
#[derive(Parser, Debug)]
#[command(name = "lifedesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive chat session.
    Shell {
        /// Conversation thread whose mode is restored and persisted.
        #[arg(long)]
        thread: Option<String>,
    },
    /// Validate configuration and report engine and usage backend health.
    Check,
}

fn load_config(path: Option<&std::path::Path>) -> LifedeskConfig {
    let result = match path {
        Some(path) => lifedesk_config::load_and_validate_path(path),
        None => lifedesk_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            lifedesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.app.log_level);

    let result = match cli.command {
        Some(Commands::Shell { thread }) => shell::run_shell(config, thread).await,
        Some(Commands::Check) => check::run_check(&config).await,
        None => {
            println!("lifedesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lifedesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
