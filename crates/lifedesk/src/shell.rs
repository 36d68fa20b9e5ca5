// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lifedesk shell` command implementation.
//!
//! Interactive REPL with a colored prompt showing the active mode. Plain
//! lines are sent as chat messages; lines starting with `:` control the mode.

use std::sync::Arc;

use colored::Colorize;
use lifedesk_config::LifedeskConfig;
use lifedesk_core::{LifedeskError, Mode, Notification, Notifier, Severity, ThreadId};
use lifedesk_engines::HttpEngine;
use lifedesk_router::{ChatSession, ModeController, RouterState};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

/// A parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Empty,
    Quit,
    Status,
    /// Select a mode; selecting the active non-default mode again turns it off.
    Select(Mode),
    Message(String),
    Unknown(String),
}

/// Parses one line of input.
pub fn parse_input(line: &str) -> ShellInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellInput::Empty;
    }
    let Some(command) = trimmed.strip_prefix(':') else {
        return ShellInput::Message(trimmed.to_string());
    };
    match command {
        "quit" | "exit" | "q" => ShellInput::Quit,
        "status" => ShellInput::Status,
        "general" => ShellInput::Select(Mode::General),
        "search" => ShellInput::Select(Mode::Search),
        "secondary" => ShellInput::Select(Mode::Secondary),
        other => ShellInput::Unknown(other.to_string()),
    }
}

/// Renders the state for the `:status` command.
pub fn format_status(state: &RouterState) -> String {
    let mut lines = vec![format!("mode: {}", state.active_mode.label())];
    for (engine, quota) in state.quotas.iter() {
        let availability = if !*state.allowed.get(engine) {
            "disabled"
        } else if quota.is_available() {
            "available"
        } else {
            "exhausted"
        };
        lines.push(format!(
            "{}: {quota} used ({availability})",
            engine.label()
        ));
    }
    if let Some(err) = &state.last_error {
        lines.push(format!("last notice: {err}"));
    }
    lines.join("\n")
}

/// Prints notifications to stderr, colored by severity.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let message = match notification.severity {
            Severity::Warning => notification.message.yellow(),
            Severity::Error => notification.message.red(),
        };
        eprintln!("{message}");
    }
}

/// Runs the `lifedesk shell` interactive REPL.
pub async fn run_shell(config: LifedeskConfig, thread: Option<String>) -> Result<(), LifedeskError> {
    let engine = Arc::new(HttpEngine::from_config(&config.engines)?);
    let usage = lifedesk_engines::usage_service_from_config(&config)?;

    let mut controller = ModeController::from_config(&config, usage, Arc::new(TerminalNotifier));
    if let Some(thread) = thread {
        controller = controller.with_thread(ThreadId(thread));
    }
    let controller = Arc::new(controller);
    controller.initialize().await;
    info!(mode = %controller.active_mode().await, "shell session started");

    let mut session = ChatSession::new(controller.clone(), engine);

    let mut rl = DefaultEditor::new()
        .map_err(|e| LifedeskError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.app.name).bold().green());
    println!(
        "Type {} to switch engines, {} for quotas, {} to exit.\n",
        ":search / :secondary / :general".yellow(),
        ":status".yellow(),
        ":quit".yellow()
    );

    loop {
        let mode = controller.active_mode().await;
        let prompt = format!("{}> ", format!("{}:{mode}", config.app.name).green());
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = parse_input(&line);
                if input != ShellInput::Empty {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match input {
                    ShellInput::Empty => {}
                    ShellInput::Quit => break,
                    ShellInput::Status => println!("{}", format_status(&controller.state().await)),
                    ShellInput::Select(mode) => {
                        let active = controller.toggle_mode(mode).await;
                        let state = controller.state().await;
                        match (&state.last_error, active == mode || mode.is_default()) {
                            (Some(err), false) => eprintln!("{}", err.yellow()),
                            _ => println!("{}", format!("using {}", active.label()).dimmed()),
                        }
                    }
                    ShellInput::Message(text) => match session.send(&text).await {
                        Ok(reply) => {
                            println!("{}", reply.content);
                            println!("{}", format!("-- {}", reply.source).dimmed());
                        }
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                    ShellInput::Unknown(cmd) => {
                        eprintln!("{}: unknown command :{cmd}", "error".red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use lifedesk_core::{PermissionSet, Quota, QuotaSet};

    use super::*;

    #[test]
    fn parses_commands_and_messages() {
        assert_eq!(parse_input("   "), ShellInput::Empty);
        assert_eq!(parse_input(":quit"), ShellInput::Quit);
        assert_eq!(parse_input(":search"), ShellInput::Select(Mode::Search));
        assert_eq!(parse_input(" :general "), ShellInput::Select(Mode::General));
        assert_eq!(parse_input(":status"), ShellInput::Status);
        assert_eq!(
            parse_input("what is new?"),
            ShellInput::Message("what is new?".into())
        );
        assert_eq!(parse_input(":nope"), ShellInput::Unknown("nope".into()));
    }

    #[test]
    fn status_shows_quota_and_availability() {
        let mut state = RouterState::new(
            PermissionSet {
                search: true,
                secondary: false,
            },
            QuotaSet {
                search: Quota::new(3, 3),
                secondary: Quota::new(0, 5),
            },
        );
        state.last_error = Some("Web search limit reached".into());
        let status = format_status(&state);
        assert!(status.contains("mode: General assistant"));
        assert!(status.contains("Web search: 3/3 used (exhausted)"));
        assert!(status.contains("Secondary model: 0/5 used (disabled)"));
        assert!(status.contains("last notice: Web search limit reached"));
    }
}
