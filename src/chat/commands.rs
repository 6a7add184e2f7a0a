//! Input classification and slash command handlers for the chat REPL.
//!
//! Reserved words `quit` and `reset` are matched case-insensitively. Slash
//! commands `/history`, `/tools`, and `/help` are read-only and never reach
//! the model.

use colored::Colorize;

use crate::conversation::{ConversationEntry, Role};
use crate::format;
use crate::router::ActiveRoute;
use crate::session::Session;
use crate::tools::ToolRegistry;

/// What a line of REPL input means.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Input<'a> {
    Empty,
    Quit,
    Reset,
    Command(&'a str),
    Message(&'a str),
}

pub(crate) fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Empty
    } else if line.eq_ignore_ascii_case("quit") {
        Input::Quit
    } else if line.eq_ignore_ascii_case("reset") {
        Input::Reset
    } else if line.starts_with('/') {
        Input::Command(line)
    } else {
        Input::Message(line)
    }
}

/// Action returned by slash command handling.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    /// Command was handled; continue the REPL loop.
    Continue,
    /// Unknown command was entered.
    Unknown(String),
}

pub(crate) fn handle_slash_command(
    command: &str,
    session: &Session,
    route: &ActiveRoute,
    registry: &ToolRegistry,
) -> CommandAction {
    match command {
        "/history" => {
            let shown: Vec<&ConversationEntry> = session
                .state()
                .history()
                .iter()
                .filter(|e| e.role() != Some(Role::Developer))
                .collect();
            if shown.is_empty() {
                println!("{}", "No messages yet.".dimmed());
            }
            for entry in shown {
                println!("{}", format::format_entry(entry));
            }
            CommandAction::Continue
        }
        "/tools" => {
            if route.tools.is_empty() {
                println!("{}", "No tools available.".dimmed());
            }
            for tool in &route.tools {
                println!(
                    "{}",
                    format::format_tool(tool, registry.provider_of(&tool.name))
                );
            }
            CommandAction::Continue
        }
        "/help" => {
            println!("{}", "Commands:".bold());
            println!("  {} - show conversation history", "/history".cyan());
            println!("  {} - list the tools the model can call", "/tools".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - start a fresh conversation", "reset".cyan());
            println!("  {} - exit", "quit / Ctrl+D".cyan());
            println!("  {} - cancel a running turn", "Ctrl+C".cyan());
            CommandAction::Continue
        }
        _ => CommandAction::Unknown(command.to_string()),
    }
}
