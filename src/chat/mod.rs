//! Interactive chat REPL for switchboard.
//!
//! Reads one line per turn using [`rustyline`] (history, line editing). Any
//! line that is not a reserved word or slash command becomes a user message
//! for the negotiation loop. A failed turn is reported and the REPL moves on
//! to the next input.

mod commands;
mod runtime;

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::Config;
use crate::output::{Renderer, StdoutRenderer};
use crate::provider::ModelSelection;
use crate::session::Session;

use commands::{CommandAction, Input};
pub(crate) use runtime::{Runtime, TurnOutcome};

/// Runs the interactive chat REPL.
///
/// # Readline behavior
///
/// - **quit** / **Ctrl+D**: shuts down tool providers and exits
/// - **reset**: clears the conversation, keeps the providers
/// - **Ctrl+C**: clears the input line, or cancels a running turn
/// - Readline history is persisted to `~/.cache/switchboard/chat_history.txt`
pub async fn run_chat(
    config: Config,
    selection: &ModelSelection,
    transcript: Option<PathBuf>,
) -> Result<()> {
    let mut renderer = StdoutRenderer::new();
    let runtime = Runtime::start(&config, selection, &mut renderer).await?;
    let result = repl(&runtime, selection, transcript, &mut renderer).await;
    runtime.shutdown().await;
    result
}

async fn repl(
    runtime: &Runtime,
    selection: &ModelSelection,
    transcript: Option<PathBuf>,
    renderer: &mut StdoutRenderer,
) -> Result<()> {
    let mut session = Session::new(transcript)?;
    let short = &session.id[..8];
    println!(
        "{} [session: {}] [model: {}/{}] [tools: {}] (quit or Ctrl+D to exit)",
        "switchboard".bold().cyan(),
        short.yellow(),
        selection.provider.to_string().yellow(),
        selection.model.yellow(),
        runtime.route().tools.len().to_string().yellow(),
    );
    if let Some(path) = session.transcript_path() {
        println!("{} {}", "transcript:".dimmed(), path.display());
    }
    println!();

    // Set up readline with persistent history
    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        let line = match rl.readline(&format!("{} ", ">".green().bold())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Err(e) => {
                renderer.render_error(&e.to_string());
                break;
            }
        };

        match commands::classify(&line) {
            Input::Empty => continue,
            Input::Quit => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Input::Reset => {
                if let Err(e) = session.reset() {
                    renderer.warn(&format!("transcript: {e:#}"));
                }
                println!("{}", "Conversation cleared.".dimmed());
            }
            Input::Command(command) => {
                if let CommandAction::Unknown(cmd) = commands::handle_slash_command(
                    command,
                    &session,
                    runtime.route(),
                    runtime.host().registry(),
                ) {
                    println!("{} Unknown command: {} (try /help)", "?".yellow(), cmd);
                }
            }
            Input::Message(text) => {
                let _ = rl.add_history_entry(text);
                println!();
                let before = session.state().len();
                match runtime.turn(session.state_mut(), text, renderer).await {
                    TurnOutcome::Answered(_) => {
                        renderer.render_done();
                        if let Err(e) = session.record_since(before) {
                            renderer.warn(&format!("transcript: {e:#}"));
                        }
                    }
                    TurnOutcome::Failed(e) => renderer.render_error(&e.to_string()),
                    TurnOutcome::Cancelled => {
                        println!("{}", "turn cancelled.".dimmed());
                    }
                }
            }
        }
    }

    // Save readline history
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}
