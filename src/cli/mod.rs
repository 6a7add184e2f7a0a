//! Command-line interface definition and dispatch for switchboard.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::chat::{self, Runtime, TurnOutcome};
use crate::config::Config;
use crate::conversation::ConversationState;
use crate::format;
use crate::output::{Renderer, StdoutRenderer};
use crate::provider::{self, ModelSelection};
use crate::router::AgentRouter;
use crate::tools::host::ToolHost;

/// Top-level CLI structure for switchboard.
#[derive(Parser)]
#[command(
    name = "switchboard",
    version,
    about = "A terminal host that lets a language model call backend tools"
)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Model selection and loop limits shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct TurnArgs {
    /// Provider to use (openai, anthropic, openrouter, ollama)
    #[arg(long)]
    pub provider: Option<String>,
    /// Model to use, optionally as provider/model (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,
    /// Maximum model rounds per turn (overrides config)
    #[arg(long)]
    pub max_rounds: Option<usize>,
}

/// Available subcommands for the switchboard CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        turn: TurnArgs,
        /// Append every committed conversation entry to this JSONL file
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Ask a one-shot question
    Ask {
        /// The question to ask
        prompt: Vec<String>,
        #[command(flatten)]
        turn: TurnArgs,
    },
    /// Open the configured tool providers and list their tools
    Tools,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the config path and the resolved config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat { turn, transcript } => {
            let (config, selection) = load_for_turn(&turn)?;
            chat::run_chat(config, &selection, transcript).await
        }
        Commands::Ask { prompt, turn } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: switchboard ask \"your question here\"");
            }
            let (config, selection) = load_for_turn(&turn)?;
            ask(&config, &selection, &prompt).await
        }
        Commands::Tools => list_tools().await,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = Config::load()?;
                let path = Config::config_path()?;
                println!("{} {}", "Config path:".bold(), path.display());
                println!();
                println!("{}", config.to_display_toml()?);
                Ok(())
            }
        },
    }
}

/// Loads config, applies CLI overrides, and resolves the model.
fn load_for_turn(turn: &TurnArgs) -> Result<(Config, ModelSelection)> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, turn);
    let selection =
        provider::resolve_model(turn.provider.as_deref(), turn.model.as_deref(), &config)?;
    Ok((config, selection))
}

fn apply_overrides(config: &mut Config, turn: &TurnArgs) {
    if let Some(max_rounds) = turn.max_rounds {
        config.negotiation.max_rounds = Some(max_rounds);
    }
}

async fn ask(config: &Config, selection: &ModelSelection, prompt: &str) -> Result<()> {
    println!(
        "{} [model: {}/{}]",
        "switchboard".bold().cyan(),
        selection.provider.to_string().yellow(),
        selection.model.yellow(),
    );
    println!();
    println!("{} {}", ">".green().bold(), prompt);
    println!();

    let mut renderer = StdoutRenderer::new();
    let runtime = Runtime::start(config, selection, &mut renderer).await?;
    let mut state = ConversationState::new();
    let outcome = runtime.turn(&mut state, prompt, &mut renderer).await;
    runtime.shutdown().await;

    match outcome {
        TurnOutcome::Answered(_) => {
            renderer.render_done();
            Ok(())
        }
        TurnOutcome::Failed(e) => Err(e.into()),
        TurnOutcome::Cancelled => anyhow::bail!("cancelled"),
    }
}

async fn list_tools() -> Result<()> {
    let config = Config::load()?;
    let host = ToolHost::open(
        &config.servers,
        Duration::from_secs(config.negotiation.tool_timeout_secs()),
    )
    .await;
    let mut renderer = StdoutRenderer::new();
    for failure in host.failures() {
        renderer.warn(&format!("{}: {}", failure.server, failure.reason));
    }

    let router = AgentRouter::from_config(&config.router);
    let route = router.route(host.registry());
    println!(
        "{} {} tools registered, {} advertised ({})",
        "switchboard".bold().cyan(),
        host.registry().len(),
        route.tools.len(),
        router.policy().name(),
    );
    for tool in host.registry().list() {
        let line = format::format_tool(&tool, host.registry().provider_of(&tool.name));
        if route.advertises(&tool.name) {
            println!("{line}");
        } else {
            println!("{} {}", line, "(not advertised)".dimmed());
        }
    }

    host.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_flags() {
        let cli = Cli::try_parse_from([
            "switchboard",
            "-v",
            "chat",
            "--provider",
            "ollama",
            "--model",
            "qwen2.5",
            "--max-rounds",
            "4",
            "--transcript",
            "/tmp/t.jsonl",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Chat { turn, transcript } => {
                assert_eq!(turn.provider.as_deref(), Some("ollama"));
                assert_eq!(turn.model.as_deref(), Some("qwen2.5"));
                assert_eq!(turn.max_rounds, Some(4));
                assert_eq!(transcript, Some(PathBuf::from("/tmp/t.jsonl")));
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_parse_ask_joins_words() {
        let cli = Cli::try_parse_from(["switchboard", "ask", "list", "all", "clients"]).unwrap();
        match cli.command {
            Commands::Ask { prompt, turn } => {
                assert_eq!(prompt.join(" "), "list all clients");
                assert!(turn.max_rounds.is_none());
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_max_rounds_override() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &TurnArgs {
                max_rounds: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(config.negotiation.max_rounds(), 2);

        let mut untouched = Config::default();
        apply_overrides(&mut untouched, &TurnArgs::default());
        assert!(untouched.negotiation.max_rounds.is_none());
    }
}
