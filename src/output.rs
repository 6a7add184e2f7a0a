//! Output rendering abstraction for switchboard.
//!
//! Defines the [`Renderer`] trait that decouples the negotiation loop from
//! the display layer. [`StdoutRenderer`] prints to the terminal; tests use
//! a recording renderer instead.

use colored::Colorize;
use serde_json::Value;
use std::io::{self, Write};

use crate::format::{preview, render_markdown_lite};

/// Receives everything a turn produces, in the order it happens.
pub trait Renderer: Send {
    /// A text fragment from the model.
    fn render_text(&mut self, text: &str);

    /// The loop is about to invoke a tool.
    fn tool_start(&mut self, name: &str, args: &Value);

    /// A tool finished; `output` is what the model will see.
    fn tool_result(&mut self, name: &str, output: &Value, is_error: bool);

    /// Called when the turn completes.
    fn render_done(&mut self);

    /// Called when a turn fails.
    fn render_error(&mut self, err: &str);

    /// A non-fatal notice, e.g. a tool provider that failed to start.
    fn warn(&mut self, message: &str);
}

/// Renders turn output directly to stdout. Errors and warnings go to stderr.
#[derive(Default)]
pub struct StdoutRenderer {
    tool_calls: usize,
}

impl StdoutRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for StdoutRenderer {
    fn render_text(&mut self, text: &str) {
        println!("{}", render_markdown_lite(text));
        io::stdout().flush().ok();
    }

    fn tool_start(&mut self, name: &str, args: &Value) {
        self.tool_calls += 1;
        println!(
            "  {} {} {}",
            "→".yellow(),
            name.yellow().bold(),
            preview(&args.to_string()).dimmed()
        );
    }

    fn tool_result(&mut self, name: &str, output: &Value, is_error: bool) {
        let marker = if is_error { "✗".red() } else { "←".green() };
        println!(
            "  {} {} {}",
            marker,
            name.dimmed(),
            preview(&output.to_string()).dimmed()
        );
    }

    fn render_done(&mut self) {
        if self.tool_calls > 0 {
            println!("{}", format!("[{} tool calls]", self.tool_calls).dimmed());
        }
        println!();
        self.tool_calls = 0;
    }

    fn render_error(&mut self, err: &str) {
        eprintln!("{} {}", "error:".red().bold(), err);
        self.tool_calls = 0;
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// One captured renderer call.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum RenderEvent {
        Text(String),
        ToolStart(String),
        ToolResult { name: String, is_error: bool },
        Done,
        Error(String),
        Warn(String),
    }

    #[derive(Default)]
    pub(crate) struct RecordingRenderer {
        pub(crate) events: Vec<RenderEvent>,
    }

    impl Renderer for RecordingRenderer {
        fn render_text(&mut self, text: &str) {
            self.events.push(RenderEvent::Text(text.to_string()));
        }

        fn tool_start(&mut self, name: &str, _args: &Value) {
            self.events.push(RenderEvent::ToolStart(name.to_string()));
        }

        fn tool_result(&mut self, name: &str, _output: &Value, is_error: bool) {
            self.events.push(RenderEvent::ToolResult {
                name: name.to_string(),
                is_error,
            });
        }

        fn render_done(&mut self) {
            self.events.push(RenderEvent::Done);
        }

        fn render_error(&mut self, err: &str) {
            self.events.push(RenderEvent::Error(err.to_string()));
        }

        fn warn(&mut self, message: &str) {
            self.events.push(RenderEvent::Warn(message.to_string()));
        }
    }
}
