//! Centralized constants for switchboard.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "switchboard";

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Default LLM model identifier for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default LLM model identifier for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";

/// Default LLM model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4.1-mini";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default LLM model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

/// Maximum tokens for LLM completions.
pub const MAX_TOKENS: u64 = 4096;

/// Developer instruction prepended once at the start of every conversation.
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are switchboard, an operations assistant with access to backend tools. \
Use the tools to answer questions about stored records. Never invent identifiers; \
look them up first. Be concise.";

/// Instructions for the orchestrator agent when no custom text is configured.
pub const DEFAULT_ORCHESTRATOR_INSTRUCTIONS: &str =
    "You are the orchestrator. Determine which specialist below is best suited to \
handle the user's request and act as that specialist, using only the tools listed \
for it. If a request spans several specialists, handle each part with the matching \
specialist's tools in turn.";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "switchboard.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

// --- Negotiation defaults ---

/// Maximum number of model rounds per user turn.
pub const MAX_ROUNDS_DEFAULT: usize = 16;

/// Default: tool calls of a round run one after another.
pub const PARALLEL_TOOL_CALLS_DEFAULT: bool = false;

/// Timeout for a single model gateway call, in seconds.
pub const REQUEST_TIMEOUT_SECS_DEFAULT: u64 = 30;

/// Timeout for a single tool invocation, in seconds.
pub const TOOL_TIMEOUT_SECS_DEFAULT: u64 = 30;

// --- Tool providers ---

/// MCP protocol revision sent during the stdio handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Environment variables passed through to stdio tool providers.
pub const STDIO_PASSTHROUGH_ENV: &[&str] = &["PATH", "HOME", "USER", "LANG", "TERM"];

/// Maximum characters of a tool result shown in the terminal.
pub const TOOL_RESULT_PREVIEW_CHARS: usize = 200;
