//! Struct definitions and serde defaults for switchboard configuration.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration for switchboard, deserialized from `config.toml`.
///
/// Every field is optional so switchboard can start with no config file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Default model identifier (e.g. `"gpt-4.1"` or `"anthropic/claude-sonnet-4-6"`).
    #[serde(default)]
    pub model: Option<String>,
    /// Default provider name (e.g., "anthropic", "openai").
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Developer instruction placed once at the start of every conversation.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Limits for the tool-call negotiation loop.
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    /// Tool providers, keyed by server name.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
    /// Agent routing policy.
    #[serde(default)]
    pub router: RouterConfig,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub openai: Option<ProviderEntry>,
    pub anthropic: Option<ProviderEntry>,
    pub ollama: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL for the provider's API (proxies, self-hosted instances).
    pub base_url: Option<String>,
}

/// `[negotiation]` table. Unset values fall back to the constants.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NegotiationConfig {
    pub max_rounds: Option<usize>,
    pub parallel_tool_calls: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub tool_timeout_secs: Option<u64>,
}

/// One `[servers.<name>]` entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ServerConfig {
    /// Child process speaking JSON-RPC over stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// HTTP backend described by explicit endpoint bindings.
    Rest {
        base_url: String,
        #[serde(default)]
        tools: Vec<RestToolConfig>,
    },
}

/// A single `[[servers.<name>.tools]]` binding of a tool name to an endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RestToolConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Path template, e.g. `/clients/{client_id}`.
    pub path: String,
    /// JSON schema for the arguments. Derived from the path when absent.
    #[serde(default)]
    pub parameters: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// `[router]` table.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RouterConfig {
    #[serde(default)]
    pub policy: RoutePolicyKind,
    /// Instructions for the single agent, or the orchestrator's own text.
    pub instructions: Option<String>,
    /// Authorization rules expressed as text for the model.
    pub policy_text: Option<String>,
    #[serde(default)]
    pub specialists: Vec<SpecialistConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutePolicyKind {
    #[default]
    Single,
    Orchestrator,
}

/// A `[[router.specialists]]` entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpecialistConfig {
    pub name: String,
    #[serde(default)]
    pub handoff_description: String,
    #[serde(default)]
    pub instructions: String,
    /// Server names whose tools this specialist may use.
    #[serde(default)]
    pub servers: Vec<String>,
}
