//! File loading and merging for switchboard configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{Config, NegotiationConfig, RouterConfig};

/// Written to `config.toml` the first time switchboard runs.
const DEFAULT_TOML: &str = r#"# default_provider = "openai"
# model = "gpt-4.1"
# instructions = "Confirm the user's identity before any change to stored records."

[provider.openai]
api_key = "{env:OPENAI_API_KEY}"

[provider.anthropic]
api_key = "{env:ANTHROPIC_API_KEY}"

[provider.openrouter]
api_key = "{env:OPENROUTER_API_KEY}"

[provider.ollama]
base_url = "http://localhost:11434"

[negotiation]
# max_rounds = 16
# parallel_tool_calls = false
# request_timeout_secs = 30
# tool_timeout_secs = 30

# [servers.clients]
# kind = "stdio"
# command = "python"
# args = ["clients_server.py"]

# [servers.products]
# kind = "rest"
# base_url = "http://localhost:8000"
#
# [[servers.products.tools]]
# name = "get_product"
# description = "Fetch one product by id"
# method = "GET"
# path = "/products/{product_id}"
"#;

impl Config {
    /// Loads the global config from `~/.config/switchboard/config.toml`.
    ///
    /// If no config file exists, creates one with commented defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, DEFAULT_TOML)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            return Self::parse(DEFAULT_TOML).context("Failed to parse default config");
        }
        Self::from_file(&path)
    }

    /// Look for switchboard.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                return Self::from_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub(super) fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    pub(super) fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge project config over global config.
    ///
    /// Scalars from the project win when present. Servers are unioned with
    /// project entries replacing global ones of the same name. A project
    /// router with a policy, instructions, or specialists replaces the global
    /// router wholesale.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut provider = global.provider;
        macro_rules! overlay {
            ($field:ident) => {
                if project.provider.$field.is_some() {
                    provider.$field = project.provider.$field;
                }
            };
        }
        overlay!(openai);
        overlay!(anthropic);
        overlay!(ollama);
        overlay!(openrouter);

        let mut servers = global.servers;
        servers.extend(project.servers);

        let router = if project_router_is_set(&project.router) {
            project.router
        } else {
            global.router
        };

        Config {
            model: project.model.or(global.model),
            default_provider: project.default_provider.or(global.default_provider),
            provider,
            instructions: project.instructions.or(global.instructions),
            negotiation: NegotiationConfig {
                max_rounds: project.negotiation.max_rounds.or(global.negotiation.max_rounds),
                parallel_tool_calls: project
                    .negotiation
                    .parallel_tool_calls
                    .or(global.negotiation.parallel_tool_calls),
                request_timeout_secs: project
                    .negotiation
                    .request_timeout_secs
                    .or(global.negotiation.request_timeout_secs),
                tool_timeout_secs: project
                    .negotiation
                    .tool_timeout_secs
                    .or(global.negotiation.tool_timeout_secs),
            },
            servers,
            router,
        }
    }
}

fn project_router_is_set(router: &RouterConfig) -> bool {
    router.policy != Default::default()
        || router.instructions.is_some()
        || router.policy_text.is_some()
        || !router.specialists.is_empty()
}
