//! Environment variable substitution, API key resolution, and defaulted
//! accessors.

use super::types::{Config, NegotiationConfig, ProviderEntry, ServerConfig};
use crate::constants::{
    DEFAULT_INSTRUCTIONS, MAX_ROUNDS_DEFAULT, PARALLEL_TOOL_CALLS_DEFAULT,
    REQUEST_TIMEOUT_SECS_DEFAULT, TOOL_TIMEOUT_SECS_DEFAULT,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        for field in [
            &mut self.model,
            &mut self.default_provider,
            &mut self.instructions,
            &mut self.router.instructions,
            &mut self.router.policy_text,
        ]
        .into_iter()
        .flatten()
        {
            *field = resolve_str(field);
        }
        resolve_provider_entry(&mut self.provider.openai);
        resolve_provider_entry(&mut self.provider.anthropic);
        resolve_provider_entry(&mut self.provider.ollama);
        resolve_provider_entry(&mut self.provider.openrouter);

        for server in self.servers.values_mut() {
            match server {
                ServerConfig::Stdio { command, args, env } => {
                    *command = resolve_str(command);
                    args.iter_mut().for_each(|a| *a = resolve_str(a));
                    env.values_mut().for_each(|v| *v = resolve_str(v));
                }
                ServerConfig::Rest { base_url, .. } => *base_url = resolve_str(base_url),
            }
        }
    }

    /// Resolve API key for a provider: env var first, then config value.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // OPENAI_API_KEY, ANTHROPIC_API_KEY, etc.
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }

        self.provider_entry(provider)
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Configured base URL override for a provider.
    pub fn base_url(&self, provider: &str) -> Option<&str> {
        self.provider_entry(provider)
            .and_then(|e| e.base_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    fn provider_entry(&self, provider: &str) -> Option<&ProviderEntry> {
        match provider {
            "openai" => self.provider.openai.as_ref(),
            "anthropic" => self.provider.anthropic.as_ref(),
            "ollama" => self.provider.ollama.as_ref(),
            "openrouter" => self.provider.openrouter.as_ref(),
            _ => None,
        }
    }

    /// The developer instruction placed at the start of each conversation.
    pub fn instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS)
    }
}

impl NegotiationConfig {
    pub fn max_rounds(&self) -> usize {
        self.max_rounds.unwrap_or(MAX_ROUNDS_DEFAULT).max(1)
    }

    pub fn parallel_tool_calls(&self) -> bool {
        self.parallel_tool_calls.unwrap_or(PARALLEL_TOOL_CALLS_DEFAULT)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(REQUEST_TIMEOUT_SECS_DEFAULT)
    }

    pub fn tool_timeout_secs(&self) -> u64 {
        self.tool_timeout_secs.unwrap_or(TOOL_TIMEOUT_SECS_DEFAULT)
    }
}

/// Resolves `{env:VAR}` patterns in a single provider entry's `api_key` and `base_url`.
fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
    if let Some(ref mut e) = entry {
        if let Some(ref mut key) = e.api_key {
            *key = resolve_str(key);
        }
        if let Some(ref mut url) = e.base_url {
            *url = resolve_str(url);
        }
    }
}

/// Replace {env:VAR} with the environment variable value.
fn resolve_str(s: &str) -> String {
    resolve_with(s, |name| std::env::var(name).ok())
}

fn resolve_with(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{env:") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 5..start + end];
        result.push_str(&lookup(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}
