//! Configuration types and path resolution for switchboard.
//!
//! Switchboard stores its settings as TOML at the platform's XDG config path
//! (e.g. `~/.config/switchboard/config.toml` on Linux). A `switchboard.toml`
//! found between the working directory and the git root is merged on top.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::{
    Config, NegotiationConfig, ProviderConfig, ProviderEntry, RestToolConfig, RoutePolicyKind,
    RouterConfig, ServerConfig, SpecialistConfig,
};

use anyhow::Result;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        Ok(config)
    }

    /// Serializes the resolved config back to TOML, with API keys masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        for entry in [
            &mut shown.provider.openai,
            &mut shown.provider.anthropic,
            &mut shown.provider.ollama,
            &mut shown.provider.openrouter,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(key) = entry.api_key.as_mut().filter(|k| !k.is_empty()) {
                *key = "********".to_string();
            }
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_masks_api_keys() {
        let config = Config {
            provider: ProviderConfig {
                openai: Some(ProviderEntry {
                    api_key: Some("sk-secret".into()),
                    base_url: None,
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let shown = config.to_display_toml().unwrap();
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("********"));
    }
}
