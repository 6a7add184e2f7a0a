//! Model resolution logic.
//!
//! Resolves which provider and model to use based on CLI flags, config file,
//! and hardcoded defaults. Supports `provider/model` shorthand syntax.

use anyhow::Result;

use super::kind::{default_model_for, ProviderKind};
use crate::config::Config;
use crate::constants::DEFAULT_PROVIDER;

/// Resolved provider + model pair.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Resolve which provider and model to use.
/// Priority: CLI flags > config.toml > defaults.
///
/// Accepts these formats:
///   --model anthropic/claude-sonnet-4-6  (shorthand, only when --provider is omitted)
///   --provider openrouter --model "org/model-name"  (slash kept as part of the model)
///   --provider ollama  (uses the provider's default model)
///   (nothing)  (uses config.toml, then hardcoded default)
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<ModelSelection> {
    if cli_provider.is_none() {
        if let Some((prov, model)) = cli_model.and_then(|m| m.split_once('/')) {
            if let Ok(provider) = ProviderKind::parse(prov) {
                return Ok(ModelSelection {
                    provider,
                    model: model.to_string(),
                });
            }
        }
    }

    let provider_str = cli_provider
        .or(config.default_provider.as_deref())
        .unwrap_or(DEFAULT_PROVIDER);
    let provider = ProviderKind::parse(provider_str)?;

    let model = cli_model
        .map(String::from)
        .or_else(|| config.model.clone())
        .unwrap_or_else(|| default_model_for(&provider).to_string());

    Ok(ModelSelection { provider, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_configured() {
        let config = Config::default();
        let selection = resolve_model(None, None, &config).unwrap();
        assert_eq!(selection.provider, ProviderKind::OpenAI);
        assert_eq!(selection.model, crate::constants::DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_shorthand_model() {
        let config = Config::default();
        let selection = resolve_model(None, Some("anthropic/claude-x"), &config).unwrap();
        assert_eq!(selection.provider, ProviderKind::Anthropic);
        assert_eq!(selection.model, "claude-x");
    }

    #[test]
    fn test_slash_kept_with_explicit_provider() {
        let config = Config::default();
        let selection =
            resolve_model(Some("openrouter"), Some("meta/llama-3"), &config).unwrap();
        assert_eq!(selection.provider, ProviderKind::OpenRouter);
        assert_eq!(selection.model, "meta/llama-3");
    }

    #[test]
    fn test_config_values_used() {
        let config = Config {
            default_provider: Some("ollama".into()),
            model: Some("qwen2.5".into()),
            ..Config::default()
        };
        let selection = resolve_model(None, None, &config).unwrap();
        assert_eq!(selection.provider, ProviderKind::Ollama);
        assert_eq!(selection.model, "qwen2.5");
    }

    #[test]
    fn test_provider_only_uses_its_default_model() {
        let config = Config::default();
        let selection = resolve_model(Some("anthropic"), None, &config).unwrap();
        assert_eq!(selection.model, crate::constants::DEFAULT_ANTHROPIC_MODEL);
    }
}
