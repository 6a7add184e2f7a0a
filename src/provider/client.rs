//! rig-core implementation of [`ModelGateway`].
//!
//! Contains [`RigGateway`], which wraps rig-core provider clients behind enum
//! dispatch. Each round is a single non-streaming completion request: the
//! loop in [`crate::negotiation`] decides what happens with tool calls, so
//! rig's own multi-turn driver is not used.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Message as RigMessage, ToolDefinition};
use rig::message::{AssistantContent, ToolResultContent, UserContent};
use rig::providers::{anthropic, openai, openrouter};
use rig::OneOrMany;
use tracing::debug;

use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use crate::config::Config;
use crate::conversation::{ConversationEntry, Role};
use crate::gateway::{GatewayError, ModelGateway, ModelOutput, ModelRequest};
use crate::tools::ToolDescriptor;

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    OpenAI(openai::CompletionsClient),
    Anthropic(anthropic::Client),
    OpenRouter(openrouter::Client),
    Ollama(openai::CompletionsClient),
}

/// A configured LLM provider ready to answer negotiation rounds.
///
/// Completion models are built per call since they are cheap to create.
pub struct RigGateway {
    client: ClientKind,
    model: String,
    timeout: Duration,
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::OpenAI($client) => $body,
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Ollama($client) => $body,
        }
    };
}

impl RigGateway {
    /// Creates a gateway from the loaded config and resolved model.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for the selected provider
    /// or if client construction fails.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Result<Self> {
        let provider = selection.provider;
        let missing_key = || {
            format!(
                "No API key found for {provider}. Set {}_API_KEY or configure it in config.toml",
                provider.name().to_uppercase()
            )
        };
        let client = match provider {
            ProviderKind::OpenAI => {
                let api_key = config
                    .resolve_api_key(provider.name())
                    .with_context(missing_key)?;
                let client = match config.base_url(provider.name()) {
                    Some(url) => openai::CompletionsClient::builder()
                        .api_key(&api_key)
                        .base_url(url)
                        .build(),
                    None => openai::CompletionsClient::new(&api_key),
                };
                ClientKind::OpenAI(client.context("Failed to create OpenAI client")?)
            }
            ProviderKind::Anthropic => {
                let api_key = config
                    .resolve_api_key(provider.name())
                    .with_context(missing_key)?;
                let client = anthropic::Client::new(&api_key)
                    .context("Failed to create Anthropic client")?;
                ClientKind::Anthropic(client)
            }
            ProviderKind::OpenRouter => {
                let api_key = config
                    .resolve_api_key(provider.name())
                    .with_context(missing_key)?;
                let client = openrouter::Client::new(&api_key)
                    .context("Failed to create OpenRouter client")?;
                ClientKind::OpenRouter(client)
            }
            ProviderKind::Ollama => {
                let base_url = config
                    .base_url(provider.name())
                    .unwrap_or(crate::constants::OLLAMA_DEFAULT_BASE_URL);
                let client = openai::CompletionsClient::builder()
                    .api_key("ollama")
                    .base_url(format!("{}/v1", base_url.trim_end_matches('/')))
                    .build()
                    .context("Failed to create Ollama client")?;
                ClientKind::Ollama(client)
            }
        };

        Ok(Self {
            client,
            model: selection.model.clone(),
            timeout: Duration::from_secs(config.negotiation.request_timeout_secs()),
        })
    }
}

#[async_trait]
impl ModelGateway for RigGateway {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<Vec<ModelOutput>, GatewayError> {
        let preamble = build_preamble(request.instructions, request.entries);
        let mut messages = to_rig_messages(request.entries);
        let prompt = messages
            .pop()
            .ok_or_else(|| GatewayError::InvalidResponse("empty conversation".into()))?;
        let tools: Vec<ToolDefinition> = request.tools.iter().map(to_rig_tool).collect();
        debug!(
            model = %self.model,
            history = messages.len(),
            tools = tools.len(),
            "sending completion request"
        );

        let call = async {
            dispatch!(self, |client| {
                complete(
                    client.completion_model(&self.model),
                    preamble,
                    prompt,
                    messages,
                    tools,
                )
                .await
            })
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout.as_secs()))?
    }
}

/// Runs one completion and flattens the reply into ordered output items.
async fn complete<M: CompletionModel>(
    model: M,
    preamble: String,
    prompt: RigMessage,
    history: Vec<RigMessage>,
    tools: Vec<ToolDefinition>,
) -> Result<Vec<ModelOutput>, GatewayError> {
    let mut builder = model
        .completion_request(prompt)
        .messages(history)
        .tools(tools)
        .max_tokens(crate::constants::MAX_TOKENS);
    if !preamble.is_empty() {
        builder = builder.preamble(preamble);
    }

    let response = model
        .completion(builder.build())
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let outputs = response
        .choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(t) if !t.text.is_empty() => Some(ModelOutput::text(&t.text)),
            AssistantContent::ToolCall(tc) => Some(ModelOutput::function_call(
                &tc.id,
                &tc.function.name,
                tc.function.arguments.clone(),
            )),
            // Reasoning, images, empty text
            _ => None,
        })
        .collect();
    Ok(outputs)
}

/// Route instructions first, then every developer message in order.
fn build_preamble(instructions: &str, entries: &[ConversationEntry]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !instructions.trim().is_empty() {
        parts.push(instructions);
    }
    for entry in entries {
        if let ConversationEntry::Message {
            role: Role::Developer,
            content,
        } = entry
        {
            parts.push(content);
        }
    }
    parts.join("\n\n")
}

fn to_rig_tool(tool: &ToolDescriptor) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameter_schema.clone(),
    }
}

/// Converts the conversation into rig messages.
///
/// Developer messages are skipped (they go into the preamble). Consecutive
/// assistant text and function calls collapse into one assistant message;
/// consecutive function results collapse into one user message.
fn to_rig_messages(entries: &[ConversationEntry]) -> Vec<RigMessage> {
    let mut out = Vec::new();
    let mut assistant: Vec<AssistantContent> = Vec::new();
    let mut results: Vec<UserContent> = Vec::new();

    for entry in entries {
        match entry {
            ConversationEntry::Message { role, content } => match role {
                Role::Developer => {}
                Role::User => {
                    flush_assistant(&mut out, &mut assistant);
                    flush_results(&mut out, &mut results);
                    out.push(RigMessage::user(content.clone()));
                }
                Role::Assistant => {
                    flush_results(&mut out, &mut results);
                    assistant.push(AssistantContent::text(content.clone()));
                }
            },
            ConversationEntry::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                flush_results(&mut out, &mut results);
                assistant.push(AssistantContent::tool_call(
                    call_id,
                    name,
                    arguments.clone(),
                ));
            }
            ConversationEntry::FunctionResult { call_id, output } => {
                flush_assistant(&mut out, &mut assistant);
                results.push(UserContent::tool_result(
                    call_id,
                    OneOrMany::one(ToolResultContent::text(output.to_string())),
                ));
            }
        }
    }
    flush_assistant(&mut out, &mut assistant);
    flush_results(&mut out, &mut results);
    out
}

fn flush_assistant(out: &mut Vec<RigMessage>, pending: &mut Vec<AssistantContent>) {
    if let Ok(content) = OneOrMany::many(std::mem::take(pending)) {
        out.push(RigMessage::Assistant { id: None, content });
    }
}

fn flush_results(out: &mut Vec<RigMessage>, pending: &mut Vec<UserContent>) {
    if let Ok(content) = OneOrMany::many(std::mem::take(pending)) {
        out.push(RigMessage::User { content });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario() -> Vec<ConversationEntry> {
        vec![
            ConversationEntry::developer("Confirm identity before changes."),
            ConversationEntry::user("list all clients"),
            ConversationEntry::function_call("c1", "list_clients", json!({})),
            ConversationEntry::function_result("c1", json!([{"id": "1", "client_name": "Acme"}])),
            ConversationEntry::assistant("There is one client: Acme."),
        ]
    }

    #[test]
    fn test_preamble_joins_instructions_and_developer_text() {
        let preamble = build_preamble("Route requests.", &scenario());
        assert_eq!(preamble, "Route requests.\n\nConfirm identity before changes.");
        assert_eq!(build_preamble("", &[]), "");
    }

    #[test]
    fn test_messages_skip_developer_and_group_turns() {
        let messages = to_rig_messages(&scenario());
        // user, assistant(tool call), user(tool result), assistant(text)
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], RigMessage::User { .. }));
        assert!(matches!(messages[1], RigMessage::Assistant { .. }));
        assert!(matches!(messages[2], RigMessage::User { .. }));
        assert!(matches!(messages[3], RigMessage::Assistant { .. }));
    }

    #[test]
    fn test_text_and_calls_in_one_round_share_a_message() {
        let entries = vec![
            ConversationEntry::user("create then list"),
            ConversationEntry::assistant("Working on it."),
            ConversationEntry::function_call("a", "create_client", json!({"client_name": "B"})),
            ConversationEntry::function_call("b", "list_clients", json!({})),
            ConversationEntry::function_result("a", json!({"id": "2"})),
            ConversationEntry::function_result("b", json!([])),
        ];
        let messages = to_rig_messages(&entries);
        assert_eq!(messages.len(), 3);
        match &messages[1] {
            RigMessage::Assistant { content, .. } => assert_eq!(content.len(), 3),
            other => panic!("expected assistant message, got {other:?}"),
        }
        match &messages[2] {
            RigMessage::User { content } => assert_eq!(content.len(), 2),
            other => panic!("expected user message, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_definition_mapping() {
        let tool = ToolDescriptor::new("get_user", "Fetch a user", json!({"type": "object"}));
        let def = to_rig_tool(&tool);
        assert_eq!(def.name, "get_user");
        assert_eq!(def.parameters["type"], "object");
    }
}
