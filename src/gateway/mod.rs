//! Model gateway contract.
//!
//! A [`ModelGateway`] takes the full conversation plus the advertised tool
//! set and returns the model's next step as an ordered list of
//! [`ModelOutput`] items: text to show, or function calls to execute. It is
//! stateless; the negotiation loop owns all conversation state.

#[cfg(test)]
pub(crate) mod scripted;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::conversation::ConversationEntry;
use crate::tools::ToolDescriptor;

/// Everything the model sees for one round.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Active agent instructions chosen by the router.
    pub instructions: &'a str,
    pub entries: &'a [ConversationEntry],
    pub tools: &'a [ToolDescriptor],
}

/// One item of a model response, in the order the model produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelOutput {
    Message {
        text: String,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: Value,
    },
}

impl ModelOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    /// Builds a function call, normalising string-encoded arguments and
    /// filling in a call id when the provider sent none.
    pub fn function_call(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let call_id = call_id.into();
        let call_id = if call_id.is_empty() {
            format!("call_{}", uuid::Uuid::new_v4().simple())
        } else {
            call_id
        };
        let name = name.into();
        let arguments = normalize_arguments(&name, arguments);
        Self::FunctionCall {
            call_id,
            name,
            arguments,
        }
    }
}

/// Providers may send arguments as a JSON-encoded string; the loop always
/// works with a JSON object.
fn normalize_arguments(tool: &str, arguments: Value) -> Value {
    match arguments {
        Value::String(raw) if raw.trim().is_empty() => Value::Object(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(tool = %tool, error = %e, "model sent unparseable arguments");
                Value::Object(Map::new())
            }
        },
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

/// Ways a model call can fail. All are recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model did not respond within {0}s")]
    Timeout(u64),

    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Stateless adapter to a chat-completion endpoint with tool calling.
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<Vec<ModelOutput>, GatewayError>;
}
