//! Tool registry and executor contracts.
//!
//! A [`ToolRegistry`] maps a tool name to a [`ToolDescriptor`] (what the
//! model is told) and a [`ToolExecutor`] (how the call is carried out, usually
//! by a remote provider process or HTTP service). Failures are typed as
//! [`ToolError`] and can always be turned into a JSON payload for the model.

pub mod host;
pub mod rest;
pub mod stdio;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Definition advertised to the model so it knows what it may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON-schema-like object describing the arguments.
    pub parameter_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: schema,
        }
    }
}

/// Ways a tool invocation can fail.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("invalid arguments: {0}")]
    Validation(String),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),
}

impl ToolError {
    /// Short machine-readable kind, used in the payload fed back to the model.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Transport(_) => "transport_error",
            ToolError::Remote(_) => "remote_error",
            ToolError::Validation(_) => "validation_error",
            ToolError::DuplicateTool(_) => "duplicate_tool",
        }
    }

    /// JSON error payload recorded as the function result.
    pub fn to_payload(&self) -> Value {
        json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

/// Carries out a tool call. Implemented by every tool provider.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Invoke `name` with already-validated `arguments`.
    async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    /// Name of the provider that declared the tool.
    provider: String,
    executor: Arc<dyn ToolExecutor>,
}

/// Holds all registered tools and dispatches calls by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique across the registry.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        provider: &str,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<(), ToolError> {
        if self.get(&descriptor.name).is_some() {
            return Err(ToolError::DuplicateTool(descriptor.name));
        }
        self.tools.push(RegisteredTool {
            descriptor,
            provider: provider.to_string(),
            executor,
        });
        Ok(())
    }

    /// Every registered descriptor, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Descriptors declared by any of the given providers.
    pub fn list_for(&self, providers: &[String]) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| providers.iter().any(|p| p == &t.provider))
            .map(|t| t.descriptor.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|t| t.descriptor.name == name)
            .map(|t| &t.descriptor)
    }

    pub fn provider_of(&self, name: &str) -> Option<&str> {
        self.tools
            .iter()
            .find(|t| t.descriptor.name == name)
            .map(|t| t.provider.as_str())
    }

    /// Look up a tool by name, validate the arguments, and execute it.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.descriptor.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        validate::check_arguments(&tool.descriptor.parameter_schema, &arguments)?;
        tool.executor.call(name, arguments).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
