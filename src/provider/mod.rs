//! LLM provider selection and the rig-core backed model gateway.
//!
//! Wraps rig-core's provider clients behind [`RigGateway`] with enum
//! dispatch, keeping provider-specific details out of the negotiation loop.
//! Supports OpenAI, Anthropic, OpenRouter, and Ollama via [`ProviderKind`].

mod client;
mod kind;
mod resolve;

pub use client::RigGateway;
pub use kind::ProviderKind;
pub use resolve::{resolve_model, ModelSelection};
