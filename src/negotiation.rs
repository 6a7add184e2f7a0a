//! The tool-call negotiation loop.
//!
//! One user turn runs as a series of rounds. Each round sends the whole
//! conversation plus the advertised tools to the [`ModelGateway`], records
//! every text fragment and function call it returns, executes the calls
//! through the [`ToolRegistry`], and records the results. The turn ends with
//! the first round that contains no function calls.
//!
//! Turns are atomic: the loop works on a copy of the history and only
//! replaces the session state once the turn has an answer. A failed or
//! cancelled turn leaves the state exactly as it was.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::NegotiationConfig;
use crate::conversation::{ConversationEntry, ConversationState};
use crate::gateway::{GatewayError, ModelGateway, ModelOutput, ModelRequest};
use crate::output::Renderer;
use crate::router::ActiveRoute;
use crate::tools::{ToolError, ToolRegistry};

/// Ways a turn can fail. Neither ends the session.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("model kept requesting tools after {max_rounds} rounds")]
    Exhausted { max_rounds: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationOptions {
    pub max_rounds: usize,
    pub parallel_tool_calls: bool,
}

impl Default for NegotiationOptions {
    fn default() -> Self {
        Self::from_config(&NegotiationConfig::default())
    }
}

impl NegotiationOptions {
    pub fn from_config(config: &NegotiationConfig) -> Self {
        Self {
            max_rounds: config.max_rounds(),
            parallel_tool_calls: config.parallel_tool_calls(),
        }
    }
}

/// Everything a turn needs besides the session state.
pub struct Negotiator<'a> {
    pub gateway: &'a dyn ModelGateway,
    pub registry: &'a ToolRegistry,
    pub route: &'a ActiveRoute,
    /// Developer entry placed at the head of an empty conversation.
    pub developer_instructions: &'a str,
    pub options: NegotiationOptions,
}

/// A function call waiting to be executed.
struct PendingCall {
    call_id: String,
    name: String,
    arguments: Value,
}

impl Negotiator<'_> {
    /// Run one user turn to completion and return the final answer.
    ///
    /// The answer is every text fragment of the turn, concatenated in the
    /// order the model emitted them. On success `state` holds the whole turn;
    /// on error it is untouched.
    #[instrument(skip_all, fields(max_rounds = self.options.max_rounds))]
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<String, NegotiationError> {
        let mut working = state.history().to_vec();
        if working.is_empty() && !self.developer_instructions.trim().is_empty() {
            working.push(ConversationEntry::developer(self.developer_instructions));
        }
        working.push(ConversationEntry::user(user_input));

        let mut fragments: Vec<String> = Vec::new();

        for round in 1..=self.options.max_rounds {
            let outputs = self
                .gateway
                .respond(ModelRequest {
                    instructions: &self.route.instructions,
                    entries: &working,
                    tools: &self.route.tools,
                })
                .await?;

            let mut calls = 0usize;
            let mut pending: Vec<PendingCall> = Vec::new();

            for output in outputs {
                match output {
                    ModelOutput::Message { text } => {
                        if text.is_empty() {
                            continue;
                        }
                        renderer.render_text(&text);
                        working.push(ConversationEntry::assistant(text.as_str()));
                        fragments.push(text);
                    }
                    ModelOutput::FunctionCall {
                        call_id,
                        name,
                        arguments,
                    } => {
                        calls += 1;
                        working.push(ConversationEntry::function_call(
                            call_id.as_str(),
                            name.as_str(),
                            arguments.clone(),
                        ));
                        let call = PendingCall {
                            call_id,
                            name,
                            arguments,
                        };
                        if self.options.parallel_tool_calls {
                            pending.push(call);
                        } else {
                            let output = self.execute(&call, renderer).await;
                            working.push(ConversationEntry::function_result(call.call_id, output));
                        }
                    }
                }
            }

            if !pending.is_empty() {
                for call in &pending {
                    renderer.tool_start(&call.name, &call.arguments);
                }
                let results =
                    join_all(pending.iter().map(|call| self.invoke(&call.name, call.arguments.clone())))
                        .await;
                for (call, result) in pending.into_iter().zip(results) {
                    let output = self.settle(&call, result, renderer);
                    working.push(ConversationEntry::function_result(call.call_id, output));
                }
            }

            debug!(round, calls, "round complete");
            if calls == 0 {
                info!(rounds = round, entries = working.len(), "turn complete");
                state.replace_all(working);
                debug_assert!(state.results_are_paired());
                return Ok(fragments.concat());
            }
        }

        warn!(max_rounds = self.options.max_rounds, "negotiation exhausted");
        Err(NegotiationError::Exhausted {
            max_rounds: self.options.max_rounds,
        })
    }

    async fn execute(&self, call: &PendingCall, renderer: &mut dyn Renderer) -> Value {
        renderer.tool_start(&call.name, &call.arguments);
        let result = self.invoke(&call.name, call.arguments.clone()).await;
        self.settle(call, result, renderer)
    }

    /// Only tools advertised on this route may run, even if the registry
    /// knows more.
    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        if !self.route.advertises(name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        self.registry.invoke(name, arguments).await
    }

    /// Turn a tool result into the value recorded for the model.
    fn settle(
        &self,
        call: &PendingCall,
        result: Result<Value, ToolError>,
        renderer: &mut dyn Renderer,
    ) -> Value {
        match result {
            Ok(output) => {
                debug!(tool = %call.name, call_id = %call.call_id, "tool call succeeded");
                renderer.tool_result(&call.name, &output, false);
                output
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.call_id, error = %e, "tool call failed");
                let payload = e.to_payload();
                renderer.tool_result(&call.name, &payload, true);
                payload
            }
        }
    }
}
