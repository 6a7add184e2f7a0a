//! Gateway that replays canned responses, for exercising the negotiation loop.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GatewayError, ModelGateway, ModelOutput, ModelRequest};
use crate::conversation::ConversationEntry;

pub(crate) struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Vec<ModelOutput>, GatewayError>>>,
    /// Returned once the script runs out; `None` means answer with plain text.
    fallback: Option<Vec<ModelOutput>>,
    /// Snapshot of the entries sent on each round.
    pub(crate) seen: Mutex<Vec<Vec<ConversationEntry>>>,
    pub(crate) seen_tools: Mutex<Vec<Vec<String>>>,
    pub(crate) seen_instructions: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub(crate) fn new(responses: Vec<Vec<ModelOutput>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: None,
            seen: Mutex::new(Vec::new()),
            seen_tools: Mutex::new(Vec::new()),
            seen_instructions: Mutex::new(Vec::new()),
        }
    }

    /// Keeps returning `outputs` forever.
    pub(crate) fn repeating(outputs: Vec<ModelOutput>) -> Self {
        let mut gateway = Self::new(Vec::new());
        gateway.fallback = Some(outputs);
        gateway
    }

    pub(crate) fn failing_with(error: GatewayError) -> Self {
        let gateway = Self::new(Vec::new());
        gateway.push_error(error);
        gateway
    }

    /// Queue a failure after the responses already scripted.
    pub(crate) fn push_error(&self, error: GatewayError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn rounds(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ModelGateway for ScriptedGateway {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<Vec<ModelOutput>, GatewayError> {
        self.seen.lock().unwrap().push(request.entries.to_vec());
        self.seen_tools
            .lock()
            .unwrap()
            .push(request.tools.iter().map(|t| t.name.clone()).collect());
        self.seen_instructions
            .lock()
            .unwrap()
            .push(request.instructions.to_string());

        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        Ok(self
            .fallback
            .clone()
            .unwrap_or_else(|| vec![ModelOutput::text("No more scripted responses")]))
    }
}
