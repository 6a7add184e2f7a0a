//! Everything a turn needs, opened once per process.
//!
//! [`Runtime::start`] builds the model gateway, opens the tool providers, and
//! resolves the route. Callers must call [`Runtime::shutdown`] on every exit
//! path so provider processes are released.

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::conversation::ConversationState;
use crate::negotiation::{NegotiationError, NegotiationOptions, Negotiator};
use crate::output::Renderer;
use crate::provider::{ModelSelection, RigGateway};
use crate::router::{ActiveRoute, AgentRouter};
use crate::tools::host::ToolHost;

/// Result of a turn raced against Ctrl+C.
pub(crate) enum TurnOutcome {
    Answered(String),
    Failed(NegotiationError),
    Cancelled,
}

pub(crate) struct Runtime {
    gateway: RigGateway,
    host: ToolHost,
    route: ActiveRoute,
    instructions: String,
    options: NegotiationOptions,
}

impl Runtime {
    /// Builds the gateway, then opens every configured tool provider.
    ///
    /// Provider failures are reported through `renderer` and skipped.
    pub(crate) async fn start(
        config: &Config,
        selection: &ModelSelection,
        renderer: &mut dyn Renderer,
    ) -> Result<Self> {
        let gateway = RigGateway::from_config(config, selection)?;
        let tool_timeout = Duration::from_secs(config.negotiation.tool_timeout_secs());
        let host = ToolHost::open(&config.servers, tool_timeout).await;
        for failure in host.failures() {
            renderer.warn(&format!("{}: {}", failure.server, failure.reason));
        }
        if host.registry().is_empty() {
            renderer.warn("no tools registered; the model can only answer in text");
        }

        let route = AgentRouter::from_config(&config.router).route(host.registry());
        info!(
            provider = %selection.provider,
            model = %selection.model,
            tool_count = route.tools.len(),
            "runtime ready"
        );

        Ok(Self {
            gateway,
            host,
            route,
            instructions: config.instructions().to_string(),
            options: NegotiationOptions::from_config(&config.negotiation),
        })
    }

    pub(crate) fn route(&self) -> &ActiveRoute {
        &self.route
    }

    pub(crate) fn host(&self) -> &ToolHost {
        &self.host
    }

    fn negotiator(&self) -> Negotiator<'_> {
        Negotiator {
            gateway: &self.gateway,
            registry: self.host.registry(),
            route: &self.route,
            developer_instructions: &self.instructions,
            options: self.options,
        }
    }

    /// Runs one turn; Ctrl+C drops it, leaving `state` untouched.
    pub(crate) async fn turn(
        &self,
        state: &mut ConversationState,
        input: &str,
        renderer: &mut dyn Renderer,
    ) -> TurnOutcome {
        let negotiator = self.negotiator();
        tokio::select! {
            result = negotiator.run_turn(state, input, renderer) => match result {
                Ok(answer) => TurnOutcome::Answered(answer),
                Err(e) => TurnOutcome::Failed(e),
            },
            _ = tokio::signal::ctrl_c() => TurnOutcome::Cancelled,
        }
    }

    pub(crate) async fn shutdown(&self) {
        self.host.shutdown().await;
    }
}
