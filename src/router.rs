//! Agent routing: which instructions and tools the model gets.
//!
//! Two policies exist. `single` is one flat agent with every registered tool.
//! `orchestrator` describes a set of specialists in the instruction text and
//! advertises the union of their tool sets; the model itself decides which
//! specialist to act as. Handoff is therefore prompt-level only, and so is
//! any `policy_text`: nothing here enforces authorization.

use tracing::{debug, warn};

use crate::config::{RoutePolicyKind, RouterConfig};
use crate::constants::DEFAULT_ORCHESTRATOR_INSTRUCTIONS;
use crate::tools::{ToolDescriptor, ToolRegistry};

/// A named specialist configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub name: String,
    pub handoff_description: String,
    pub instructions: String,
    /// Tool providers (server names) this specialist may use.
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutePolicy {
    Single { instructions: String },
    Orchestrator {
        instructions: String,
        specialists: Vec<AgentProfile>,
    },
}

impl RoutePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RoutePolicy::Single { .. } => "single",
            RoutePolicy::Orchestrator { .. } => "orchestrator",
        }
    }
}

/// Instructions and tool set for the next negotiation rounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveRoute {
    pub instructions: String,
    pub tools: Vec<ToolDescriptor>,
}

impl ActiveRoute {
    /// Whether `name` was advertised to the model.
    pub fn advertises(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

pub struct AgentRouter {
    policy: RoutePolicy,
    policy_text: Option<String>,
}

impl AgentRouter {
    pub fn from_config(config: &RouterConfig) -> Self {
        let policy = match config.policy {
            RoutePolicyKind::Single => RoutePolicy::Single {
                instructions: config.instructions.clone().unwrap_or_default(),
            },
            RoutePolicyKind::Orchestrator => RoutePolicy::Orchestrator {
                instructions: config
                    .instructions
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ORCHESTRATOR_INSTRUCTIONS.to_string()),
                specialists: config
                    .specialists
                    .iter()
                    .map(|s| AgentProfile {
                        name: s.name.clone(),
                        handoff_description: s.handoff_description.clone(),
                        instructions: s.instructions.clone(),
                        servers: s.servers.clone(),
                    })
                    .collect(),
            },
        };
        let policy_text = config
            .policy_text
            .clone()
            .filter(|text| !text.trim().is_empty());
        if policy_text.is_some() {
            warn!(
                "router policy_text is advisory: it is only given to the model as instructions \
                 and is not enforced on tool calls"
            );
        }
        Self {
            policy,
            policy_text,
        }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Resolve the active instructions and tool set against the registry.
    pub fn route(&self, registry: &ToolRegistry) -> ActiveRoute {
        let (mut instructions, tools) = match &self.policy {
            RoutePolicy::Single { instructions } => (instructions.clone(), registry.list()),
            RoutePolicy::Orchestrator {
                instructions,
                specialists,
            } if specialists.is_empty() => {
                warn!("orchestrator policy has no specialists; advertising all tools");
                (instructions.clone(), registry.list())
            }
            RoutePolicy::Orchestrator {
                instructions,
                specialists,
            } => {
                let servers: Vec<String> =
                    specialists.iter().flat_map(|s| s.servers.clone()).collect();
                for server in &servers {
                    if registry.list_for(std::slice::from_ref(server)).is_empty() {
                        warn!(server = %server, "specialist references a server with no tools");
                    }
                }
                (
                    orchestrator_prompt(instructions, specialists, registry),
                    registry.list_for(&servers),
                )
            }
        };

        if let Some(policy_text) = &self.policy_text {
            if !instructions.is_empty() {
                instructions.push_str("\n\n");
            }
            instructions.push_str(policy_text);
        }

        debug!(tool_count = tools.len(), "route selected");
        ActiveRoute {
            instructions,
            tools,
        }
    }
}

/// Orchestrator text followed by one section per specialist.
fn orchestrator_prompt(
    instructions: &str,
    specialists: &[AgentProfile],
    registry: &ToolRegistry,
) -> String {
    let mut prompt = format!("{instructions}\n\n# Specialists");
    for specialist in specialists {
        let tool_names: Vec<String> = registry
            .list_for(&specialist.servers)
            .into_iter()
            .map(|t| t.name)
            .collect();
        prompt.push_str(&format!("\n\n## {}\n", specialist.name));
        if !specialist.handoff_description.is_empty() {
            prompt.push_str(&format!("Handles: {}\n", specialist.handoff_description));
        }
        if !specialist.instructions.is_empty() {
            prompt.push_str(&format!("{}\n", specialist.instructions));
        }
        prompt.push_str(&format!("Tools: {}", tool_names.join(", ")));
    }
    prompt
}
