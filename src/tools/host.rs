//! Startup and shutdown of all configured tool providers.
//!
//! [`ToolHost::open`] brings every provider up once, registers its tools, and
//! keeps the handles so [`ToolHost::shutdown`] can release them on every exit
//! path. A provider that fails to open is recorded and skipped; the session
//! still starts with whatever tools are available.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::rest::RestProvider;
use super::stdio::StdioProvider;
use super::{ToolDescriptor, ToolError, ToolExecutor, ToolRegistry};
use crate::config::ServerConfig;

/// A provider that could not be opened, or a tool that could not be registered.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub server: String,
    pub reason: String,
}

/// Owns the live tool providers and the registry built from them.
pub struct ToolHost {
    registry: ToolRegistry,
    processes: Vec<Arc<StdioProvider>>,
    failures: Vec<ProviderFailure>,
}

impl ToolHost {
    /// Open every configured provider, in name order.
    pub async fn open(servers: &BTreeMap<String, ServerConfig>, tool_timeout: Duration) -> Self {
        let mut host = Self {
            registry: ToolRegistry::new(),
            processes: Vec::new(),
            failures: Vec::new(),
        };

        for (name, server) in servers {
            match server {
                ServerConfig::Stdio { command, args, env } => {
                    match StdioProvider::spawn(name, command, args, env, tool_timeout).await {
                        Ok(provider) => {
                            let provider = Arc::new(provider);
                            host.processes.push(Arc::clone(&provider));
                            match provider.list_tools().await {
                                Ok(tools) => host.register_all(name, tools, provider),
                                Err(e) => host.fail(name, e),
                            }
                        }
                        Err(e) => host.fail(name, e),
                    }
                }
                ServerConfig::Rest { base_url, tools } => {
                    match RestProvider::new(name, base_url, tools, tool_timeout) {
                        Ok(provider) => {
                            let listed = provider.list_tools();
                            host.register_all(name, listed, Arc::new(provider));
                        }
                        Err(e) => host.fail(name, e),
                    }
                }
            }
        }

        host
    }

    fn register_all(
        &mut self,
        server: &str,
        tools: Vec<ToolDescriptor>,
        executor: Arc<dyn ToolExecutor>,
    ) {
        let count = tools.len();
        for descriptor in tools {
            if let Err(e) = self
                .registry
                .register(descriptor, server, Arc::clone(&executor))
            {
                self.fail(server, e);
            }
        }
        info!(server = %server, tool_count = count, "tool provider ready");
    }

    fn fail(&mut self, server: &str, error: ToolError) {
        warn!(server = %server, error = %error, "tool provider problem");
        self.failures.push(ProviderFailure {
            server: server.to_string(),
            reason: error.to_string(),
        });
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    /// Stop every child process. Idempotent.
    pub async fn shutdown(&self) {
        for process in &self.processes {
            process.shutdown().await;
        }
    }
}
