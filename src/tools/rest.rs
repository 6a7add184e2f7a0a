//! Tool provider backed by REST endpoints declared in config.
//!
//! Each binding maps one tool name to an HTTP method and a path template such
//! as `/users/{user_id}`. Placeholders are filled from the call arguments and
//! percent-encoded as single path segments; whatever is left over becomes the
//! JSON body (POST/PUT/PATCH) or the query string (GET/DELETE).

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, Method, Url};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{ToolDescriptor, ToolError, ToolExecutor};
use crate::config::RestToolConfig;

fn placeholder_pattern() -> Result<&'static Regex, ToolError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}"))
        .as_ref()
        .map_err(|e| ToolError::Validation(format!("path pattern: {e}")))
}

/// One declared endpoint.
#[derive(Debug, Clone)]
struct RestBinding {
    descriptor: ToolDescriptor,
    method: Method,
    path: String,
}

/// A set of REST bindings sharing a base URL.
pub struct RestProvider {
    name: String,
    base_url: Url,
    client: Client,
    bindings: Vec<RestBinding>,
}

impl RestProvider {
    pub fn new(
        name: &str,
        base_url: &str,
        tools: &[RestToolConfig],
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ToolError::Validation(format!("invalid base_url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ToolError::Validation(format!("base_url '{base_url}' cannot take a path")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "{}/{}",
                crate::constants::APP_NAME,
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| ToolError::Transport(format!("failed to build HTTP client: {e}")))?;

        let bindings = tools
            .iter()
            .map(|tool| {
                let method = parse_method(&tool.method)?;
                let schema = match &tool.parameters {
                    Some(schema) => schema.clone(),
                    None => schema_from_path(&tool.path)?,
                };
                Ok(RestBinding {
                    descriptor: ToolDescriptor::new(&tool.name, &tool.description, schema),
                    method,
                    path: tool.path.clone(),
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            client,
            bindings,
        })
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.bindings.iter().map(|b| b.descriptor.clone()).collect()
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RestProvider {
    async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let binding = self
            .bindings
            .iter()
            .find(|b| b.descriptor.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let mut remaining = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ToolError::Validation("arguments must be a JSON object".into())),
        };
        let url = fill_url(&self.base_url, &binding.path, &mut remaining)?;
        debug!(server = %self.name, method = %binding.method, url = %url, "calling REST tool");

        let mut request = self
            .client
            .request(binding.method.clone(), url.clone())
            .header("Accept", "application/json");
        if sends_body(&binding.method) {
            request = request.json(&Value::Object(remaining));
        } else if !remaining.is_empty() {
            request = request.query(&query_pairs(&remaining));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Transport(format!("{} {url}: {e}", binding.method)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Transport(format!("reading response from {url}: {e}")))?;

        if !status.is_success() {
            return Err(ToolError::Remote(format!("{} returned {status}: {body}", url)));
        }
        Ok(parse_body(&body))
    }
}

fn parse_method(raw: &str) -> Result<Method, ToolError> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(ToolError::Validation(format!("unsupported HTTP method '{other}'"))),
    }
}

fn sends_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Every placeholder becomes a required string property.
fn schema_from_path(path: &str) -> Result<Value, ToolError> {
    let names: Vec<&str> = placeholder_pattern()?
        .captures_iter(path)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let properties: Map<String, Value> = names
        .iter()
        .map(|n| (n.to_string(), json!({"type": "string"})))
        .collect();
    Ok(json!({
        "type": "object",
        "properties": properties,
        "required": names,
    }))
}

/// Append the template's segments to `base`, consuming the arguments that
/// fill `{name}` placeholders. Each segment is percent-encoded, so a value
/// can never add or remove path segments.
fn fill_url(base: &Url, template: &str, args: &mut Map<String, Value>) -> Result<Url, ToolError> {
    let pattern = placeholder_pattern()?;
    let mut segments = Vec::new();
    for raw in template.trim_start_matches('/').split('/') {
        let mut segment = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in pattern.captures_iter(raw) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            segment.push_str(&raw[last..whole.start()]);
            segment.push_str(&take_path_argument(args, name.as_str())?);
            last = whole.end();
        }
        segment.push_str(&raw[last..]);
        if segment == "." || segment == ".." {
            return Err(ToolError::Validation(format!(
                "path segment '{segment}' in '{template}' is not allowed"
            )));
        }
        segments.push(segment);
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ToolError::Validation(format!("base_url '{base}' cannot take a path")))?
        .pop_if_empty()
        .extend(&segments);
    Ok(url)
}

fn take_path_argument(args: &mut Map<String, Value>, name: &str) -> Result<String, ToolError> {
    let value = args
        .remove(name)
        .ok_or_else(|| ToolError::Validation(format!("missing path argument '{name}'")))?;
    let text = scalar_text(&value)
        .ok_or_else(|| ToolError::Validation(format!("path argument '{name}' must be a scalar")))?;
    if text.is_empty() || text == "." || text == ".." {
        return Err(ToolError::Validation(format!(
            "path argument '{name}' is not a valid identifier"
        )));
    }
    Ok(text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-scalar query values are sent as their JSON text.
fn query_pairs(args: &Map<String, Value>) -> Vec<(String, String)> {
    args.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), scalar_text(v).unwrap_or_else(|| v.to_string())))
        .collect()
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
