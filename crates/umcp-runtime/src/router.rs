//! JSON-RPC envelope routing for the MCP method surface.
//!
//! Tool handler failures are carried in-band as `isError: true` content
//! inside a success envelope; resource and prompt handler failures become
//! RPC error envelopes. That asymmetry follows the MCP specification.

use crate::prompt::PromptRegistry;
use crate::registry::ToolRegistry;
use crate::resource::{ResourceBody, ResourceRegistry};
use crate::rpc::{self, Request, RequestId};
use crate::{Error, Result};
use serde_json::value::RawValue;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// MCP protocol revision implemented by the router.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

const ARGS_SUMMARY_MAX: usize = 120;

/// Result of routing one envelope.
#[derive(Debug)]
pub struct RouterOutcome {
    /// Response body; `None` for notifications.
    pub response: Option<String>,
    /// Preserved request id (lexical `null` for notifications and parse
    /// failures).
    pub id: RequestId,
    /// False when an error envelope or `isError` content was produced.
    pub ok: bool,
    /// Tool name for `tools/call` envelopes, for activity recording.
    pub tool: Option<String>,
    /// Compact, truncated rendering of the call arguments.
    pub args_summary: Option<String>,
    /// Failure detail for activity recording.
    pub detail: Option<String>,
}

/// Dispatcher for the MCP method set.
pub struct McpRouter {
    server_name: String,
    server_version: String,
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    prompts: Arc<PromptRegistry>,
}

impl McpRouter {
    pub fn new(
        server_name: impl Into<String>,
        server_version: impl Into<String>,
        tools: Arc<ToolRegistry>,
        resources: Arc<ResourceRegistry>,
        prompts: Arc<PromptRegistry>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            server_version: server_version.into(),
            tools,
            resources,
            prompts,
        }
    }

    /// Route one raw envelope to a response.
    pub async fn dispatch(&self, body: &str) -> RouterOutcome {
        let request = match Request::parse(body) {
            Ok(request) => request,
            Err(e) => {
                let id = RequestId::null();
                let response = rpc::error(&id, rpc::PARSE_ERROR, &format!("Parse error: {}", e));
                return RouterOutcome {
                    response: Some(response),
                    id,
                    ok: false,
                    tool: None,
                    args_summary: None,
                    detail: Some("parse error".to_string()),
                };
            }
        };

        let id = request.request_id();
        let notification = request.is_notification();

        let method = match request.method.as_deref() {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => {
                return self.finish(
                    notification,
                    id,
                    None,
                    None,
                    Err(Error::protocol(
                        rpc::INVALID_REQUEST,
                        "Invalid request: missing 'method'",
                    )),
                );
            }
        };

        let (tool, args_summary) = call_metadata(&method, request.params);

        let result = self.route(&method, request.params).await;
        self.finish(notification, id, tool, args_summary, result)
    }

    async fn route(&self, method: &str, params: Option<&RawValue>) -> Result<Routed> {
        match method {
            "initialize" => Ok(Routed::ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {},
                    "prompts": {},
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version,
                },
            }))),
            "tools/list" => Ok(Routed::ok(json!({ "tools": self.tools.definitions() }))),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => Ok(Routed::ok(json!({
                "resources": self.resources.definitions(),
            }))),
            "resources/templates/list" => Ok(Routed::ok(json!({
                "resourceTemplates": self.resources.template_definitions(),
            }))),
            "resources/read" => self.read_resource(params).await,
            "prompts/list" => Ok(Routed::ok(json!({ "prompts": self.prompts.definitions() }))),
            "prompts/get" => self.get_prompt(params).await,
            other => Err(Error::protocol(
                rpc::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }

    async fn call_tool(&self, params: Option<&RawValue>) -> Result<Routed> {
        let params = parse_params(params)?;
        let name = params
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidParams("Missing 'name' in params".to_string()))?
            .to_string();

        let arguments = match params.as_ref().and_then(|p| p.get("arguments")) {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => {
                return Err(Error::InvalidParams(
                    "Invalid 'arguments': expected object".to_string(),
                ));
            }
        };

        let entry = self.tools.resolve(&name)?;
        let args = entry.coerce(arguments.as_ref())?;

        match entry.invoke(args).await {
            Ok(value) => {
                let text = match value {
                    Value::String(s) => s,
                    other => serde_json::to_string_pretty(&other)?,
                };
                Ok(Routed::ok(tool_content(text, false)))
            }
            Err(Error::Protocol { code, message }) => Ok(Routed::tool_error(
                tool_content(format!("Error {}: {}", code, message), true),
                message,
            )),
            Err(e) => {
                let message = e.to_string();
                Ok(Routed::tool_error(tool_content(message.clone(), true), message))
            }
        }
    }

    async fn read_resource(&self, params: Option<&RawValue>) -> Result<Routed> {
        let params = parse_params(params)?;
        let uri = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidParams("Missing 'uri' in params".to_string()))?
            .to_string();

        let (content, mime) = self.resources.read(&uri).await?;
        let mut item = Map::new();
        item.insert("uri".to_string(), Value::from(uri));
        item.insert("mimeType".to_string(), Value::from(mime));
        match content.body {
            ResourceBody::Text(text) => item.insert("text".to_string(), Value::from(text)),
            ResourceBody::Blob(blob) => item.insert("blob".to_string(), Value::from(blob)),
        };

        Ok(Routed::ok(json!({ "contents": [Value::Object(item)] })))
    }

    async fn get_prompt(&self, params: Option<&RawValue>) -> Result<Routed> {
        let params = parse_params(params)?;
        let name = params
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidParams("Missing 'name' in params".to_string()))?
            .to_string();

        let arguments = match params.as_ref().and_then(|p| p.get("arguments")) {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => {
                return Err(Error::InvalidParams(
                    "Invalid 'arguments': expected object".to_string(),
                ));
            }
        };

        let result = self.prompts.get(&name, arguments.as_ref()).await?;
        Ok(Routed::ok(result))
    }

    fn finish(
        &self,
        notification: bool,
        id: RequestId,
        tool: Option<String>,
        args_summary: Option<String>,
        result: Result<Routed>,
    ) -> RouterOutcome {
        let (response, ok, detail) = match result {
            Ok(routed) => {
                let envelope = rpc::success(&id, &routed.result).unwrap_or_else(|e| {
                    rpc::error(
                        &id,
                        rpc::INTERNAL_ERROR,
                        &format!("Failed to serialize response: {}", e),
                    )
                });
                (envelope, routed.detail.is_none(), routed.detail)
            }
            Err(e) => {
                let message = e.to_string();
                (rpc::error(&id, e.code(), &message), false, Some(message))
            }
        };

        RouterOutcome {
            response: (!notification).then_some(response),
            id,
            ok,
            tool,
            args_summary,
            detail,
        }
    }
}

/// Routed method result: the `result` payload plus an optional in-band
/// failure detail (set for `isError: true` tool content).
struct Routed {
    result: Value,
    detail: Option<String>,
}

impl Routed {
    fn ok(result: Value) -> Self {
        Self {
            result,
            detail: None,
        }
    }

    fn tool_error(result: Value, detail: String) -> Self {
        Self {
            result,
            detail: Some(detail),
        }
    }
}

fn tool_content(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

/// Parse the raw `params` token into an object, if present.
fn parse_params(params: Option<&RawValue>) -> Result<Option<Map<String, Value>>> {
    match params {
        None => Ok(None),
        Some(raw) => match serde_json::from_str::<Value>(raw.get()) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(Value::Null) => Ok(None),
            Ok(_) => Err(Error::InvalidParams(
                "Invalid params: expected object".to_string(),
            )),
            Err(e) => Err(Error::InvalidParams(format!("Invalid params: {}", e))),
        },
    }
}

/// Tool name and argument summary for activity recording, extracted ahead
/// of routing so a failing call still gets an entry.
fn call_metadata(method: &str, params: Option<&RawValue>) -> (Option<String>, Option<String>) {
    if method != "tools/call" {
        return (None, None);
    }
    let Ok(Some(params)) = parse_params(params) else {
        return (None, None);
    };
    let tool = params
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let args_summary = params.get("arguments").map(|args| {
        let mut summary = args.to_string();
        if summary.len() > ARGS_SUMMARY_MAX {
            summary.truncate(
                (0..=ARGS_SUMMARY_MAX)
                    .rev()
                    .find(|i| summary.is_char_boundary(*i))
                    .unwrap_or(0),
            );
            summary.push('…');
        }
        summary
    });
    (tool, args_summary)
}
