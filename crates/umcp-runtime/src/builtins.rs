//! Default registrations: server status and activity introspection.
//!
//! These exercise all three registries through the same `register` calls
//! the embedding host uses for its own tools.

use crate::activity::ActivityLog;
use crate::param::{ParamKind, ParamSpec, ToolArgs};
use crate::prompt::{PromptArg, PromptHandler, PromptMessage, PromptResult, PromptSpec};
use crate::registry::{ToolHandler, ToolSpec};
use crate::resource::{ResourceContent, ResourceHandler, ResourceSpec};
use crate::server::McpServer;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_ACTIVITY_LIMIT: i64 = 10;
const MAX_ACTIVITY_LIMIT: i64 = 100;

/// Register the built-in tools, resources, and prompts on `server`.
pub fn register_defaults(server: &McpServer) {
    let status = Arc::new(StatusSource {
        name: server.config().name.clone(),
        version: server.config().version.clone(),
        label: server.instance_label(),
        port: server.config().port,
        started: server.started_instant(),
        paused: server.paused_flag(),
        activity: server.activity().clone(),
    });

    server.tools().register(
        ToolSpec::new("server_status", "Report server name, version, instance, and uptime")
            .category("Editor")
            .read_only(true)
            .idempotent(true),
        Arc::new(ServerStatusTool {
            source: status.clone(),
        }),
    );

    server.tools().register(
        ToolSpec::new("activity_log", "List recent tool invocations, newest first")
            .category("Console")
            .read_only(true)
            .param(
                ParamSpec::optional("limit", ParamKind::Integer, json!(DEFAULT_ACTIVITY_LIMIT))
                    .describe("Number of entries to return")
                    .bounds(1.0, MAX_ACTIVITY_LIMIT as f64),
            ),
        Arc::new(ActivityLogTool {
            activity: server.activity().clone(),
        }),
    );

    let registered = server.resources().register(
        ResourceSpec::new("status://server", "server-status", "Live server status")
            .mime_type("application/json"),
        Arc::new(StatusResource { source: status }),
    );
    if let Err(e) = registered {
        tracing::warn!(error = %e, "failed to register status resource");
    }

    let registered = server.resources().register(
        ResourceSpec::new(
            "activity://entry/{index}",
            "activity-entry",
            "One activity entry, 0 is the most recent",
        )
        .mime_type("application/json")
        .param(ParamSpec::required("index", ParamKind::Integer)),
        Arc::new(ActivityEntryResource {
            activity: server.activity().clone(),
        }),
    );
    if let Err(e) = registered {
        tracing::warn!(error = %e, "failed to register activity resource");
    }

    server.prompts().register(
        PromptSpec::new(
            "troubleshoot_connection",
            "Walk through diagnosing a failing client connection",
        )
        .arg(PromptArg::required("symptom", "What the client observes"))
        .arg(PromptArg::optional("transport", "http or https")),
        Arc::new(TroubleshootPrompt),
    );
}

struct StatusSource {
    name: String,
    version: String,
    label: String,
    port: u16,
    started: Instant,
    paused: Arc<AtomicBool>,
    activity: Arc<ActivityLog>,
}

impl StatusSource {
    fn status(&self) -> Value {
        json!({
            "name": self.name,
            "version": self.version,
            "instance": self.label,
            "port": self.port,
            "uptime_seconds": self.started.elapsed().as_secs(),
            "paused": self.paused.load(Ordering::SeqCst),
            "activity_entries": self.activity.len(),
        })
    }
}

struct ServerStatusTool {
    source: Arc<StatusSource>,
}

#[async_trait]
impl ToolHandler for ServerStatusTool {
    async fn call(&self, _args: ToolArgs) -> Result<Value> {
        Ok(self.source.status())
    }
}

struct ActivityLogTool {
    activity: Arc<ActivityLog>,
}

#[async_trait]
impl ToolHandler for ActivityLogTool {
    async fn call(&self, args: ToolArgs) -> Result<Value> {
        let limit = args
            .get_i64("limit")
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT) as usize;
        Ok(serde_json::to_value(self.activity.recent(limit))?)
    }
}

struct StatusResource {
    source: Arc<StatusSource>,
}

#[async_trait]
impl ResourceHandler for StatusResource {
    async fn read(&self, _uri: &str, _params: ToolArgs) -> Result<ResourceContent> {
        Ok(ResourceContent::json(&self.source.status()))
    }
}

struct ActivityEntryResource {
    activity: Arc<ActivityLog>,
}

#[async_trait]
impl ResourceHandler for ActivityEntryResource {
    async fn read(&self, _uri: &str, params: ToolArgs) -> Result<ResourceContent> {
        let index = params.get_i64("index").unwrap_or(0);
        if index < 0 {
            return Err(Error::InvalidParams(format!(
                "Parameter 'index': {} is negative",
                index
            )));
        }

        let recent = self.activity.recent(index as usize + 1);
        let entry = recent
            .into_iter()
            .nth(index as usize)
            .ok_or_else(|| Error::Handler(format!("No activity entry at index {}", index)))?;
        Ok(ResourceContent::json(&serde_json::to_value(entry)?))
    }
}

struct TroubleshootPrompt;

#[async_trait]
impl PromptHandler for TroubleshootPrompt {
    async fn render(&self, args: HashMap<String, String>) -> Result<PromptResult> {
        let symptom = args.get("symptom").cloned().unwrap_or_default();
        let transport = args.get("transport").cloned().unwrap_or_else(|| "http".to_string());

        Ok(PromptResult {
            description: Some("Connection troubleshooting checklist".to_string()),
            messages: vec![PromptMessage::user(format!(
                "An MCP client connecting over {} reports: {}. \
                 Check in order: the server is running and not paused, the port \
                 matches the instance (clones shift the base port), the API key \
                 is sent as a Bearer token when remote access is on, and the \
                 response size stays under 256 KiB. Suggest the most likely fix.",
                transport, symptom
            ))],
        })
    }
}
