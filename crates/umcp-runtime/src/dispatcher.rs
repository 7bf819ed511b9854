//! Single-task dispatcher: consumes the gateway's request slot one
//! envelope at a time, enforces the response size cap, and records
//! activity. Handlers therefore never observe concurrency.

use crate::activity::{ActivityEntry, ActivityLog};
use crate::gateway::GatewayRequest;
use crate::router::McpRouter;
use crate::rpc::{self, RequestId};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Responses at or above this size are replaced by an error envelope
/// carrying the original request id. The cap includes the envelope.
pub const MAX_RESPONSE_BYTES: usize = 262144;

pub(crate) async fn run(
    mut slot: mpsc::Receiver<GatewayRequest>,
    router: Arc<McpRouter>,
    activity: Arc<ActivityLog>,
) {
    while let Some(request) = slot.recv().await {
        let started = Instant::now();
        let outcome = router.dispatch(&request.body).await;

        let (payload, ok) = match outcome.response {
            Some(response) if response.len() >= MAX_RESPONSE_BYTES => {
                (oversize_envelope(&outcome.id, response.len()), false)
            }
            Some(response) => (response, outcome.ok),
            None => (String::new(), outcome.ok),
        };

        let response_bytes = payload.len();
        if request.reply.send(payload).is_err() {
            tracing::debug!("reply receiver gone (deadline elapsed or connection closed)");
        }

        if let Some(tool) = outcome.tool {
            activity.record(
                ActivityEntry::new(tool, ok, started.elapsed())
                    .detail(outcome.detail)
                    .args_summary(outcome.args_summary)
                    .response_bytes(response_bytes),
            );
        }
    }

    tracing::debug!("dispatcher stopped");
}

pub(crate) fn oversize_envelope(id: &RequestId, size: usize) -> String {
    rpc::error(
        id,
        rpc::INTERNAL_ERROR,
        &format!(
            "Response too large ({} bytes). Maximum supported size is {} bytes. \
             Try reducing depth or using more specific queries.",
            size,
            MAX_RESPONSE_BYTES - 1
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ToolArgs;
    use crate::prompt::PromptRegistry;
    use crate::registry::{ToolHandler, ToolRegistry, ToolSpec};
    use crate::resource::ResourceRegistry;
    use crate::Result;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::oneshot;

    struct BigTool(usize);

    #[async_trait]
    impl ToolHandler for BigTool {
        async fn call(&self, _args: ToolArgs) -> Result<Value> {
            Ok(Value::String("x".repeat(self.0)))
        }
    }

    fn harness(tool_size: usize) -> (mpsc::Sender<GatewayRequest>, Arc<ActivityLog>) {
        let tools = Arc::new(ToolRegistry::new());
        tools.register(ToolSpec::new("big", "Big output"), Arc::new(BigTool(tool_size)));
        let router = Arc::new(McpRouter::new(
            "umcp",
            "0.0.0",
            tools,
            Arc::new(ResourceRegistry::new()),
            Arc::new(PromptRegistry::new()),
        ));
        let activity = Arc::new(ActivityLog::new());
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(run(rx, router, activity.clone()));
        (tx, activity)
    }

    async fn roundtrip(tx: &mpsc::Sender<GatewayRequest>, body: &str) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(GatewayRequest {
            body: body.to_string(),
            reply: reply_tx,
        })
        .await
        .unwrap();
        reply_rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_normal_response_passes_through() {
        let (tx, activity) = harness(10);
        let response = roundtrip(
            &tx,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"big"}}"#,
        )
        .await;

        let parsed: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(parsed["result"]["isError"], false);

        tokio::task::yield_now().await;
        let entries = activity.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tool, "big");
        assert!(entries[0].success);
        assert_eq!(entries[0].response_bytes, response.len());
    }

    #[tokio::test]
    async fn test_oversized_response_replaced() {
        let (tx, activity) = harness(MAX_RESPONSE_BYTES);
        let response = roundtrip(
            &tx,
            r#"{"jsonrpc":"2.0","id":"big-1","method":"tools/call","params":{"name":"big"}}"#,
        )
        .await;

        assert!(response.len() < MAX_RESPONSE_BYTES);
        let parsed: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(parsed["id"], "big-1");
        assert_eq!(parsed["error"]["code"], -32603);
        let message = parsed["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Response too large ("));
        assert!(message.contains("Maximum supported size is 262143 bytes"));

        tokio::task::yield_now().await;
        assert!(!activity.entries()[0].success);
    }

    #[tokio::test]
    async fn test_notification_empty_reply() {
        let (tx, _activity) = harness(10);
        let response = roundtrip(&tx, r#"{"jsonrpc":"2.0","method":"tools/list"}"#).await;
        assert!(response.is_empty());
    }

    #[test]
    fn test_oversize_envelope_wording() {
        let id = RequestId::null();
        let envelope = oversize_envelope(&id, 300000);
        assert!(envelope.contains("Response too large (300000 bytes)"));
        assert!(envelope.contains("262143"));
        assert!(envelope.contains("Try reducing depth"));
    }
}
