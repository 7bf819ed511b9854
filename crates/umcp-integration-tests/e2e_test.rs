/// End-to-end tests for umcp
/// Starts a real server on an ephemeral loopback port and drives it over
/// HTTP with reqwest: protocol scenarios, authentication, CORS, method
/// filtering, pause mode, and the response size cap.
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use umcp_runtime::param::{ParamKind, ParamSpec};
use umcp_runtime::{
    builtins, McpServer, ResourceContent, ResourceHandler, ResourceSpec, Result, ToolArgs,
    ToolHandler, ToolSpec, MAX_RESPONSE_BYTES,
};

struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, args: ToolArgs) -> Result<Value> {
        Ok(Value::String(
            args.get_str("text").unwrap_or_default().to_string(),
        ))
    }
}

struct HugeTool;

#[async_trait]
impl ToolHandler for HugeTool {
    async fn call(&self, _args: ToolArgs) -> Result<Value> {
        Ok(Value::String("x".repeat(MAX_RESPONSE_BYTES)))
    }
}

struct SlowTool;

#[async_trait]
impl ToolHandler for SlowTool {
    async fn call(&self, _args: ToolArgs) -> Result<Value> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Value::String("done".to_string()))
    }
}

struct CubeResource;

#[async_trait]
impl ResourceHandler for CubeResource {
    async fn read(&self, _uri: &str, _params: ToolArgs) -> Result<ResourceContent> {
        Ok(ResourceContent::json(&json!({"name": "Cube"})))
    }
}

fn test_server(api_key: Option<String>) -> McpServer {
    let mut config = umcp_config::ServerConfig::default();
    config.port = 0;
    config.api_key = api_key;

    let server = McpServer::new(config);
    builtins::register_defaults(&server);

    server.tools().register(
        ToolSpec::new("echo", "Echo text back")
            .category("Debug")
            .param(ParamSpec::optional("text", ParamKind::String, json!(""))),
        Arc::new(EchoTool),
    );
    server.tools().register(
        ToolSpec::new("huge", "Oversized output").category("Debug"),
        Arc::new(HugeTool),
    );
    server.tools().register(
        ToolSpec::new("slow", "Sleeps briefly").category("Debug"),
        Arc::new(SlowTool),
    );
    let registered = server.resources().register(
        ResourceSpec::new("scene://gameobject/{id}", "gameobject", "By id"),
        Arc::new(CubeResource),
    );
    assert!(registered.unwrap());

    server
}

async fn post(client: &reqwest::Client, url: &str, body: &str) -> reqwest::Response {
    client
        .post(url)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("request sends")
}

async fn post_json(client: &reqwest::Client, url: &str, body: &str) -> Value {
    let response = post(client, url, body).await;
    assert_eq!(response.status(), 200);
    serde_json::from_str(&response.text().await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_initialize_scenario() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
    )
    .await;

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(response["result"]["capabilities"]["tools"], json!({}));
    assert_eq!(response["result"]["capabilities"]["resources"], json!({}));
    assert_eq!(response["result"]["capabilities"]["prompts"], json!({}));
    assert_eq!(response["result"]["serverInfo"]["name"], "umcp");

    server.stop().await;
}

#[tokio::test]
async fn test_error_scenarios() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":"x","method":"tools/call","params":{"name":"nope"}}"#,
    )
    .await;
    assert_eq!(response["id"], "x");
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: nope");

    let response = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{}}"#,
    )
    .await;
    assert_eq!(response["id"], 2);
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["message"], "Missing 'name' in params");

    let response = post_json(&client, &url, "not-json").await;
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Parse error:"));

    server.stop().await;
}

#[tokio::test]
async fn test_notification_emits_no_bytes() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let response = post(&client, &url, r#"{"jsonrpc":"2.0","method":"tools/list"}"#).await;
    assert_eq!(response.status(), 204);
    assert!(response.text().await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_resource_read_scenario() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":5,"method":"resources/read","params":{"uri":"scene://gameobject/42"}}"#,
    )
    .await;

    assert_eq!(response["id"], 5);
    let item = &response["result"]["contents"][0];
    assert_eq!(item["uri"], "scene://gameobject/42");
    assert_eq!(item["mimeType"], "application/json");
    assert_eq!(item["text"], r#"{"name":"Cube"}"#);

    server.stop().await;
}

#[tokio::test]
async fn test_id_round_trip_bit_exact() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    for raw in [r#""abc""#, "42", "-7", "3.14", "null"] {
        let body = format!(r#"{{"jsonrpc":"2.0","id":{},"method":"tools/list"}}"#, raw);
        let response = post(&client, &url, &body).await;
        let text = response.text().await.unwrap();
        assert!(
            text.ends_with(&format!(r#""id":{}}}"#, raw)),
            "id {} not preserved bit-exactly in {}",
            raw,
            text
        );
    }

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_response_replaced() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let response = post(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":77,"method":"tools/call","params":{"name":"huge"}}"#,
    )
    .await;
    let text = response.text().await.unwrap();
    assert!(text.len() < MAX_RESPONSE_BYTES);

    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["id"], 77);
    assert_eq!(parsed["error"]["code"], -32603);
    let message = parsed["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Response too large ("));
    assert!(message.contains("Maximum supported size is 262143 bytes"));

    server.stop().await;
}

#[tokio::test]
async fn test_bearer_authentication() {
    let key = "umcp_0123456789abcdef0123456789abcdef0123456789abcdef";
    let server = test_server(Some(key.to_string()));
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;

    // Missing header.
    let response = post(&client, &url, body).await;
    assert_eq!(response.status(), 401);
    let envelope: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(envelope["error"]["code"], -32600);
    assert_eq!(envelope["id"], Value::Null);

    // Wrong key.
    let response = client
        .post(&url)
        .header("Authorization", "Bearer umcp_wrong")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Correct key.
    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", key))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert!(envelope.get("result").is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_cors_preflight_and_method_filtering() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, &url)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 405);

    let response = client
        .post(format!("http://{}/other", addr))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn test_pause_mode() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    server.pause();
    let response = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":9,"method":"tools/list"}"#,
    )
    .await;
    assert_eq!(response["id"], 9);
    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("paused"));

    server.resume();
    let response = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":10,"method":"tools/list"}"#,
    )
    .await;
    assert!(response.get("result").is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_builtin_tools_over_http() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let list = post_json(&client, &url, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await;
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"server_status"));
    assert!(names.contains(&"activity_log"));
    assert!(names.contains(&"echo"));

    // Calling echo records an activity entry the builtin can then list.
    let call = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#,
    )
    .await;
    assert_eq!(call["result"]["isError"], false);
    assert_eq!(call["result"]["content"][0]["text"], "hi");

    let activity = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"activity_log"}}"#,
    )
    .await;
    let text = activity["result"]["content"][0]["text"].as_str().unwrap();
    let entries: Value = serde_json::from_str(text).unwrap();
    assert_eq!(entries[0]["tool"], "echo");
    assert_eq!(entries[0]["success"], true);

    server.stop().await;
}

#[tokio::test]
async fn test_requests_serve_in_arrival_order() {
    let server = test_server(None);
    let addr = server.start().await.unwrap();
    let url = format!("http://{}/", addr);
    let client = reqwest::Client::new();

    let slow = post_json(
        &client,
        &url,
        r#"{"jsonrpc":"2.0","id":"slow","method":"tools/call","params":{"name":"slow"}}"#,
    );
    let fast = async {
        // Arrives second; must not overtake the slow request's reply slot.
        tokio::time::sleep(Duration::from_millis(10)).await;
        post_json(
            &client,
            &url,
            r#"{"jsonrpc":"2.0","id":"fast","method":"tools/call","params":{"name":"echo","arguments":{"text":"quick"}}}"#,
        )
        .await
    };

    let (slow, fast) = tokio::join!(slow, fast);
    assert_eq!(slow["id"], "slow");
    assert_eq!(slow["result"]["content"][0]["text"], "done");
    assert_eq!(fast["id"], "fast");
    assert_eq!(fast["result"]["content"][0]["text"], "quick");

    server.stop().await;
}

#[tokio::test]
async fn test_restart_serves_again() {
    let server = test_server(None);
    let first = server.start().await.unwrap();
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        &format!("http://{}/", first),
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
    )
    .await;
    assert!(response.get("result").is_some());

    let second = server.restart().await.unwrap();
    let response = post_json(
        &client,
        &format!("http://{}/", second),
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
    )
    .await;
    assert!(response.get("result").is_some());

    server.stop().await;
}
