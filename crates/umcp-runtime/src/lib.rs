//! # umcp-runtime
//!
//! Core runtime for umcp - an embeddable MCP server for interactive
//! editor hosts.
//!
//! This crate provides the HTTP(S) gateway, the single-task dispatcher,
//! the tool/resource/prompt registries with JSON-schema publication and
//! argument coercion, and the JSON-RPC 2.0 router implementing the MCP
//! method surface.
//!
//! ## Quick Start
//!
//! ```rust
//! use umcp_runtime::{McpServer, ToolHandler, ToolSpec, ToolArgs, Result};
//! use umcp_runtime::param::{ParamKind, ParamSpec};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct GreetTool;
//!
//! #[async_trait::async_trait]
//! impl ToolHandler for GreetTool {
//!     async fn call(&self, args: ToolArgs) -> Result<Value> {
//!         Ok(json!({
//!             "message": format!("Hello, {}!", args.get_str("name").unwrap_or("world")),
//!         }))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let mut config = umcp_config::ServerConfig::default();
//! config.port = 0; // ephemeral
//!
//! let server = McpServer::new(config);
//! umcp_runtime::builtins::register_defaults(&server);
//! server.tools().register(
//!     ToolSpec::new("greet", "Greet a person")
//!         .category("Editor")
//!         .param(ParamSpec::required("name", ParamKind::String)),
//!     Arc::new(GreetTool),
//! );
//!
//! let addr = server.start().await?;
//! assert!(addr.port() > 0);
//! server.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design
//!
//! - **Single-slot dispatch**: the gateway hands requests to one
//!   dispatcher task through a one-deep channel, so handlers never see
//!   concurrency and requests are served strictly in arrival order
//! - **Bit-exact ids**: request ids are spliced back into responses in
//!   their original lexical form (`"abc"`, `42`, `3.14`, `null`)
//! - **Bounded responses**: envelopes of 256 KiB or more are replaced by
//!   an error envelope carrying the original id
//! - **In-band tool errors**: tool handler failures surface as
//!   `isError: true` content; resource and prompt failures surface as RPC
//!   errors

pub mod activity;
pub mod auth;
pub mod builtins;
pub mod cert;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod instance;
pub mod param;
pub mod prompt;
pub mod registry;
pub mod resource;
pub mod router;
pub mod rpc;
pub mod server;

pub use activity::{ActivityEntry, ActivityLog, ACTIVITY_CAPACITY};
pub use auth::{check_bearer, generate_api_key, API_KEY_PREFIX};
pub use cert::{load_or_generate, TlsMaterial};
pub use dispatcher::MAX_RESPONSE_BYTES;
pub use error::{Error, Result};
pub use gateway::{tls_available, REQUEST_DEADLINE};
pub use param::{ParamKind, ParamSpec, ToolArgs};
pub use prompt::{
    PromptArg, PromptHandler, PromptMessage, PromptRegistry, PromptResult, PromptSpec, Role,
};
pub use registry::{ToolAnnotations, ToolHandler, ToolRegistry, ToolSpec};
pub use resource::{
    ResourceBody, ResourceContent, ResourceHandler, ResourceRegistry, ResourceSpec,
};
pub use router::{McpRouter, RouterOutcome, PROTOCOL_VERSION};
pub use rpc::RequestId;
pub use server::McpServer;
