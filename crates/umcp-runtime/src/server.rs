//! Server lifecycle: wires registries, router, gateway, and dispatcher
//! together and owns start/stop/pause.

use crate::activity::ActivityLog;
use crate::cert;
use crate::dispatcher;
use crate::gateway::{self, GatewayHandle, GatewayOptions};
use crate::instance;
use crate::prompt::PromptRegistry;
use crate::registry::ToolRegistry;
use crate::resource::ResourceRegistry;
use crate::router::McpRouter;
use crate::{Error, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use umcp_config::{validate_config, ServerConfig};

const BIND_ATTEMPTS: u32 = 5;
const BIND_BACKOFF: Duration = Duration::from_secs(1);

struct Running {
    gateway: GatewayHandle,
    dispatcher: JoinHandle<()>,
}

/// The embeddable MCP server.
pub struct McpServer {
    config: ServerConfig,
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    prompts: Arc<PromptRegistry>,
    activity: Arc<ActivityLog>,
    router: Arc<McpRouter>,
    paused: Arc<AtomicBool>,
    started_at: Instant,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Self {
        let tools = Arc::new(ToolRegistry::new());
        let resources = Arc::new(ResourceRegistry::new());
        let prompts = Arc::new(PromptRegistry::new());
        let router = Arc::new(McpRouter::new(
            config.name.clone(),
            config.version.clone(),
            tools.clone(),
            resources.clone(),
            prompts.clone(),
        ));

        Self {
            config,
            tools,
            resources,
            prompts,
            activity: Arc::new(ActivityLog::new()),
            router,
            paused: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn resources(&self) -> &Arc<ResourceRegistry> {
        &self.resources
    }

    pub fn prompts(&self) -> &Arc<PromptRegistry> {
        &self.prompts
    }

    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }

    pub fn instance_label(&self) -> String {
        instance::instance_label(self.config.project_root.as_deref())
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn started_instant(&self) -> Instant {
        self.started_at
    }

    pub(crate) fn paused_flag(&self) -> Arc<AtomicBool> {
        self.paused.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Stop accepting work: new requests receive a synthesized "paused"
    /// envelope immediately instead of queuing.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        tracing::info!("server paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        tracing::info!("server resumed");
    }

    /// Start the gateway and dispatcher. Returns the bound address.
    ///
    /// Binding retries up to five times with one-second back-off, so a
    /// port still held by a previous instance does not fail the start.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(Error::Gateway("server is already running".to_string()));
        }

        validate_config(&self.config).map_err(|e| Error::Gateway(e.to_string()))?;

        let tls = if self.config.remote_access {
            let dir = self
                .config
                .cert_dir
                .as_deref()
                .ok_or_else(|| Error::Certificate("no certificate directory".to_string()))?;
            Some(cert::load_or_generate(dir)?)
        } else {
            None
        };

        let port = instance::select_port(self.config.port, self.config.project_root.as_deref());
        let addr = SocketAddr::new(self.config.bind_addr(), port);

        let mut attempt = 0;
        let listener = loop {
            match gateway::bind(addr) {
                Ok(listener) => break listener,
                Err(e) => {
                    attempt += 1;
                    if attempt >= BIND_ATTEMPTS {
                        return Err(e);
                    }
                    tracing::warn!(%addr, attempt, error = %e, "bind failed, retrying");
                    tokio::time::sleep(BIND_BACKOFF).await;
                }
            }
        };

        let (slot_tx, slot_rx) = mpsc::channel(1);
        let dispatcher = tokio::spawn(dispatcher::run(
            slot_rx,
            self.router.clone(),
            self.activity.clone(),
        ));

        let options = GatewayOptions {
            api_key: self.config.api_key.clone(),
            tls,
        };
        let gateway = match gateway::start(listener, options, self.paused.clone(), slot_tx).await {
            Ok(gateway) => gateway,
            Err(e) => {
                dispatcher.abort();
                return Err(e);
            }
        };

        let bound = gateway.addr();
        tracing::info!(
            addr = %bound,
            instance = %self.instance_label(),
            tools = self.tools.len(),
            "server started"
        );

        *running = Some(Running {
            gateway,
            dispatcher,
        });
        Ok(bound)
    }

    /// Stop serving. Idempotent; a server that is not running is a no-op.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        running.gateway.shutdown().await;

        // The gateway held the last slot sender, so the dispatcher drains
        // and exits on its own; the abort is a backstop.
        let abort = running.dispatcher.abort_handle();
        if tokio::time::timeout(Duration::from_secs(5), running.dispatcher)
            .await
            .is_err()
        {
            tracing::warn!("dispatcher did not drain in time, aborting");
            abort.abort();
        }

        tracing::info!("server stopped");
    }

    pub async fn restart(&self) -> Result<SocketAddr> {
        self.stop().await;
        self.start().await
    }

    /// Address the gateway is currently bound to, if running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.gateway.addr())
    }
}
