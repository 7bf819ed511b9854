use anyhow::{Context, Result};
use std::path::PathBuf;
use umcp_config::{load_preferences, preferences_path, save_preferences, ServerConfig};
use umcp_runtime::{builtins, generate_api_key, McpServer};

pub async fn execute(
    port: Option<u16>,
    remote: bool,
    project_root: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let prefs_path = preferences_path().context("Failed to locate the preferences file")?;
    let mut prefs = load_preferences(&prefs_path).context("Failed to load preferences")?;

    if let Some(port) = port {
        prefs.port = port;
    }
    if remote {
        prefs.remote_access = true;
    }

    crate::init_tracing(verbose || prefs.verbose_logging);

    // First remote enable with no key: generate and persist one.
    if prefs.remote_access && prefs.api_key.as_deref().map_or(true, str::is_empty) {
        let key = generate_api_key();
        println!("Generated API key: {}", key);
        prefs.api_key = Some(key);
        save_preferences(&prefs_path, &prefs).context("Failed to save preferences")?;
    }

    let mut config = ServerConfig::from_preferences(&prefs);
    config.project_root = project_root.or_else(|| std::env::current_dir().ok());
    if config.remote_access {
        config.cert_dir = prefs_path.parent().map(|p| p.to_path_buf());
    }

    let server = McpServer::new(config);
    builtins::register_defaults(&server);

    println!("Starting umcp server...");
    println!("  Instance: {}", server.instance_label());
    println!(
        "  Access: {}",
        if server.config().remote_access {
            "LAN (https, bearer auth)"
        } else {
            "loopback only"
        }
    );

    let addr = server.start().await.context("Server failed to start")?;
    println!("  Listening on {}", addr);
    println!("  Tools: {}", server.tools().len());
    println!();
    println!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    println!("\nShutting down...");
    server.stop().await;
    Ok(())
}
