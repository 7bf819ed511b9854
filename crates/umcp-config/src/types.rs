use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Default TCP port for the primary host instance. Clone instances add
/// their clone index plus one on top of this.
pub const DEFAULT_PORT: u16 = 8081;

/// Persisted per-user preferences.
///
/// This is the subset of configuration the host retains between sessions:
/// the remote-access toggle, the API key, the verbose-logging toggle, and
/// the base port. Everything else is derived at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Preferences {
    #[serde(default)]
    pub remote_access: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub verbose_logging: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            remote_access: false,
            api_key: None,
            verbose_logging: false,
            port: DEFAULT_PORT,
        }
    }
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name reported by `initialize`.
    pub name: String,
    /// Server version reported by `initialize`.
    pub version: String,
    /// Base TCP port. Clone instances shift this automatically.
    pub port: u16,
    /// When true, bind the wildcard address and require TLS plus an API key.
    pub remote_access: bool,
    /// Bearer token; `None` disables authentication (loopback only).
    pub api_key: Option<String>,
    /// Toggles info-level log lines.
    pub verbose_logging: bool,
    /// Directory holding `cert.pem` / `key.pem`. Required for remote access.
    pub cert_dir: Option<PathBuf>,
    /// Project root used for clone-instance detection.
    pub project_root: Option<PathBuf>,
}

impl ServerConfig {
    /// Build a configuration from persisted preferences, leaving the
    /// derived fields (cert dir, project root) unset.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            name: default_server_name(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            port: prefs.port,
            remote_access: prefs.remote_access,
            api_key: prefs.api_key.clone(),
            verbose_logging: prefs.verbose_logging,
            cert_dir: None,
            project_root: None,
        }
    }

    /// Address the gateway binds: wildcard when remote access is enabled,
    /// loopback otherwise.
    pub fn bind_addr(&self) -> IpAddr {
        if self.remote_access {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default())
    }
}

fn default_server_name() -> String {
    "umcp".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
