//! # umcp-config
//!
//! Configuration and preferences for umcp servers.
//!
//! The server's runtime configuration ([`ServerConfig`]) is assembled from a
//! persisted per-user preferences file ([`Preferences`], YAML) plus whatever
//! overrides the embedding host or CLI applies on top.
//!
//! ## Quick Start
//!
//! ```rust
//! use umcp_config::{Preferences, ServerConfig, validate_config};
//!
//! let prefs = Preferences::default();
//! let config = ServerConfig::from_preferences(&prefs);
//!
//! validate_config(&config).expect("validation passes");
//! assert_eq!(config.port, 8081);
//! assert!(!config.remote_access);
//! ```
//!
//! ## Validation Rules
//!
//! - Remote access requires an API key and a certificate directory
//! - A configured API key must be non-empty
//! - Port 0 is accepted and means "ephemeral" (used by tests)

pub mod error;
pub mod parser;
pub mod types;
pub mod validator;

pub use error::{ConfigError, Result};
pub use parser::{load_preferences, preferences_path, save_preferences};
pub use types::{Preferences, ServerConfig};
pub use validator::validate_config;
