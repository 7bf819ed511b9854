use crate::{ConfigError, Result, ServerConfig};

/// Validate a resolved server configuration.
///
/// Port 0 is intentionally allowed: it asks the OS for an ephemeral port,
/// which the test suites rely on.
pub fn validate_config(config: &ServerConfig) -> Result<()> {
    if let Some(key) = &config.api_key {
        if key.is_empty() {
            return Err(ConfigError::ValidationError(
                "API key must not be empty when configured".to_string(),
            ));
        }
    }

    if config.remote_access {
        if config.api_key.is_none() {
            return Err(ConfigError::ValidationError(
                "Remote access requires an API key".to_string(),
            ));
        }
        if config.cert_dir.is_none() {
            return Err(ConfigError::ValidationError(
                "Remote access requires a certificate directory".to_string(),
            ));
        }
    }

    Ok(())
}
