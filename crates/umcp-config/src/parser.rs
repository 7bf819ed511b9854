use crate::{ConfigError, Preferences, Result};
use std::path::{Path, PathBuf};

/// Location of the persisted preferences file, under the per-user config
/// directory (`<config_dir>/umcp/preferences.yaml`).
pub fn preferences_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("umcp").join("preferences.yaml"))
}

/// Load preferences from `path`. A missing file yields the defaults.
pub fn load_preferences(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;

    parse_preferences_from_str(&content)
}

pub fn parse_preferences_from_str(yaml: &str) -> Result<Preferences> {
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Persist preferences to `path`, creating parent directories as needed.
pub fn save_preferences(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::IoError(parent.to_path_buf(), e))?;
    }

    let yaml = serde_yaml::to_string(prefs).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    std::fs::write(path, yaml).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preferences_minimal() {
        let yaml = r#"
remote_access: true
api_key: "umcp_0011"
port: 8090
"#;
        let prefs = parse_preferences_from_str(yaml).unwrap();
        assert!(prefs.remote_access);
        assert_eq!(prefs.api_key.as_deref(), Some("umcp_0011"));
        assert_eq!(prefs.port, 8090);
        assert!(!prefs.verbose_logging);
    }

    #[test]
    fn test_parse_preferences_empty_uses_defaults() {
        let prefs = parse_preferences_from_str("{}").unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_parse_preferences_invalid_yaml() {
        let result = parse_preferences_from_str("port: [[[");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_parse_preferences_unknown_field_rejected() {
        let result = parse_preferences_from_str("bogus_field: 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = load_preferences(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.yaml");

        let prefs = Preferences {
            remote_access: true,
            api_key: Some("umcp_feed".to_string()),
            verbose_logging: true,
            port: 8082,
        };

        save_preferences(&path, &prefs).unwrap();
        let loaded = load_preferences(&path).unwrap();
        assert_eq!(loaded, prefs);
    }
}
