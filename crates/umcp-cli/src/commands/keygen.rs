use anyhow::{Context, Result};
use umcp_config::{load_preferences, preferences_path, save_preferences};
use umcp_runtime::generate_api_key;

pub fn execute() -> Result<()> {
    let path = preferences_path().context("Failed to locate the preferences file")?;
    let mut prefs = load_preferences(&path).context("Failed to load preferences")?;

    let key = generate_api_key();
    prefs.api_key = Some(key.clone());
    save_preferences(&path, &prefs).context("Failed to save preferences")?;

    println!("API key: {}", key);
    println!("Saved to {}", path.display());
    println!();
    println!("Clients must send it as: Authorization: Bearer {}", key);
    Ok(())
}
