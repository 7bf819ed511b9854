use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use umcp_config::preferences_path;
use umcp_runtime::cert::{load_or_generate, primary_ipv4, CERT_FILE, KEY_FILE};

pub fn execute(dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => preferences_path()
            .context("Failed to locate the config directory")?
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| anyhow!("Preferences path has no parent directory"))?,
    };

    let material = load_or_generate(&dir).context("Failed to prepare certificate material")?;

    println!("Certificate: {}", dir.join(CERT_FILE).display());
    println!("Private key: {}", dir.join(KEY_FILE).display());
    println!("Certificate PEM is {} bytes", material.cert_pem.len());
    match primary_ipv4() {
        Some(addr) => println!("Covers primary IPv4: {}", addr),
        None => println!("No primary IPv4 detected; loopback names only"),
    }
    Ok(())
}
