//! Instance labeling and port selection for cloned project checkouts.
//!
//! A secondary checkout whose project directory ends in `_clone_<N>` gets
//! port `base + N + 1` and the label `Clone N`, so several instances of
//! the same project can serve side by side on one machine.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn clone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)_clone_(\d+)$").expect("clone pattern compiles"))
}

/// Clone index of the project, if any path component ends in `_clone_<N>`.
pub fn clone_index(project_root: &Path) -> Option<u32> {
    project_root.components().find_map(|component| {
        let name = component.as_os_str().to_str()?;
        clone_pattern()
            .captures(name)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    })
}

/// Effective port for this instance. Port 0 (ephemeral) is never shifted.
pub fn select_port(base: u16, project_root: Option<&Path>) -> u16 {
    if base == 0 {
        return 0;
    }
    match project_root.and_then(clone_index) {
        Some(n) => base.saturating_add(n as u16).saturating_add(1),
        None => base,
    }
}

/// Human-readable instance label: `Host` or `Clone N`.
pub fn instance_label(project_root: Option<&Path>) -> String {
    match project_root.and_then(clone_index) {
        Some(n) => format!("Clone {}", n),
        None => "Host".to_string(),
    }
}
