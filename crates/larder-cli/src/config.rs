use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from `~/.config/larder/config.toml`. Command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub store: Option<String>,
    /// Units recorded by `item scan` when `--count` is not given.
    #[serde(default)]
    pub default_scan_count: Option<i64>,
}

impl CliConfig {
    /// Load the default config file; a missing file yields defaults.
    pub fn load_default() -> Result<Self, String> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/larder/config.toml"))
}
