use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::analyzer::node::NodeOptions;

/// Root configuration structure, deserialized from `.dep-checkr/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub discovery: DiscoveryConfig,
}

/// How Node.js modules are analyzed.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Set to `false` to never run npm and rely on lockfiles or `node_modules`.
    pub allow_npm: bool,
    /// npm binary name or path.
    pub npm: String,
    /// Upper bound on a single `npm ls` run.
    pub timeout_secs: u64,
    pub include_dev: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            allow_npm: true,
            npm: "npm".to_string(),
            timeout_secs: 120,
            include_dev: true,
        }
    }
}

impl NodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn options(&self) -> NodeOptions {
        NodeOptions {
            allow_npm: self.allow_npm,
            include_dev: self.include_dev,
        }
    }
}

/// Which directories `--recursive` skips.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub ignore: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            ignore: vec!["node_modules".to_string(), "bower_components".to_string()],
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.dep-checkr/config.toml`
/// 3. `~/.config/dep-checkr/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read(path);
    }

    let project_config = project_path.join(".dep-checkr").join("config.toml");
    if project_config.exists() {
        return read(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("dep-checkr").join("config.toml");
        if home_config.exists() {
            return read(&home_config);
        }
    }

    Ok(Config::default())
}

fn read(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.node.allow_npm);
        assert_eq!(config.node.npm, "npm");
        assert_eq!(config.node.timeout(), Duration::from_secs(120));
        assert_eq!(config.discovery.ignore, vec!["node_modules", "bower_components"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[node]\nallow_npm = false\n").unwrap();
        assert!(!config.node.allow_npm);
        assert!(config.node.include_dev);
        assert_eq!(config.node.timeout_secs, 120);
        assert_eq!(config.discovery.ignore.len(), 2);
    }

    #[test]
    fn test_project_config_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".dep-checkr")).unwrap();
        std::fs::write(
            dir.path().join(".dep-checkr/config.toml"),
            "[node]\nnpm = \"/opt/node/bin/npm\"\ntimeout_secs = 5\n\n[discovery]\nignore = [\"vendor\"]\n",
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.node.npm, "/opt/node/bin/npm");
        assert_eq!(config.node.timeout(), Duration::from_secs(5));
        assert_eq!(config.discovery.ignore, vec!["vendor"]);
    }

    #[test]
    fn test_override_wins_and_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[node]\ninclude_dev = false\n").unwrap();
        let config = load_config(dir.path(), Some(&path)).unwrap();
        assert!(!config.node.options().include_dev);

        std::fs::write(&path, "[node\n").unwrap();
        assert!(load_config(dir.path(), Some(&path)).is_err());
        assert!(load_config(dir.path(), Some(&dir.path().join("missing.toml"))).is_err());
    }
}
