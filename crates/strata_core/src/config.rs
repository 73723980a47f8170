//! Per-layer tool configuration (`config.yaml`).
//!
//! Configuration files are resolved across the same layers as values and
//! deep-merged before deserializing, so a cluster can override the
//! project-wide secret settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::CoreResult;
use crate::layers::{resolve, FindMode, Selector};
use crate::merge::{merge_all, MergePolicy};
use crate::project::CONFIG_FILE;

/// Secret lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretsConfig {
    /// Provider name; only environment variable lookup is built in.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Prefix prepended to every secret key before lookup.
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_provider() -> String {
    "env".to_string()
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            prefix: None,
        }
    }
}

/// Tool configuration assembled across layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub secrets: SecretsConfig,
}

/// Load and merge every layer's `config.yaml` for the selection.
///
/// Layers without a config file simply contribute nothing; a project with
/// no config at all gets the defaults.
pub fn load(root: &Path, selector: &Selector, policy: MergePolicy) -> CoreResult<Config> {
    let layers = resolve(root, selector, CONFIG_FILE, FindMode::FILES)?;

    let mut docs = Vec::new();
    for layer in &layers {
        let content = fs::read_to_string(&layer.path)?;
        if content.trim().is_empty() {
            continue;
        }
        docs.push(serde_yaml::from_str::<Value>(&content)?);
    }

    let merged = merge_all(policy, docs);
    Ok(serde_yaml::from_value(merged)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn defaults_without_any_config_file() {
        let temp = tempdir().unwrap();
        let config = load(temp.path(), &Selector::default(), MergePolicy::Override).unwrap();
        assert_eq!(config.secrets.provider, "env");
        assert_eq!(config.secrets.prefix, None);
    }

    #[test]
    fn cluster_config_overrides_root() {
        let temp = tempdir().unwrap();
        write(temp.path(), "config.yaml", "secrets: {prefix: APP_}\n");
        write(
            temp.path(),
            "clusters/alpha/config.yaml",
            "secrets: {prefix: ALPHA_}\n",
        );

        let root_config =
            load(temp.path(), &Selector::default(), MergePolicy::Override).unwrap();
        assert_eq!(root_config.secrets.prefix.as_deref(), Some("APP_"));

        let cluster_config = load(
            temp.path(),
            &Selector::new(Some("alpha".into()), None),
            MergePolicy::Override,
        )
        .unwrap();
        assert_eq!(cluster_config.secrets.prefix.as_deref(), Some("ALPHA_"));
        // Unset fields fall back to the merged defaults.
        assert_eq!(cluster_config.secrets.provider, "env");
    }
}
