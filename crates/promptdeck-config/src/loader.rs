//! Layered configuration loader.
//!
//! Discovers configuration layers (user, working directory), merges them
//! with a deep JSON merge, and produces a final `PromptdeckConfig`.

use crate::{ConfigError, PromptdeckConfig};
use directories::UserDirs;
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "promptdeck.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".promptdeck";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged config.
    pub config: PromptdeckConfig,
    /// Metadata for each layer found during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

impl PromptdeckConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load a layered config stack from the default layer locations.
    ///
    /// Layer precedence (low -> high): user (`~/.promptdeck/promptdeck.json5`),
    /// cwd (`./promptdeck.json5`). Missing layers are skipped.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        let cwd = cwd.as_ref();
        info!("loading layered config (cwd={})", cwd.display());

        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());

        let candidates = [
            (ConfigLayerSource::User, default_user_config_path()),
            (ConfigLayerSource::Cwd, Some(cwd.join(DEFAULT_CONFIG_FILE))),
        ];
        for (source, path) in candidates {
            let Some(path) = path else { continue };
            if !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            debug!(
                "loading config layer (source={:?}, path={})",
                source,
                path.display()
            );
            let contents = fs::read_to_string(&path)?;
            let value: Value = json5::from_str(&contents)?;
            merge_json_values(&mut merged, &value);
            layers.push(ConfigLayer { source, path });
        }

        let config: PromptdeckConfig = serde_json::from_value(merged)?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }
}

/// Default user config path under the home directory.
fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

/// Merge overlay values into the base, recursively overriding objects.
fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use crate::PromptdeckConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_json5_with_defaults() {
        let config = PromptdeckConfig::load_from_str(
            r#"{
                // comments are allowed
                chat: { model: "gpt-4o" },
            }"#,
        )
        .expect("config");
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.chat.max_tokens, 1000);
    }

    #[test]
    fn merge_overrides_nested_keys_only() {
        let mut base = json!({"chat": {"model": "gpt-4", "max_tokens": 1000}});
        let overlay = json!({"chat": {"model": "gpt-4o"}});
        merge_json_values(&mut base, &overlay);
        assert_eq!(
            base,
            json!({"chat": {"model": "gpt-4o", "max_tokens": 1000}})
        );
    }

    #[test]
    fn invalid_contents_error() {
        let err = PromptdeckConfig::load_from_str("{ chat: [1, 2] }").expect_err("invalid");
        let message = err.to_string();
        assert!(message.contains("config"), "unexpected error: {message}");
    }
}
