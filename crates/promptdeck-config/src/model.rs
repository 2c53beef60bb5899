//! Configuration schema for promptdeck.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for the promptdeck applications.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptdeckConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

impl PromptdeckConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PromptdeckConfigBuilder {
        PromptdeckConfigBuilder::new()
    }

    /// Resolve the local data directory (chat histories, vote flags,
    /// credentials), defaulting to `~/.promptdeck`.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return PathBuf::from(path);
        }
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(DEFAULT_DATA_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }
}

/// Default data directory name under the user's home.
const DEFAULT_DATA_DIR: &str = ".promptdeck";

/// Builder for assembling a `PromptdeckConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PromptdeckConfigBuilder {
    config: PromptdeckConfig,
}

impl PromptdeckConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: PromptdeckConfig::default(),
        }
    }

    /// Replace the catalog configuration.
    pub fn catalog(mut self, catalog: CatalogConfig) -> Self {
        self.config.catalog = catalog;
        self
    }

    /// Replace the chat API configuration.
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Replace the upvote store configuration.
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Replace the local storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the share link configuration.
    pub fn share(mut self, share: ShareConfig) -> Self {
        self.config.share = share;
        self
    }

    /// Finalize and return the built `PromptdeckConfig`.
    pub fn build(self) -> PromptdeckConfig {
        self.config
    }
}

/// Location of the prompt snapshot directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

/// Default prompts directory relative to the working directory.
fn default_catalog_path() -> String {
    "prompts".to_string()
}

/// Chat completion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            temperature: default_chat_temperature(),
            max_tokens: default_chat_max_tokens(),
        }
    }
}

/// Default chat completion endpoint base.
fn default_chat_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Default model name for completions.
fn default_chat_model() -> String {
    "gpt-4".to_string()
}

/// Default sampling temperature.
fn default_chat_temperature() -> f32 {
    0.7
}

/// Default completion token limit.
fn default_chat_max_tokens() -> u32 {
    1000
}

/// Remote upvote store settings. Upvoting is disabled when no base URL is
/// configured.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl StoreConfig {
    /// Whether a remote store is configured at all.
    pub fn is_configured(&self) -> bool {
        self.base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Local storage root override.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// Base URL used to build shareable prompt links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    #[serde(default = "default_share_base_url")]
    pub base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: default_share_base_url(),
        }
    }
}

/// Default public site base for share links.
fn default_share_base_url() -> String {
    "https://promptdeck.dev".to_string()
}

#[cfg(test)]
mod tests {
    use super::{ChatConfig, PromptdeckConfig, StoreConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_cover_chat_settings() {
        let config = PromptdeckConfig::default();
        assert_eq!(config.chat.base_url, "https://api.openai.com/v1");
        assert_eq!(config.chat.model, "gpt-4");
        assert_eq!(config.chat.temperature, 0.7);
        assert_eq!(config.chat.max_tokens, 1000);
        assert_eq!(config.catalog.path, "prompts");
    }

    #[test]
    fn builder_replaces_sections() {
        let config = PromptdeckConfig::builder()
            .chat(ChatConfig {
                model: "gpt-4o-mini".to_string(),
                ..ChatConfig::default()
            })
            .store(StoreConfig {
                base_url: Some("https://store.example/rest/v1".to_string()),
                api_key: None,
            })
            .build();
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert!(config.store.is_configured());
    }

    #[test]
    fn unconfigured_store_is_detected() {
        let config = PromptdeckConfig::default();
        assert!(!config.store.is_configured());
        let blank = StoreConfig {
            base_url: Some("  ".to_string()),
            api_key: None,
        };
        assert!(!blank.is_configured());
    }
}
