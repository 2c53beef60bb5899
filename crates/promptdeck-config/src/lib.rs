//! Configuration models and layered config loading.
//!
//! This crate owns the promptdeck config schema, the layer-merging logic
//! used by the TUI, and the on-disk credential store that gates chat access.

mod credentials;
mod error;
mod loader;
mod model;

/// Credential persistence for the chat API key.
pub use credentials::CredentialStore;
/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader entry points.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig};
/// Configuration schema models.
pub use model::*;
