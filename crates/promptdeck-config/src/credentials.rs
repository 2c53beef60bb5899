//! Persistent storage for the user-supplied chat API credential.
//!
//! The credential lives in a single JSON file under the data directory and
//! stays on disk until the user forgets it. Chat access is gated on its
//! presence; no other component ever reads it.

use crate::ConfigError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CREDENTIALS_FILENAME: &str = "credentials.json";

/// On-disk credential record.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    chat_api_key: Option<String>,
}

/// File-backed store for the chat API credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at the given data directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            path: root.join(CREDENTIALS_FILENAME),
        })
    }

    /// Return the stored credential, if any non-blank value is present.
    pub fn get(&self) -> Result<Option<String>, ConfigError> {
        let record = self.read_record()?;
        Ok(record
            .chat_api_key
            .filter(|value| !value.trim().is_empty()))
    }

    /// Persist a credential. A blank value clears the stored credential,
    /// matching the behavior of saving an empty key in the settings form.
    pub fn set(&self, credential: &str) -> Result<(), ConfigError> {
        let trimmed = credential.trim();
        if trimmed.is_empty() {
            return self.forget();
        }
        info!("storing chat credential (len={})", trimmed.len());
        self.write_record(&CredentialRecord {
            chat_api_key: Some(trimmed.to_string()),
        })
    }

    /// Remove the stored credential.
    pub fn forget(&self) -> Result<(), ConfigError> {
        info!("forgetting chat credential");
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Read the record, treating a missing or corrupt file as empty.
    fn read_record(&self) -> Result<CredentialRecord, ConfigError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CredentialRecord::default());
            }
            Err(err) => return Err(ConfigError::ReadFailed(err)),
        };
        match serde_json::from_str(&contents) {
            Ok(record) => Ok(record),
            Err(err) => {
                debug!("discarding corrupt credential file: {err}");
                Ok(CredentialRecord::default())
            }
        }
    }

    /// Rewrite the record atomically via a temp file.
    fn write_record(&self, record: &CredentialRecord) -> Result<(), ConfigError> {
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(record)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CredentialStore;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn set_get_forget_round_trip() {
        let root = tempdir().expect("root");
        let store = CredentialStore::new(root.path()).expect("store");
        assert_eq!(store.get().expect("get"), None);

        store.set("  sk-test-123  ").expect("set");
        assert_eq!(store.get().expect("get"), Some("sk-test-123".to_string()));

        let reopened = CredentialStore::new(root.path()).expect("store");
        assert_eq!(
            reopened.get().expect("get"),
            Some("sk-test-123".to_string())
        );

        store.forget().expect("forget");
        assert_eq!(store.get().expect("get"), None);
    }

    #[test]
    fn blank_value_clears_credential() {
        let root = tempdir().expect("root");
        let store = CredentialStore::new(root.path()).expect("store");
        store.set("sk-test").expect("set");
        store.set("   ").expect("clear");
        assert_eq!(store.get().expect("get"), None);
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let root = tempdir().expect("root");
        let store = CredentialStore::new(root.path()).expect("store");
        std::fs::write(root.path().join("credentials.json"), "not-json").expect("write");
        assert_eq!(store.get().expect("get"), None);
    }
}
