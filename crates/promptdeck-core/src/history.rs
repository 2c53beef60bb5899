//! Chat history persistence, one JSON record per prompt slug.
//!
//! Records mirror the wire shape
//! `{"messages": [...], "lastUpdated": <epoch ms>}`. A record older than
//! 24 hours is expired: it is deleted and treated as absent on the next
//! load. Corrupt records are deleted silently so a damaged file can never
//! wedge a conversation.

use crate::types::{Message, epoch_ms_now};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Age in milliseconds after which a chat record expires.
pub const CHAT_EXPIRY_MS: i64 = 24 * 60 * 60 * 1000;

/// Milliseconds per day, used by the purge threshold.
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Errors returned by the chat history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persisted conversation record for one prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatHistory {
    /// Ordered transcript, including system messages.
    pub messages: Vec<Message>,
    /// Epoch milliseconds of the last write.
    #[serde(rename = "lastUpdated")]
    pub last_updated: i64,
}

/// File-backed chat history store keyed by prompt slug.
pub struct ChatHistoryStore {
    /// Root directory holding one `<slug>.json` per conversation.
    root: PathBuf,
    /// Serialize write access to record files.
    write_lock: Mutex<()>,
}

impl ChatHistoryStore {
    /// Create a store under the given root, creating it if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized chat history store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Build the record path for a slug.
    fn record_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}.json"))
    }

    /// Load the conversation for a slug, discarding expired or corrupt
    /// records.
    pub fn load(&self, slug: &str) -> Result<Option<ChatHistory>, HistoryError> {
        self.load_at(slug, epoch_ms_now())
    }

    /// Load relative to an explicit clock reading.
    fn load_at(&self, slug: &str, now_ms: i64) -> Result<Option<ChatHistory>, HistoryError> {
        let path = self.record_path(slug);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(HistoryError::Io(err)),
        };
        let history: ChatHistory = match serde_json::from_str(&contents) {
            Ok(history) => history,
            Err(err) => {
                warn!("removing corrupt chat record (slug={slug}): {err}");
                let _guard = self.write_lock.lock();
                fs::remove_file(&path)?;
                return Ok(None);
            }
        };
        if is_expired(history.last_updated, now_ms) {
            debug!(
                "discarding expired chat record (slug={slug}, last_updated={})",
                history.last_updated
            );
            let _guard = self.write_lock.lock();
            fs::remove_file(&path)?;
            return Ok(None);
        }
        Ok(Some(history))
    }

    /// Overwrite the conversation for a slug, stamping the current time.
    pub fn save(&self, slug: &str, messages: &[Message]) -> Result<(), HistoryError> {
        self.save_at(slug, messages, epoch_ms_now())
    }

    /// Overwrite with an explicit timestamp.
    fn save_at(&self, slug: &str, messages: &[Message], now_ms: i64) -> Result<(), HistoryError> {
        let history = ChatHistory {
            messages: messages.to_vec(),
            last_updated: now_ms,
        };
        debug!(
            "saving chat record (slug={slug}, message_count={})",
            history.messages.len()
        );
        let _guard = self.write_lock.lock();
        let path = self.record_path(slug);
        let temp_path = self.root.join(format!("{slug}.json.tmp"));
        fs::write(&temp_path, serde_json::to_string(&history)?)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Delete the conversation for a slug.
    pub fn delete(&self, slug: &str) -> Result<bool, HistoryError> {
        let path = self.record_path(slug);
        let _guard = self.write_lock.lock();
        if path.exists() {
            info!("deleting chat record (slug={slug})");
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove records whose last update is older than the given number of
    /// days. Corrupt records are removed regardless of age. Returns the
    /// number of records removed.
    pub fn purge_older_than(&self, days: u32) -> Result<usize, HistoryError> {
        let cutoff = epoch_ms_now() - i64::from(days) * DAY_MS;
        self.purge_where(|history| match history {
            Some(history) => history.last_updated < cutoff,
            None => true,
        })
    }

    /// Remove every record. Returns the number of records removed.
    pub fn purge_all(&self) -> Result<usize, HistoryError> {
        self.purge_where(|_| true)
    }

    /// Remove record files selected by the predicate, which receives
    /// `None` for records that fail to parse.
    fn purge_where(
        &self,
        should_remove: impl Fn(Option<&ChatHistory>) -> bool,
    ) -> Result<usize, HistoryError> {
        let _guard = self.write_lock.lock();
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let history = fs::read_to_string(&path)
                .ok()
                .and_then(|contents| serde_json::from_str::<ChatHistory>(&contents).ok());
            if should_remove(history.as_ref()) {
                debug!("purging chat record: {}", path.display());
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!("purged chat records (removed={removed})");
        Ok(removed)
    }

    /// Slugs with a record currently on disk (expired or not).
    pub fn stored_slugs(&self) -> Result<Vec<String>, HistoryError> {
        let mut slugs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                slugs.push(stem.to_string());
            }
        }
        slugs.sort();
        Ok(slugs)
    }
}

/// Whether a record written at `last_updated` has expired by `now_ms`.
fn is_expired(last_updated: i64, now_ms: i64) -> bool {
    now_ms - last_updated >= CHAT_EXPIRY_MS
}

#[cfg(test)]
mod tests {
    use super::{CHAT_EXPIRY_MS, ChatHistory, ChatHistoryStore, is_expired};
    use crate::types::{Message, epoch_ms_now};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn expiry_boundary_is_inclusive() {
        let written = 1_000_000;
        assert!(!is_expired(written, written + CHAT_EXPIRY_MS - 1));
        assert!(is_expired(written, written + CHAT_EXPIRY_MS));
        assert!(is_expired(written, written + CHAT_EXPIRY_MS + 1));
    }

    #[test]
    fn save_load_round_trip_preserves_order() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        let messages = vec![
            Message::system("prompt body"),
            Message::user("Write a follow-up email"),
            Message::assistant("Here is a draft..."),
        ];
        store.save("email-draft", &messages).expect("save");

        let history = store.load("email-draft").expect("load").expect("record");
        assert_eq!(history.messages, messages);
    }

    #[test]
    fn expired_record_is_discarded_and_removed() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        let stale = ChatHistory {
            messages: vec![Message::user("hello")],
            last_updated: epoch_ms_now() - CHAT_EXPIRY_MS - 1,
        };
        std::fs::write(
            temp.path().join("old-chat.json"),
            serde_json::to_string(&stale).expect("serialize"),
        )
        .expect("write");

        assert_eq!(store.load("old-chat").expect("load"), None);
        assert!(!temp.path().join("old-chat.json").exists());
    }

    #[test]
    fn fresh_record_survives_load() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        let fresh = ChatHistory {
            messages: vec![Message::user("hello")],
            last_updated: epoch_ms_now() - CHAT_EXPIRY_MS / 2,
        };
        std::fs::write(
            temp.path().join("recent.json"),
            serde_json::to_string(&fresh).expect("serialize"),
        )
        .expect("write");

        let loaded = store.load("recent").expect("load").expect("record");
        assert_eq!(loaded.messages, fresh.messages);
    }

    #[test]
    fn corrupt_record_is_removed_silently() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        std::fs::write(temp.path().join("bad.json"), "{not json").expect("write");

        assert_eq!(store.load("bad").expect("load"), None);
        assert!(!temp.path().join("bad.json").exists());
    }

    #[test]
    fn purge_by_age_leaves_newer_records() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        let now = epoch_ms_now();
        let old = ChatHistory {
            messages: vec![Message::user("old")],
            last_updated: now - 8 * 24 * 60 * 60 * 1000,
        };
        let new = ChatHistory {
            messages: vec![Message::user("new")],
            last_updated: now - 60_000,
        };
        std::fs::write(
            temp.path().join("old.json"),
            serde_json::to_string(&old).expect("serialize"),
        )
        .expect("write");
        std::fs::write(
            temp.path().join("new.json"),
            serde_json::to_string(&new).expect("serialize"),
        )
        .expect("write");

        let removed = store.purge_older_than(7).expect("purge");
        assert_eq!(removed, 1);
        assert_eq!(store.stored_slugs().expect("slugs"), vec!["new"]);
    }

    #[test]
    fn purge_all_removes_everything() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        store.save("a", &[Message::user("a")]).expect("save");
        store.save("b", &[Message::user("b")]).expect("save");

        let removed = store.purge_all().expect("purge");
        assert_eq!(removed, 2);
        assert!(store.stored_slugs().expect("slugs").is_empty());
    }

    #[test]
    fn persisted_shape_uses_last_updated_key() {
        let temp = tempdir().expect("tempdir");
        let store = ChatHistoryStore::new(temp.path()).expect("store");
        store.save("shape", &[Message::user("hi")]).expect("save");

        let raw = std::fs::read_to_string(temp.path().join("shape.json")).expect("read");
        assert!(raw.contains("\"lastUpdated\""), "raw record: {raw}");
        assert!(raw.contains("\"messages\""), "raw record: {raw}");
    }
}
