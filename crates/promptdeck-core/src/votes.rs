//! Upvote plumbing: the remote store seam, the local vote guard, and the
//! combined upvoter used by the UI.
//!
//! The guard is a UX nudge, not an integrity control: it only stops this
//! client from upvoting the same prompt twice, and clearing local state
//! defeats it.

use crate::types::epoch_ms_now;
use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Lifetime of a local vote flag: 365 days.
const VOTE_FLAG_TTL_MS: i64 = 365 * 24 * 60 * 60 * 1000;

const VOTES_FILENAME: &str = "votes.json";

/// Errors returned by the remote upvote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure.
    #[error("upvote store request failed: {0}")]
    Request(String),
    /// The store answered with a non-success status.
    #[error("upvote store returned status {0}")]
    Status(u16),
    /// The store returned a payload we could not decode.
    #[error("invalid upvote store response: {0}")]
    Decode(String),
}

/// Remote upvote counter seam.
///
/// `upvote` is a read-modify-write against shared state: concurrent clients
/// can lose updates, which is accepted. Callers re-fetch via `load_all`
/// after mutating to resynchronize.
#[async_trait]
pub trait UpvoteStore: Send + Sync {
    /// Fetch the full slug-to-count mapping. Missing slugs mean zero.
    async fn load_all(&self) -> Result<HashMap<String, u64>, StoreError>;
    /// Create the record with count 1, or increment an existing one.
    async fn upvote(&self, slug: &str) -> Result<(), StoreError>;
}

/// Errors returned by the local vote guard.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Client-local flag store preventing repeat upvotes per prompt.
///
/// Flags are kept in a single JSON file mapping slug to expiry time and are
/// rewritten atomically. Expired flags are dropped on load and ignored on
/// lookup.
pub struct VoteGuard {
    path: PathBuf,
    flags: Mutex<HashMap<String, i64>>,
}

impl VoteGuard {
    /// Open the guard under the given data directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, VoteError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let path = root.join(VOTES_FILENAME);
        let flags = load_flags(&path);
        info!(
            "loaded vote guard (path={}, flags={})",
            path.display(),
            flags.len()
        );
        Ok(Self {
            path,
            flags: Mutex::new(flags),
        })
    }

    /// Whether this client already voted for the slug.
    pub fn has_voted(&self, slug: &str) -> bool {
        let now = epoch_ms_now();
        self.flags
            .lock()
            .get(slug)
            .is_some_and(|expires_at| *expires_at > now)
    }

    /// Record a vote with a 365-day expiry.
    pub fn mark_voted(&self, slug: &str) -> Result<(), VoteError> {
        let mut flags = self.flags.lock();
        let now = epoch_ms_now();
        flags.retain(|_, expires_at| *expires_at > now);
        flags.insert(slug.to_string(), now + VOTE_FLAG_TTL_MS);

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_string(&*flags)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// Load flags from disk, dropping expired entries. A corrupt file reads as
/// empty.
fn load_flags(path: &Path) -> HashMap<String, i64> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return HashMap::new(),
    };
    let mut flags: HashMap<String, i64> = match serde_json::from_str(&contents) {
        Ok(flags) => flags,
        Err(err) => {
            warn!("ignoring corrupt vote flags file: {err}");
            return HashMap::new();
        }
    };
    let now = epoch_ms_now();
    flags.retain(|_, expires_at| *expires_at > now);
    flags
}

/// Errors returned by the combined upvoter.
#[derive(Debug, Error)]
pub enum UpvoteError {
    /// The remote store call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Persisting the local vote flag failed.
    #[error("vote guard error: {0}")]
    Guard(#[from] VoteError),
}

/// Guard-aware upvote entry point used by the UI.
pub struct Upvoter {
    guard: VoteGuard,
    store: Arc<dyn UpvoteStore>,
}

impl Upvoter {
    /// Combine a local guard with a remote store.
    pub fn new(guard: VoteGuard, store: Arc<dyn UpvoteStore>) -> Self {
        Self { guard, store }
    }

    /// Whether the guard already holds a live flag for the slug.
    pub fn has_voted(&self, slug: &str) -> bool {
        self.guard.has_voted(slug)
    }

    /// Upvote a prompt once per client.
    ///
    /// Returns `false` without touching the store when the guard already
    /// recorded a vote. The flag is set before the store call resolves,
    /// matching the optimistic ordering of the original flow.
    pub async fn upvote(&self, slug: &str) -> Result<bool, UpvoteError> {
        if self.guard.has_voted(slug) {
            return Ok(false);
        }
        self.guard.mark_voted(slug)?;
        self.store.upvote(slug).await?;
        Ok(true)
    }

    /// Fetch the current counts from the store.
    pub async fn load_all(&self) -> Result<HashMap<String, u64>, UpvoteError> {
        Ok(self.store.load_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreError, UpvoteStore, Upvoter, VOTE_FLAG_TTL_MS, VoteGuard};
    use crate::types::epoch_ms_now;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// In-memory store counting upvotes per slug.
    #[derive(Default)]
    struct MemoryStore {
        counts: Mutex<HashMap<String, u64>>,
    }

    #[async_trait]
    impl UpvoteStore for MemoryStore {
        async fn load_all(&self) -> Result<HashMap<String, u64>, StoreError> {
            Ok(self.counts.lock().clone())
        }

        async fn upvote(&self, slug: &str) -> Result<(), StoreError> {
            *self.counts.lock().entry(slug.to_string()).or_insert(0) += 1;
            Ok(())
        }
    }

    #[test]
    fn guard_round_trips_across_reopen() {
        let temp = tempdir().expect("tempdir");
        let guard = VoteGuard::new(temp.path()).expect("guard");
        assert!(!guard.has_voted("email-draft"));
        guard.mark_voted("email-draft").expect("mark");
        assert!(guard.has_voted("email-draft"));

        let reopened = VoteGuard::new(temp.path()).expect("guard");
        assert!(reopened.has_voted("email-draft"));
        assert!(!reopened.has_voted("other"));
    }

    #[test]
    fn expired_flags_do_not_block() {
        let temp = tempdir().expect("tempdir");
        let expired = epoch_ms_now() - 1;
        let fresh = epoch_ms_now() + VOTE_FLAG_TTL_MS;
        let flags = HashMap::from([
            ("stale".to_string(), expired),
            ("live".to_string(), fresh),
        ]);
        std::fs::write(
            temp.path().join("votes.json"),
            serde_json::to_string(&flags).expect("serialize"),
        )
        .expect("write");

        let guard = VoteGuard::new(temp.path()).expect("guard");
        assert!(!guard.has_voted("stale"));
        assert!(guard.has_voted("live"));
    }

    #[test]
    fn corrupt_flags_file_reads_empty() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("votes.json"), "{oops").expect("write");
        let guard = VoteGuard::new(temp.path()).expect("guard");
        assert!(!guard.has_voted("anything"));
    }

    #[tokio::test]
    async fn upvoter_increments_once_per_client() {
        let temp = tempdir().expect("tempdir");
        let store = Arc::new(MemoryStore::default());
        let upvoter = Upvoter::new(VoteGuard::new(temp.path()).expect("guard"), store.clone());

        assert!(upvoter.upvote("email-draft").await.expect("first"));
        assert!(!upvoter.upvote("email-draft").await.expect("second"));

        let counts = upvoter.load_all().await.expect("load");
        assert_eq!(counts.get("email-draft"), Some(&1));
    }

    #[tokio::test]
    async fn bare_store_increments_every_call() {
        let store = MemoryStore::default();
        store.upvote("email-draft").await.expect("first");
        store.upvote("email-draft").await.expect("second");
        let counts = store.load_all().await.expect("load");
        assert_eq!(counts.get("email-draft"), Some(&2));
    }
}
