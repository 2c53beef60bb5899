//! Core domain logic for promptdeck.
//!
//! Owns the prompt catalog, catalog browsing, chat session state, local
//! chat-history persistence, and the local vote guard. Network access lives
//! behind the [`ChatBackend`] and [`UpvoteStore`] traits so this crate stays
//! free of HTTP code.

pub mod catalog;
pub mod history;
pub mod session;
pub mod types;
pub mod votes;

pub use catalog::{CatalogError, PromptCatalog, SortOrder, browse};
pub use history::{CHAT_EXPIRY_MS, ChatHistory, ChatHistoryStore, HistoryError};
pub use session::{
    BackendError, CHAT_ERROR_REPLY, ChatBackend, ChatSessionManager, SessionError, SessionPhase,
};
pub use types::{Message, Prompt, Role};
pub use votes::{StoreError, UpvoteError, UpvoteStore, Upvoter, VoteError, VoteGuard};
