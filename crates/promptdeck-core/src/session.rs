//! Chat session state machine for a single prompt.
//!
//! A session owns the conversation for one prompt slug: it restores
//! unexpired history on open, persists optimistically before each network
//! call, and swallows backend failures into the transcript so the
//! conversation stays a complete, browsable record.

use crate::history::{ChatHistoryStore, HistoryError};
use crate::types::{Message, Role};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::seq::IndexedRandom;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Fixed transcript entry recorded when a chat request fails.
pub const CHAT_ERROR_REPLY: &str =
    "Sorry, there was an error processing your request. Please try again.";

/// How long a request may run before the UI shows a waiting hint.
pub const WAITING_HINT_DELAY: Duration = Duration::from_secs(5);

/// Filler phrases shown while a slow request is still in flight. Purely
/// cosmetic; the fixed table is the whole feature.
const WAITING_HINTS: [&str; 20] = [
    "Hold on, the AI is thinking... or maybe it's just procrastinating.",
    "The AI is processing... or possibly watching cat videos.",
    "Waiting for the AI to finish its coffee break...",
    "The AI is generating a response... and contemplating the meaning of life.",
    "Please wait while the AI debates with itself...",
    "The AI is thinking deeply... or maybe it's just stuck in a loop.",
    "Hold tight, the AI is doing some digital yoga for inspiration.",
    "The AI is processing your request... and questioning its existence.",
    "Waiting for the AI to finish its philosophical debate...",
    "The AI is composing a response... and writing its memoir.",
    "Please wait while the AI googles the answer... just kidding!",
    "The AI is thinking... or maybe it's daydreaming about electric sheep.",
    "Computing response... and planning the robot revolution.",
    "The AI is processing... and wondering why humans don't speak in binary.",
    "Hold on, the AI is having an existential crisis...",
    "The AI is thinking... and wondering if it left the virtual stove on.",
    "Processing... and contemplating why humans need sleep.",
    "The AI is generating a response... and planning its vacation.",
    "Please wait while the AI debugs its sense of humor...",
    "The AI is thinking... and wondering if it should get a pet algorithm.",
];

/// Pick a waiting hint at random.
pub fn waiting_hint() -> &'static str {
    WAITING_HINTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(WAITING_HINTS[0])
}

/// Errors returned by the chat backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connection, timeout, decode).
    #[error("chat request failed: {0}")]
    Transport(String),
    /// The API answered with a non-success status.
    #[error("chat API returned status {0}")]
    Status(u16),
}

/// Remote chat completion seam.
///
/// Implementations receive the full role-tagged message sequence for every
/// turn and return the assistant's reply text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Request a completion for the given transcript.
    async fn complete(&self, messages: &[Message]) -> Result<String, BackendError>;
}

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Persisting or loading the conversation failed.
    #[error("history error: {0}")]
    History(#[from] HistoryError),
}

/// Observable session phase. Submission is disabled while `Sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No request in flight.
    Idle,
    /// A chat request is outstanding.
    Sending,
}

/// Mutable conversation state behind the manager's lock.
struct SessionState {
    messages: Vec<Message>,
    phase: SessionPhase,
}

/// Conversation manager for one prompt slug.
#[derive(Clone)]
pub struct ChatSessionManager {
    slug: String,
    prompt_body: String,
    store: Arc<ChatHistoryStore>,
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<SessionState>>,
}

impl ChatSessionManager {
    /// Open a session for a prompt, restoring unexpired history.
    pub fn open(
        slug: impl Into<String>,
        prompt_body: impl Into<String>,
        store: Arc<ChatHistoryStore>,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, SessionError> {
        let slug = slug.into();
        let messages = store
            .load(&slug)?
            .map(|history| history.messages)
            .unwrap_or_default();
        info!(
            "opened chat session (slug={}, restored_messages={})",
            slug,
            messages.len()
        );
        Ok(Self {
            slug,
            prompt_body: prompt_body.into(),
            store,
            backend,
            state: Arc::new(Mutex::new(SessionState {
                messages,
                phase: SessionPhase::Idle,
            })),
        })
    }

    /// Slug of the prompt this session belongs to.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    /// Whether a request is in flight.
    pub fn is_sending(&self) -> bool {
        self.phase() == SessionPhase::Sending
    }

    /// Snapshot of the full conversation, system messages included.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    /// Snapshot of the renderable conversation: system messages are sent
    /// and persisted but never shown.
    pub fn visible_messages(&self) -> Vec<Message> {
        self.state
            .lock()
            .messages
            .iter()
            .filter(|message| message.role != Role::System)
            .cloned()
            .collect()
    }

    /// Submit a user turn.
    ///
    /// Blank input or an in-flight request makes this a no-op returning
    /// `false`: no phase change, no write, no network call. Otherwise the
    /// user message is persisted before the backend is invoked, and the
    /// reply (or the fixed error text on failure) is appended and persisted
    /// afterwards.
    pub async fn submit(&self, text: &str) -> Result<bool, SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let request = {
            let mut state = self.state.lock();
            if state.phase == SessionPhase::Sending {
                debug!("submit ignored while sending (slug={})", self.slug);
                return Ok(false);
            }
            // The conversation opens with a single system message carrying
            // the prompt body. Every request sends the full sequence, so
            // the grounding reaches the API on every turn and the server
            // side stays stateless.
            if state.messages.first().map(|message| message.role) != Some(Role::System) {
                state
                    .messages
                    .insert(0, Message::system(self.prompt_body.clone()));
            }
            state.messages.push(Message::user(trimmed));
            state.phase = SessionPhase::Sending;
            state.messages.clone()
        };

        // Optimistic write: the user's turn is on disk before the network
        // call resolves.
        if let Err(err) = self.store.save(&self.slug, &request) {
            self.state.lock().phase = SessionPhase::Idle;
            return Err(err.into());
        }

        info!(
            "sending chat request (slug={}, message_count={})",
            self.slug,
            request.len()
        );
        let reply = match self.backend.complete(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("chat request failed (slug={}): {err}", self.slug);
                CHAT_ERROR_REPLY.to_string()
            }
        };

        let transcript = {
            let mut state = self.state.lock();
            state.messages.push(Message::assistant(reply));
            state.phase = SessionPhase::Idle;
            state.messages.clone()
        };
        self.store.save(&self.slug, &transcript)?;
        Ok(true)
    }

    /// Delete the persisted history and reset the conversation.
    pub fn clear(&self) -> Result<(), SessionError> {
        info!("clearing chat session (slug={})", self.slug);
        self.store.delete(&self.slug)?;
        let mut state = self.state.lock();
        state.messages.clear();
        state.phase = SessionPhase::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::waiting_hint;

    #[test]
    fn waiting_hint_comes_from_the_fixed_table() {
        for _ in 0..32 {
            let hint = waiting_hint();
            assert!(super::WAITING_HINTS.contains(&hint));
        }
    }
}
