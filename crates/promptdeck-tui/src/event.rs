//! TUI event types for input and background task results.

use crossterm::event::KeyEvent;
use std::collections::HashMap;

/// Application event emitted by input handlers or background tasks.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Periodic tick event.
    Tick,
    /// Scroll event in the active view.
    Scroll(i16),
    /// Fresh upvote counts fetched from the remote store.
    UpvotesLoaded(HashMap<String, u64>),
    /// A chat turn finished (successfully or with the error swallowed
    /// into the transcript).
    TurnCompleted { slug: String },
    /// Error from a background action.
    ActionError(String),
}
