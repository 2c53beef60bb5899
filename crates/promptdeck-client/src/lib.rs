//! HTTP clients for promptdeck's external services.
//!
//! Implements the `promptdeck-core` seams over reqwest: the chat completion
//! API behind [`ChatCompletionsClient`] and the remote upvote row store
//! behind [`RestUpvoteClient`].

mod chat;
mod upvotes;

pub use chat::ChatCompletionsClient;
pub use upvotes::RestUpvoteClient;
