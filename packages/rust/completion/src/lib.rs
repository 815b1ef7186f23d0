//! Completion service seam for lessonpath.
//!
//! The rest of the workspace talks to a language model only through
//! [`CompletionService::complete`]. [`OpenRouterClient`] is the production
//! implementation; tests substitute their own.

mod client;
mod error;
mod openrouter;

pub use client::{CompletionService, PromptRequest, SYSTEM_INSTRUCTION};
pub use error::CompletionError;
pub use openrouter::OpenRouterClient;
