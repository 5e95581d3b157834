//! Persisted record formats for record/replay runs.
//!
//! Prompts and responses live in two line-delimited JSON files in strict
//! positional correspondence: the Nth prompt line pairs with the Nth
//! response line.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Closing marker of a reasoning segment in a cached completion.
pub const THINK_CLOSE: &str = "</think>";

/// One line of the prompts file: a formatted message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub messages: Vec<Message>,
}

impl PromptRecord {
    /// Wrap a formatted message list.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// One line of the responses file: the cached completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub results: String,
}

impl ResponseRecord {
    /// The cached completion with any leading reasoning segment removed.
    pub fn completion(&self) -> &str {
        strip_thinking(&self.results)
    }
}

/// Strip a trailing reasoning segment from a completion.
///
/// Keeps only the text after the last `</think>` marker, trimmed of
/// surrounding whitespace. Text without the marker is returned trimmed.
pub fn strip_thinking(text: &str) -> &str {
    match text.rsplit_once(THINK_CLOSE) {
        Some((_, tail)) => tail.trim(),
        None => text.trim(),
    }
}
