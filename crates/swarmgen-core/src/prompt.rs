//! The prompt data model.
//!
//! A [`Prompt`] is either a plain string or an ordered dialogue of
//! [`Turn`]s. Host frameworks often hand prompts over as untyped JSON;
//! [`Prompt::from_value`] is the single validation boundary, so the rest
//! of the crate never needs runtime type checks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Role;

/// Errors from prompt validation.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("prompt is neither a string nor a turn sequence (got {found}): {detail}")]
    TypeMismatch { found: &'static str, detail: String },
}

/// Speaker tag of a dialogue turn.
///
/// Only `BOT` resolves to the assistant role; every other speaker is
/// presented to the endpoint as user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Speaker {
    Human,
    Bot,
    System,
}

impl Speaker {
    /// The chat role this speaker resolves to when formatting.
    pub fn as_role(&self) -> Role {
        match self {
            Speaker::Bot => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One utterance in a multi-turn dialogue prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    #[serde(rename = "role")]
    pub speaker: Speaker,

    /// The turn text
    #[serde(rename = "prompt")]
    pub text: String,
}

impl Turn {
    /// Create a turn.
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// A single input to a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    /// A plain string prompt
    Text(String),

    /// An ordered multi-turn dialogue
    Dialogue(Vec<Turn>),
}

impl Prompt {
    /// Create a plain-text prompt.
    pub fn text(text: impl Into<String>) -> Self {
        Prompt::Text(text.into())
    }

    /// Create a dialogue prompt.
    pub fn dialogue(turns: impl Into<Vec<Turn>>) -> Self {
        Prompt::Dialogue(turns.into())
    }

    /// Validate an untyped JSON value into a prompt.
    ///
    /// This is the type boundary: anything that is not a string or a
    /// well-formed turn sequence fails here, not deeper in the formatter.
    pub fn from_value(value: serde_json::Value) -> Result<Self, PromptError> {
        let found = json_kind(&value);
        serde_json::from_value(value).map_err(|e| PromptError::TypeMismatch {
            found,
            detail: e.to_string(),
        })
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::Text(text.to_string())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::Text(text)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
