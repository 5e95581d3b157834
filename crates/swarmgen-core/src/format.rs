//! Prompt formatting.
//!
//! Every backend normalizes prompts through the same pure transformation
//! before anything touches the network or disk. Record/replay equality is
//! defined over this output, so the fold below must stay byte-stable:
//! consecutive turns that resolve to the same role merge into one message
//! with their texts joined by a newline, in turn order.

use crate::message::{Message, Role};
use crate::prompt::Prompt;

/// Formats prompts into role-tagged message lists.
///
/// Holds the optional system prompt so backend call sites stay uniform.
#[derive(Debug, Clone, Default)]
pub struct PromptFormatter {
    system_prompt: Option<String>,
}

impl PromptFormatter {
    /// Create a formatter with no system prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter that prepends a system message to every prompt.
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
        }
    }

    /// The configured system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Format a prompt into an ordered message list.
    ///
    /// A plain-text prompt becomes a single user message. A dialogue is
    /// folded: a role switch flushes the buffered message, and the final
    /// buffer is always flushed. An empty dialogue yields only the
    /// optional system message.
    pub fn format(&self, prompt: &Prompt) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }

        match prompt {
            Prompt::Text(text) => messages.push(Message::user(text.clone())),
            Prompt::Dialogue(turns) => {
                let mut buffer: Vec<&str> = Vec::new();
                let mut buffered_role: Option<Role> = None;

                for turn in turns {
                    let role = turn.speaker.as_role();
                    if let Some(prev) = buffered_role {
                        if prev != role {
                            messages.push(Message {
                                role: prev,
                                content: buffer.join("\n"),
                            });
                            buffer.clear();
                        }
                    }
                    buffer.push(&turn.text);
                    buffered_role = Some(role);
                }

                if let Some(role) = buffered_role {
                    messages.push(Message {
                        role,
                        content: buffer.join("\n"),
                    });
                }
            }
        }

        messages
    }
}
