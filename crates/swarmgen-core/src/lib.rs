//! # swarmgen-core
//!
//! Deterministic prompt/message data model for swarmgen backends.
//!
//! This crate holds everything the generation backends share that does not
//! touch the network or disk:
//! - the [`Prompt`] sum type and its validation boundary
//! - the [`PromptFormatter`] that folds dialogues into role-tagged
//!   [`Message`] lists
//! - the persisted record formats used by record/replay runs
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: formatting the same prompt always produces the
//!    same message list
//! 2. **No I/O**: every function here is a pure transformation
//! 3. **Replay-stable**: record equality is defined over these types, so
//!    their serialized forms are part of the on-disk contract
//!
//! ## Example
//!
//! ```rust
//! use swarmgen_core::{Message, Prompt, PromptFormatter, Speaker, Turn};
//!
//! let formatter = PromptFormatter::with_system_prompt("Be terse.");
//! let prompt = Prompt::dialogue(vec![
//!     Turn::new(Speaker::Human, "Hi"),
//!     Turn::new(Speaker::Human, "Anyone there?"),
//!     Turn::new(Speaker::Bot, "Hello!"),
//! ]);
//!
//! let messages = formatter.format(&prompt);
//! assert_eq!(messages[1], Message::user("Hi\nAnyone there?"));
//! ```

pub mod format;
pub mod message;
pub mod prompt;
pub mod record;

// Re-export main types at crate root
pub use format::PromptFormatter;
pub use message::{Message, Role};
pub use prompt::{Prompt, PromptError, Speaker, Turn};
pub use record::{strip_thinking, PromptRecord, ResponseRecord, THINK_CLOSE};
