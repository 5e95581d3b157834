//! # swarmgen-runtime
//!
//! Batch text-generation backends for evaluation harnesses.
//!
//! Three interchangeable implementations of the [`TextGenerator`]
//! contract:
//! - [`LiveClient`] — concurrent chat completions against a swarm
//!   endpoint, with bounded exponential retry on timeouts
//! - [`RecordReplayStore`] — records prompt batches to a JSONL file, or
//!   replays cached completions after verifying the prompts match the
//!   recorded run
//! - [`MockGenerator`] — fixed sentinel output for smoke tests
//!
//! All three return exactly one completion per prompt, in input order,
//! and fail the whole batch on the first unrecoverable error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use swarmgen_runtime::{LiveClient, LiveConfig, TextGenerator};
//! use swarmgen_core::Prompt;
//!
//! let client = LiveClient::new(
//!     LiveConfig::new("swarm_state.json").with_system_prompt("Be terse."),
//! )?;
//!
//! let prompts = vec![Prompt::text("What is 2 + 2?")];
//! let completions = client.generate(&prompts, 512).await?;
//! assert_eq!(completions.len(), prompts.len());
//! ```

pub mod backend;
pub mod endpoint;
pub mod live;
pub mod mock;
pub mod replay;
pub mod retry;

// Re-export main types at crate root
pub use backend::{GeneratorError, TextGenerator, DEFAULT_MAX_OUT_LEN};
pub use endpoint::SwarmState;
pub use live::{LiveClient, LiveConfig, SWARM_API_KEY_ENV};
pub use mock::{MockGenerator, MOCK_COMPLETION};
pub use replay::{RecordCursor, RecordReplayStore};
pub use retry::RetryPolicy;
