//! The backend trait and error taxonomy.

use async_trait::async_trait;
use std::time::Duration;
use swarmgen_core::{Prompt, PromptError};
use thiserror::Error;

/// Default maximum output length, in tokens.
pub const DEFAULT_MAX_OUT_LEN: u32 = 512;

/// Errors from generation backends.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Fatal at construction: descriptor file missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transient endpoint timeout. Retried with backoff; fatal to the
    /// batch once retries are exhausted.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Remote error that is not timeout-class. Never retried.
    #[error("endpoint error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport failure before a status was received.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Malformed response or record body.
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// Replay only: the formatted prompt does not match the recorded one.
    #[error("replay prompt mismatch at record {index}: current run formats to {actual}, recorded run had {expected}")]
    Consistency {
        index: usize,
        expected: String,
        actual: String,
    },

    /// Replay only: the batch outran the recorded files.
    #[error("replay records exhausted: batch needs {needed} records, only {available} available")]
    StarvedCursor { needed: usize, available: usize },

    /// A prompt failed boundary validation.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Record file I/O failure.
    #[error("record I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    /// Whether this error is timeout-class and safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeneratorError::Timeout(_))
    }
}

/// A batch text-generation backend.
///
/// # Contract
/// `generate` returns exactly one completion per input prompt, in input
/// order. The batch fails as a unit: no partial results are ever
/// returned alongside an error.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate one completion per prompt.
    async fn generate(
        &self,
        prompts: &[Prompt],
        max_out_len: u32,
    ) -> Result<Vec<String>, GeneratorError>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}
