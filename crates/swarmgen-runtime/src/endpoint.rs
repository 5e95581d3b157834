//! The swarm endpoint descriptor.
//!
//! An external discovery mechanism writes a small JSON state file naming
//! the endpoint base URL and model. It is read once at backend
//! construction and never mutated; a missing or malformed file is a fatal
//! configuration error, not something to recover from.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::backend::GeneratorError;

/// Endpoint descriptor produced by swarm discovery.
///
/// `endpoint` is the base URL without the `/v1` suffix; the client
/// appends it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwarmState {
    /// Base URL of the serving endpoint
    pub endpoint: String,

    /// Model name to request
    pub model: String,
}

impl SwarmState {
    /// Load the descriptor from a JSON state file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeneratorError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Configuration(format!(
                "state file {} not readable: {}",
                path.display(),
                e
            ))
        })?;
        let state: SwarmState = serde_json::from_str(&contents).map_err(|e| {
            GeneratorError::Configuration(format!(
                "state file {} is malformed: {}",
                path.display(),
                e
            ))
        })?;
        state.validate(path)?;
        Ok(state)
    }

    fn validate(&self, path: &Path) -> Result<(), GeneratorError> {
        if self.endpoint.is_empty() || self.model.is_empty() {
            return Err(GeneratorError::Configuration(format!(
                "state file {} must set non-empty 'endpoint' and 'model'",
                path.display()
            )));
        }
        Ok(())
    }

    /// URL of the chat-completions route.
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.endpoint.trim_end_matches('/')
        )
    }
}
