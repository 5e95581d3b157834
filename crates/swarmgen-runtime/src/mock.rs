//! Fixed-output backend for harness smoke tests.

use async_trait::async_trait;
use swarmgen_core::Prompt;

use crate::backend::{GeneratorError, TextGenerator};

/// The sentinel completion returned for every prompt.
pub const MOCK_COMPLETION: &str = "\\boxed{3}";

/// Backend that answers every prompt with [`MOCK_COMPLETION`].
///
/// No state and no failure modes; exists so the surrounding harness can
/// be exercised without an endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator;

impl MockGenerator {
    /// Create a mock backend.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        prompts: &[Prompt],
        _max_out_len: u32,
    ) -> Result<Vec<String>, GeneratorError> {
        Ok(vec![MOCK_COMPLETION.to_string(); prompts.len()])
    }

    fn name(&self) -> &str {
        "mock"
    }
}
