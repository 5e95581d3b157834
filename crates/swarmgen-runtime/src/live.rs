//! Live backend: concurrent chat completions against a swarm endpoint.
//!
//! One request is dispatched per prompt; the whole batch is issued before
//! any result is awaited and the output order matches the input order
//! regardless of completion order. Each request carries its own
//! retry-on-timeout schedule (see [`RetryPolicy`]); any other failure
//! aborts the batch on the first attempt.

use async_trait::async_trait;
use backon::Retryable;
use futures::stream::{self, StreamExt, TryStreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use swarmgen_core::{Message, Prompt, PromptFormatter};

use crate::backend::{GeneratorError, TextGenerator};
use crate::endpoint::SwarmState;
use crate::retry::RetryPolicy;

/// Environment variable holding an optional bearer token for the endpoint.
pub const SWARM_API_KEY_ENV: &str = "SWARM_API_KEY";

/// Configuration for [`LiveClient`].
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Path of the swarm state descriptor file
    pub state_path: PathBuf,

    /// System prompt prepended to every formatted prompt
    pub system_prompt: Option<String>,

    /// Sampling temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Extra body parameters passed through verbatim to the endpoint
    pub extra_body: serde_json::Map<String, serde_json::Value>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Cap on concurrent in-flight requests. `None` issues the whole
    /// batch at once; the caller bounds the batch size.
    pub max_in_flight: Option<usize>,

    /// Retry schedule for timeout-class failures
    pub retry: RetryPolicy,
}

impl LiveConfig {
    /// Create a config for the given state file with production defaults.
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            system_prompt: None,
            temperature: 0.0,
            extra_body: serde_json::Map::new(),
            timeout: Duration::from_secs(1200),
            max_in_flight: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set extra body parameters forwarded verbatim to the endpoint.
    pub fn with_extra_body(mut self, extra_body: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra_body = extra_body;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap concurrent in-flight requests.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    /// Set the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Live chat-completion backend.
///
/// The swarm state descriptor is read once at construction. A single
/// `reqwest::Client` is shared read-only across all concurrent requests
/// in a batch.
pub struct LiveClient {
    state: SwarmState,
    formatter: PromptFormatter,
    temperature: f32,
    extra_body: serde_json::Map<String, serde_json::Value>,
    timeout: Duration,
    max_in_flight: Option<usize>,
    retry: RetryPolicy,
    credential: Option<SecretString>,
    http: reqwest::Client,
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("state", &self.state)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field(
                "credential",
                &self.credential.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl LiveClient {
    /// Create a live client from configuration.
    ///
    /// Fails with [`GeneratorError::Configuration`] if the state file is
    /// absent or malformed. An optional bearer token is taken from the
    /// `SWARM_API_KEY` environment variable.
    pub fn new(config: LiveConfig) -> Result<Self, GeneratorError> {
        let state = SwarmState::load(&config.state_path)?;
        Self::with_state(state, config)
    }

    /// Create a live client from an already-loaded descriptor.
    pub fn with_state(state: SwarmState, config: LiveConfig) -> Result<Self, GeneratorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeneratorError::Configuration(format!("HTTP client: {e}")))?;

        let formatter = match config.system_prompt {
            Some(system) => PromptFormatter::with_system_prompt(system),
            None => PromptFormatter::new(),
        };

        let credential = std::env::var(SWARM_API_KEY_ENV).ok().map(SecretString::from);

        Ok(Self {
            state,
            formatter,
            temperature: config.temperature,
            extra_body: config.extra_body,
            timeout: config.timeout,
            max_in_flight: config.max_in_flight,
            retry: config.retry,
            credential,
            http,
        })
    }

    /// The descriptor this client was constructed with.
    pub fn state(&self) -> &SwarmState {
        &self.state
    }

    /// One completion attempt, no retry.
    async fn request_once(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<String, GeneratorError> {
        let request = ChatRequest {
            model: &self.state.model,
            messages,
            temperature: self.temperature,
            max_tokens,
            extra: self.extra_body.clone(),
        };

        let mut builder = self.http.post(self.state.chat_completions_url());
        if let Some(token) = &self.credential {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout(self.timeout)
            } else {
                GeneratorError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout(self.timeout)
            } else {
                GeneratorError::Parse(e.to_string())
            }
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GeneratorError::Parse("response contained no choices".to_string()))
    }

    /// One completion with the retry schedule applied.
    async fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<String, GeneratorError> {
        (|| self.request_once(messages, max_tokens))
            .retry(self.retry.backoff())
            .when(GeneratorError::is_retryable)
            .notify(|err, wait| {
                tracing::warn!(error = %err, wait = ?wait, "retrying request after timeout");
            })
            .await
    }
}

#[async_trait]
impl TextGenerator for LiveClient {
    async fn generate(
        &self,
        prompts: &[Prompt],
        max_out_len: u32,
    ) -> Result<Vec<String>, GeneratorError> {
        let batches: Vec<Vec<Message>> =
            prompts.iter().map(|p| self.formatter.format(p)).collect();

        tracing::debug!(
            batch = batches.len(),
            model = %self.state.model,
            "dispatching completion batch"
        );

        let requests: Vec<_> = batches
            .iter()
            .map(|messages| self.complete(messages, max_out_len))
            .collect();

        match self.max_in_flight {
            Some(cap) => {
                stream::iter(requests)
                    .buffered(cap)
                    .try_collect::<Vec<_>>()
                    .await
            }
            None => futures::future::try_join_all(requests).await,
        }
    }

    fn name(&self) -> &str {
        "live"
    }
}

/// Chat-completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Chat-completion response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_file(uri: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"endpoint": "{uri}", "model": "test-model"}}"#).unwrap();
        file
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    fn fast_client(uri: &str, retry: RetryPolicy) -> (LiveClient, tempfile::NamedTempFile) {
        let file = state_file(uri);
        let config = LiveConfig::new(file.path())
            .with_timeout(Duration::from_millis(250))
            .with_retry(retry);
        let client = LiveClient::new(config).unwrap();
        (client, file)
    }

    #[tokio::test]
    async fn test_single_prompt_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(completion("4"))
            .mount(&server)
            .await;

        let (client, _file) = fast_client(&server.uri(), RetryPolicy::none());
        let out = client
            .generate(&[Prompt::text("What is 2 + 2?")], 64)
            .await
            .unwrap();
        assert_eq!(out, vec!["4".to_string()]);
    }

    #[tokio::test]
    async fn test_output_order_matches_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("alpha"))
            .respond_with(completion("A").set_delay(Duration::from_millis(50)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("beta"))
            .respond_with(completion("B"))
            .mount(&server)
            .await;

        let (client, _file) = fast_client(&server.uri(), RetryPolicy::none());
        let prompts = vec![Prompt::text("alpha"), Prompt::text("beta")];
        let out = client.generate(&prompts, 64).await.unwrap();

        // "alpha" completes last but must still come first.
        assert_eq!(out, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_bounded_fan_out_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("alpha"))
            .respond_with(completion("A").set_delay(Duration::from_millis(50)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("beta"))
            .respond_with(completion("B"))
            .mount(&server)
            .await;

        let file = state_file(&server.uri());
        let config = LiveConfig::new(file.path())
            .with_timeout(Duration::from_millis(250))
            .with_retry(RetryPolicy::none())
            .with_max_in_flight(1);
        let client = LiveClient::new(config).unwrap();

        let prompts = vec![Prompt::text("alpha"), Prompt::text("beta")];
        let out = client.generate(&prompts, 64).await.unwrap();
        assert_eq!(out, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _file) = fast_client(&server.uri(), RetryPolicy::default());
        let result = client.generate(&[Prompt::text("x")], 64).await;

        assert!(matches!(
            result,
            Err(GeneratorError::Api { status: 401, .. })
        ));
        // `expect(1)` on the mock verifies no retry happened.
    }

    #[tokio::test]
    async fn test_timeout_then_success_is_retried() {
        let server = MockServer::start().await;
        // The first two attempts outlive the 250ms request timeout, then
        // the expired mock falls through to the fast responder.
        Mock::given(method("POST"))
            .respond_with(completion("slow").set_delay(Duration::from_secs(2)))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(completion("recovered"))
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_attempts: 5,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        let (client, _file) = fast_client(&server.uri(), retry);

        let out = client.generate(&[Prompt::text("x")], 64).await.unwrap();
        assert_eq!(out, vec!["recovered".to_string()]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("slow").set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_attempts: 2,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        let (client, _file) = fast_client(&server.uri(), retry);

        let result = client.generate(&[Prompt::text("x")], 64).await;
        assert!(matches!(result, Err(GeneratorError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_request_body_carries_extra_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("\"top_p\":0.9"))
            .respond_with(completion("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let file = state_file(&server.uri());
        let mut extra = serde_json::Map::new();
        extra.insert("top_p".to_string(), json!(0.9));
        let config = LiveConfig::new(file.path())
            .with_timeout(Duration::from_millis(250))
            .with_retry(RetryPolicy::none())
            .with_extra_body(extra);
        let client = LiveClient::new(config).unwrap();

        let out = client.generate(&[Prompt::text("x")], 64).await.unwrap();
        assert_eq!(out, vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_state_file_is_fatal() {
        let config = LiveConfig::new("/nonexistent/swarm_state.json");
        let result = LiveClient::new(config);
        assert!(matches!(result, Err(GeneratorError::Configuration(_))));
    }

    #[test]
    fn test_debug_output_redacts_credential() {
        let state = SwarmState {
            endpoint: "http://host:8000".to_string(),
            model: "m".to_string(),
        };
        let mut client =
            LiveClient::with_state(state, LiveConfig::new("unused")).unwrap();
        client.credential = Some(SecretString::from("sk-super-secret".to_string()));

        let debug_output = format!("{client:?}");
        assert!(!debug_output.contains("sk-super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
