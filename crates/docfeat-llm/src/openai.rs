//! OpenAI-compatible Provider Implementation
//!
//! Talks to any endpoint speaking the chat-completions wire format, such as
//! Perplexity (`https://api.perplexity.ai`) or OpenAI (`https://api.openai.com/v1`).
//!
//! # Features
//!
//! - Async HTTP communication, with a blocking `CompletionClient` wrapper
//! - Page images sent as `image_url` data URLs, raw PDFs as `file` parts
//! - Retry logic with exponential backoff for network errors, 429 and 5xx
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use docfeat_llm::OpenAiCompatibleProvider;
//! use docfeat_domain::{CompletionClient, CompletionRequest};
//!
//! let provider = OpenAiCompatibleProvider::new("https://api.perplexity.ai", "sonar", "pplx-key")
//!     .unwrap()
//!     .with_temperature(0.1);
//! let reply = provider.complete(&CompletionRequest::new("Say hello")).unwrap();
//! ```

use crate::LlmError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docfeat_domain::{Attachment, CompletionClient, CompletionRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Default endpoint (Perplexity)
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Default model
pub const DEFAULT_MODEL: &str = "sonar";

/// Default timeout for LLM requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry; doubles on every further attempt
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Chat-completions provider
pub struct OpenAiCompatibleProvider {
    base_url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
    runtime: OnceLock<tokio::runtime::Runtime>,
}

impl fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FilePart },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct FilePart {
    filename: String,
    file_data: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn data_url(attachment: &Attachment) -> String {
    format!(
        "data:{};base64,{}",
        attachment.media_type,
        STANDARD.encode(&attachment.data)
    )
}

fn content_part(attachment: &Attachment) -> ContentPart {
    if attachment.is_image() {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: data_url(attachment),
            },
        }
    } else {
        ContentPart::File {
            file: FilePart {
                filename: attachment
                    .filename
                    .clone()
                    .unwrap_or_else(|| "document.pdf".to_string()),
                file_data: data_url(attachment),
            },
        }
    }
}

fn build_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);

    if let Some(system_prompt) = &request.system_prompt {
        messages.push(ChatMessage {
            role: "system",
            content: MessageContent::Text(system_prompt.clone()),
        });
    }

    let content = if request.attachments.is_empty() {
        MessageContent::Text(request.user_prompt.clone())
    } else {
        let mut parts = vec![ContentPart::Text {
            text: request.user_prompt.clone(),
        }];
        parts.extend(request.attachments.iter().map(content_part));
        MessageContent::Parts(parts)
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });

    messages
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))
}

impl OpenAiCompatibleProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `base_url`: API root, without the trailing `/chat/completions`
    /// - `model`: Model to use (e.g., "sonar", "gpt-4o")
    /// - `api_key`: Bearer credential
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            base_url,
            model: model.into(),
            api_key: api_key.into(),
            temperature: None,
            client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            runtime: OnceLock::new(),
        })
    }

    /// Create a provider for Perplexity's `sonar` model
    pub fn perplexity(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL, api_key)
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of attempts (at least one attempt is always made)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the delay before the first retry
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    /// The model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Complete a request using the chat-completions API
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The credential is rejected (no retry)
    /// - Model is not available (no retry)
    /// - Network communication fails or the service is overloaded after all retries
    /// - Response format is invalid
    pub async fn complete_async(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: build_messages(request),
            temperature: self.temperature,
        };

        // Retry logic with exponential backoff
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.send_once(&url, &body).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() => {
                    warn!(attempt = attempts + 1, error = %e, "Completion request failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1x, 2x, 4x, etc.
                let delay = self.backoff * 2u32.pow(attempts - 1);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }

    async fn send_once(
        &self,
        url: &str,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let parsed: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

            debug!(model = %self.model, chars = content.len(), "Completion received");
            return Ok(content);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                LlmError::Authentication(format!("HTTP {}: {}", status, error_text))
            }
            reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(self.model.clone()),
            reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
            s if s.is_server_error() => {
                LlmError::Communication(format!("HTTP {}: {}", status, error_text))
            }
            _ => LlmError::InvalidResponse(format!("HTTP {}: {}", status, error_text)),
        })
    }

    fn runtime(&self) -> Result<&tokio::runtime::Runtime, LlmError> {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to start runtime: {}", e)))?;
        // A concurrent initializer may have won; either runtime works.
        let _ = self.runtime.set(runtime);
        self.runtime
            .get()
            .ok_or_else(|| LlmError::Config("Runtime unavailable".to_string()))
    }
}

impl CompletionClient for OpenAiCompatibleProvider {
    type Error = LlmError;

    fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        // Blocking wrapper for async function
        self.runtime()?.block_on(self.complete_async(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    fn provider_for(server: &MockServer) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(server.uri(), "sonar", "test-key")
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiCompatibleProvider::new("https://api.perplexity.ai/", "sonar", "k").unwrap();
        assert_eq!(provider.base_url, "https://api.perplexity.ai");
        assert_eq!(provider.model(), "sonar");
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
        assert!(provider.temperature.is_none());
    }

    #[test]
    fn test_provider_builders() {
        let provider = OpenAiCompatibleProvider::perplexity("k")
            .unwrap()
            .with_temperature(0.1)
            .with_max_retries(0);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.temperature, Some(0.1));
        assert_eq!(provider.max_retries, 1);
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAiCompatibleProvider::perplexity("super-secret").unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_text_only_request_uses_plain_content() {
        let request = CompletionRequest::new("hello").with_system_prompt("be brief");
        let json = serde_json::to_value(build_messages(&request)).unwrap();

        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[0]["content"], "be brief");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[1]["content"], "hello");
    }

    #[test]
    fn test_attachments_become_content_parts() {
        let request = CompletionRequest::new("read this").with_attachments(vec![
            Attachment::png(vec![1, 2, 3]),
            Attachment::pdf("A.pdf", b"%PDF".to_vec()),
        ]);
        let json = serde_json::to_value(build_messages(&request)).unwrap();
        let parts = json[0]["content"].as_array().unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "read this");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AQID");
        assert_eq!(parts[2]["type"], "file");
        assert_eq!(parts[2]["file"]["filename"], "A.pdf");
        assert!(parts[2]["file"]["file_data"]
            .as_str()
            .unwrap()
            .starts_with("data:application/pdf;base64,"));
    }

    #[tokio::test]
    async fn test_complete_async_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "sonar", "temperature": 0.5 })))
            .respond_with(reply("Revenue, Expenses"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server).with_temperature(0.5);
        let result = provider.complete_async(&CompletionRequest::new("features?")).await;

        assert_eq!(result.unwrap(), "Revenue, Expenses");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply("ok"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider.complete_async(&CompletionRequest::new("x")).await;

        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider_for(&server).with_max_retries(2);
        let result = provider.complete_async(&CompletionRequest::new("x")).await;

        assert!(matches!(result, Err(LlmError::RateLimitExceeded)));
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider.complete_async(&CompletionRequest::new("x")).await;

        assert!(matches!(result, Err(LlmError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_missing_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider.complete_async(&CompletionRequest::new("x")).await;

        assert!(matches!(result, Err(LlmError::ModelNotAvailable(m)) if m == "sonar"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider.complete_async(&CompletionRequest::new("x")).await;

        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("blocking ok"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        // The blocking wrapper owns its own runtime, so drive it from a plain thread.
        let handle = std::thread::spawn(move || provider.complete(&CompletionRequest::new("x")));
        let result = tokio::task::spawn_blocking(move || handle.join())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.unwrap(), "blocking ok");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Use invalid endpoint to trigger error
        let provider = OpenAiCompatibleProvider::new("http://127.0.0.1:9", "sonar", "k")
            .unwrap()
            .with_max_retries(1);

        let result = provider.complete_async(&CompletionRequest::new("test")).await;

        match result {
            Err(LlmError::Communication(_)) => {} // Expected
            other => panic!("Expected Communication error, got {:?}", other.map(|_| ())),
        }
    }
}
