//! Docfeat LLM Provider Layer
//!
//! Implementations of the `CompletionClient` trait from `docfeat-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable mock for testing
//! - `OpenAiCompatibleProvider`: Any chat-completions endpoint (Perplexity, OpenAI, ...)
//!
//! # Examples
//!
//! ```
//! use docfeat_llm::MockProvider;
//! use docfeat_domain::{CompletionClient, CompletionRequest};
//!
//! let provider = MockProvider::new("Revenue, Expenses");
//! let result = provider.complete(&CompletionRequest::new("test prompt")).unwrap();
//! assert_eq!(result, "Revenue, Expenses");
//! ```

#![warn(missing_docs)]

pub mod openai;

use docfeat_domain::{CompletionClient, CompletionRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use openai::OpenAiCompatibleProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Credential rejected by the service
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider could not be constructed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Communication(_) | LlmError::RateLimitExceeded)
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Response(String),
    Error,
}

#[derive(Debug, Clone)]
struct MockRule {
    patterns: Vec<String>,
    reply: MockReply,
}

impl MockRule {
    fn matches(&self, prompt: &str) -> bool {
        self.patterns.iter().all(|p| prompt.contains(p.as_str()))
    }
}

/// Mock LLM provider for deterministic testing
///
/// Replies are chosen in this order:
/// 1. the first rule whose patterns all occur in the user prompt
/// 2. the next scripted reply, if any remain
/// 3. the default response
///
/// Every request is recorded and can be inspected with [`MockProvider::requests`].
///
/// # Examples
///
/// ```
/// use docfeat_llm::MockProvider;
/// use docfeat_domain::{CompletionClient, CompletionRequest};
///
/// let mut provider = MockProvider::default();
/// provider.add_response("features", "Revenue");
/// provider.push_script("first");
/// provider.push_script("second");
///
/// let ask = |p: &str| provider.complete(&CompletionRequest::new(p)).unwrap();
/// assert_eq!(ask("list features"), "Revenue");
/// assert_eq!(ask("anything"), "first");
/// assert_eq!(ask("anything"), "second");
/// assert_eq!(ask("anything"), "Default mock response");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    rules: Arc<Mutex<Vec<MockRule>>>,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            rules: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `response` whenever the prompt contains `pattern`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.add_response_all(vec![pattern.into()], response);
    }

    /// Reply with `response` whenever the prompt contains every pattern
    pub fn add_response_all<I, S>(&mut self, patterns: I, response: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.rules).push(MockRule {
            patterns: patterns.into_iter().map(Into::into).collect(),
            reply: MockReply::Response(response.into()),
        });
    }

    /// Fail whenever the prompt contains `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>) {
        lock(&self.rules).push(MockRule {
            patterns: vec![pattern.into()],
            reply: MockReply::Error,
        });
    }

    /// Queue a reply for the next unmatched request
    pub fn push_script(&mut self, response: impl Into<String>) {
        lock(&self.script).push_back(MockReply::Response(response.into()));
    }

    /// Queue a failure for the next unmatched request
    pub fn push_script_error(&mut self) {
        lock(&self.script).push_back(MockReply::Error);
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Reset the call count and recorded requests
    pub fn reset_call_count(&self) {
        lock(&self.requests).clear();
    }

    /// All requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    fn reply_for(&self, prompt: &str) -> MockReply {
        if let Some(rule) = lock(&self.rules).iter().find(|r| r.matches(prompt)) {
            return rule.reply.clone();
        }
        if let Some(reply) = lock(&self.script).pop_front() {
            return reply;
        }
        MockReply::Response(self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl CompletionClient for MockProvider {
    type Error = LlmError;

    fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        lock(&self.requests).push(request.clone());

        match self.reply_for(&request.user_prompt) {
            MockReply::Response(response) => Ok(response),
            MockReply::Error => Err(LlmError::Other("Mock error".to_string())),
        }
    }
}
