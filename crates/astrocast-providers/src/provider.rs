//! The provider abstraction every vendor client implements.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One generation request, identical across vendors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// System instruction framing the task.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Token counts normalized across vendors (input/output vs prompt/completion).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Combine two partial reports where each field is a running total.
    #[must_use]
    pub fn merge_max(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.max(other.input_tokens),
            output_tokens: self.output_tokens.max(other.output_tokens),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    /// Model id echoed back by the vendor, when present.
    pub model: Option<String>,
}

/// Item of a provider's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    /// Usage report; fields are running totals.
    Usage(TokenUsage),
}

pub type ProviderStream = BoxStream<'static, Result<StreamEvent, ProviderError>>;

/// A generative-text vendor.
///
/// `stream` resolves once the vendor has accepted the request; errors after
/// that point arrive as stream items. Dropping the stream releases the
/// underlying connection.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Stable identifier, also the key into the price table.
    fn id(&self) -> &str;

    /// Fallback rank; lower is tried first.
    fn priority(&self) -> u8;

    /// `true` when credentials are present. Unconfigured providers are listed
    /// but never called.
    fn is_configured(&self) -> bool;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;

    async fn stream(&self, request: &CompletionRequest) -> Result<ProviderStream, ProviderError>;
}
