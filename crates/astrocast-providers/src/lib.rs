//! Generative-text providers and the orchestrator that drives them.
//!
//! Each vendor implements [`GenerativeProvider`]. The [`Orchestrator`] holds
//! the configured providers in priority order and adds retry with
//! exponential backoff, cross-provider fallback, cancellation, streaming,
//! and per-attempt usage/cost accounting.

pub mod anthropic;
pub mod cancel;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod provider;
pub mod retry;
pub mod usage;

mod http;
mod sse;

pub use anthropic::AnthropicProvider;
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use error::{OrchestratorError, ProviderError, SetupError};
pub use openai::OpenAiProvider;
pub use orchestrator::{
    ChunkStream, Generation, Orchestrator, OrchestratorStatus, ProviderStatus, StreamChunk,
};
pub use provider::{
    Completion, CompletionRequest, GenerativeProvider, ProviderStream, StreamEvent, TokenUsage,
};
pub use retry::RetryPolicy;
pub use usage::{AttemptOutcome, UsageEntry, UsageSummary};
