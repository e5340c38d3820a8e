//! Priority-ordered fallback across generative providers.
//!
//! Each provider gets its own retry budget (see [`RetryPolicy`]). When a
//! provider's budget is spent the next configured provider is tried, in
//! ascending priority. Every attempt, successful or not, lands in the usage
//! log with its token counts and estimated cost.

mod stream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use astrocast_core::{load_price_table, AppConfig, PriceTable};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::anthropic::AnthropicProvider;
use crate::cancel::CancelToken;
use crate::error::{OrchestratorError, ProviderError, SetupError};
use crate::openai::OpenAiProvider;
use crate::provider::{
    CompletionRequest, GenerativeProvider, ProviderStream, StreamEvent, TokenUsage,
};
use crate::retry::{retry_with_backoff, Exhausted, RetryPolicy};
use crate::usage::{AttemptContext, AttemptOutcome, UsageEntry, UsageLog, UsageSummary};

pub use stream::{ChunkStream, StreamChunk};

/// A successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Provider that produced the text.
    pub provider: String,
    /// Attempt number on that provider.
    pub attempts: u32,
    pub usage: TokenUsage,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub id: String,
    pub priority: u8,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorStatus {
    pub available: bool,
    pub current_primary_provider: Option<String>,
    pub configured_providers: Vec<ProviderStatus>,
}

type SharedProvider = Arc<dyn GenerativeProvider>;

pub struct Orchestrator {
    /// Every registered provider, ascending priority.
    registered: Vec<SharedProvider>,
    /// The subset with credentials, same order.
    active: Vec<SharedProvider>,
    retry: RetryPolicy,
    pricing: PriceTable,
    usage: UsageLog,
}

impl Orchestrator {
    /// Providers are ordered by ascending priority; ties keep input order.
    #[must_use]
    pub fn new(
        mut providers: Vec<SharedProvider>,
        retry: RetryPolicy,
        pricing: PriceTable,
    ) -> Self {
        providers.sort_by_key(|p| p.priority());
        let active: Vec<SharedProvider> = providers
            .iter()
            .filter(|p| p.is_configured())
            .cloned()
            .collect();

        let active_ids: Vec<&str> = active.iter().map(|p| p.id()).collect();
        tracing::info!(
            providers = ?active_ids,
            max_attempts = retry.max_attempts,
            "generative orchestrator ready"
        );
        if active.is_empty() {
            tracing::warn!("no generative provider configured; paid predictions are unavailable");
        }

        Self {
            registered: providers,
            active,
            retry,
            pricing,
            usage: UsageLog::default(),
        }
    }

    /// Build the Anthropic and OpenAI providers from configuration. The price
    /// table comes from `pricing_path` when set, otherwise the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] if the pricing file cannot be loaded and
    /// [`SetupError::Client`] if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let timeout = config.provider_timeout_secs;
        let providers: Vec<SharedProvider> = vec![
            Arc::new(AnthropicProvider::new(&config.anthropic, timeout)?),
            Arc::new(OpenAiProvider::new(&config.openai, timeout)?),
        ];
        let pricing = match &config.pricing_path {
            Some(path) => load_price_table(path)?,
            None => PriceTable::builtin(),
        };
        Ok(Self::new(providers, RetryPolicy::from_config(config), pricing))
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.active.is_empty()
    }

    #[must_use]
    pub fn list_available_providers(&self) -> Vec<&str> {
        self.active.iter().map(|p| p.id()).collect()
    }

    #[must_use]
    pub fn is_provider_available(&self, id: &str) -> bool {
        self.active.iter().any(|p| p.id() == id)
    }

    /// Highest-priority configured provider.
    #[must_use]
    pub fn primary_provider(&self) -> Option<&str> {
        self.active.first().map(|p| p.id())
    }

    #[must_use]
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            available: self.is_available(),
            current_primary_provider: self.primary_provider().map(str::to_owned),
            configured_providers: self
                .registered
                .iter()
                .map(|p| ProviderStatus {
                    id: p.id().to_owned(),
                    priority: p.priority(),
                    available: p.is_configured(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    #[must_use]
    pub fn pricing(&self) -> &PriceTable {
        &self.pricing
    }

    /// Snapshot of every recorded attempt, oldest first.
    #[must_use]
    pub fn usage_log(&self) -> Vec<UsageEntry> {
        self.usage.snapshot()
    }

    /// Remove and return every recorded attempt, oldest first. The log keeps
    /// every attempt until drained, so long-running hosts should export it
    /// periodically.
    #[must_use]
    pub fn drain_usage(&self) -> Vec<UsageEntry> {
        self.usage.drain()
    }

    #[must_use]
    pub fn usage_for(&self, provider: &str) -> Vec<UsageEntry> {
        self.usage.for_provider(provider)
    }

    #[must_use]
    pub fn usage_summary(&self, provider: &str) -> UsageSummary {
        self.usage.summary(provider)
    }

    /// Generate with the default provider order and no cancellation.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::generate_with`].
    pub async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> Result<Generation, OrchestratorError> {
        self.generate_with(request, None, &CancelToken::never()).await
    }

    /// Generate text, falling back across providers.
    ///
    /// `preferred` moves a configured provider to the front of the chain; an
    /// unknown or unconfigured id is ignored.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::NoProviderConfigured`] when nothing has
    ///   credentials.
    /// - [`OrchestratorError::ProviderFailed`] when the only provider fails.
    /// - [`OrchestratorError::AllProvidersFailed`] when every provider fails.
    /// - [`OrchestratorError::Cancelled`] when `cancel` fires first.
    pub async fn generate_with(
        &self,
        request: &CompletionRequest,
        preferred: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Generation, OrchestratorError> {
        if self.active.is_empty() {
            return Err(OrchestratorError::NoProviderConfigured);
        }

        let request_id = Uuid::new_v4();
        let mut failures = Vec::new();

        for provider in self.chain(preferred) {
            match self
                .complete_with_retries(&provider, request, request_id, cancel)
                .await
            {
                Ok(generation) => {
                    if !failures.is_empty() {
                        tracing::info!(
                            provider = %generation.provider,
                            %request_id,
                            "fallback provider succeeded"
                        );
                    }
                    return Ok(generation);
                }
                Err(Exhausted {
                    error: ProviderError::Cancelled,
                    ..
                }) => return Err(OrchestratorError::Cancelled),
                Err(exhausted) => {
                    tracing::warn!(
                        provider = provider.id(),
                        attempts = exhausted.attempts,
                        error = %exhausted.error,
                        %request_id,
                        "provider exhausted, falling back"
                    );
                    failures.push((provider.id().to_owned(), exhausted));
                }
            }
        }

        Err(exhausted_error(failures))
    }

    /// Stream text from the first provider that accepts the request.
    ///
    /// Retry and fallback apply only while opening the stream; once text has
    /// been delivered, an upstream failure ends the stream with an `Error`
    /// chunk. Cancellation also ends it with an `Error` chunk.
    #[must_use]
    pub fn generate_streaming(
        self: &Arc<Self>,
        request: CompletionRequest,
        preferred: Option<&str>,
        cancel: CancelToken,
    ) -> ChunkStream {
        if self.active.is_empty() {
            return ChunkStream::failed(OrchestratorError::NoProviderConfigured.to_string());
        }
        let orchestrator = Arc::clone(self);
        let chain = self.chain(preferred);
        ChunkStream::spawn(move |tx| async move {
            orchestrator.pump_stream(chain, request, cancel, tx).await;
        })
    }

    fn chain(&self, preferred: Option<&str>) -> Vec<SharedProvider> {
        let mut chain = self.active.clone();
        if let Some(id) = preferred {
            match chain.iter().position(|p| p.id() == id) {
                Some(index) => {
                    let chosen = chain.remove(index);
                    chain.insert(0, chosen);
                }
                None => {
                    tracing::debug!(
                        preferred = id,
                        "preferred provider unavailable, using priority order"
                    );
                }
            }
        }
        chain
    }

    async fn complete_with_retries(
        &self,
        provider: &SharedProvider,
        request: &CompletionRequest,
        request_id: Uuid,
        cancel: &CancelToken,
    ) -> Result<Generation, Exhausted> {
        retry_with_backoff(&self.retry, cancel, |attempt| async move {
            let ctx = AttemptContext {
                request_id,
                provider: provider.id(),
                attempt,
                streamed: false,
            };
            let started = Instant::now();
            let result = provider.complete(request).await;
            match &result {
                Ok(completion) => self.record_success(&ctx, completion.usage, started.elapsed()),
                Err(err) => self.record_failure(&ctx, err, started.elapsed()),
            }
            result.map(|completion| Generation {
                text: completion.text,
                provider: provider.id().to_owned(),
                attempts: attempt,
                usage: completion.usage,
                request_id,
            })
        })
        .await
    }

    async fn pump_stream(
        &self,
        chain: Vec<SharedProvider>,
        request: CompletionRequest,
        cancel: CancelToken,
        tx: mpsc::Sender<StreamChunk>,
    ) {
        let request_id = Uuid::new_v4();
        let mut failures = Vec::new();

        for provider in &chain {
            let opened = retry_with_backoff(&self.retry, &cancel, |attempt| {
                let request = &request;
                async move {
                    let ctx = AttemptContext {
                        request_id,
                        provider: provider.id(),
                        attempt,
                        streamed: true,
                    };
                    let started = Instant::now();
                    match provider.stream(request).await {
                        Ok(upstream) => Ok((upstream, attempt, started)),
                        Err(err) => {
                            self.record_failure(&ctx, &err, started.elapsed());
                            Err(err)
                        }
                    }
                }
            })
            .await;

            match opened {
                Ok((upstream, attempt, started)) => {
                    let ctx = AttemptContext {
                        request_id,
                        provider: provider.id(),
                        attempt,
                        streamed: true,
                    };
                    self.forward(upstream, &ctx, started, &cancel, &tx).await;
                    return;
                }
                Err(Exhausted {
                    error: ProviderError::Cancelled,
                    ..
                }) => {
                    let cancelled = OrchestratorError::Cancelled.to_string();
                    let _ = tx.send(StreamChunk::Error(cancelled)).await;
                    return;
                }
                Err(exhausted) => {
                    tracing::warn!(
                        provider = provider.id(),
                        attempts = exhausted.attempts,
                        error = %exhausted.error,
                        %request_id,
                        "stream could not be opened, falling back"
                    );
                    failures.push((provider.id().to_owned(), exhausted));
                }
            }
        }

        let err = exhausted_error(failures);
        let _ = tx.send(StreamChunk::Error(err.to_string())).await;
    }

    async fn forward(
        &self,
        mut upstream: ProviderStream,
        ctx: &AttemptContext<'_>,
        started: Instant,
        cancel: &CancelToken,
        tx: &mpsc::Sender<StreamChunk>,
    ) {
        let mut usage = TokenUsage::default();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.record_failure(ctx, &ProviderError::Cancelled, started.elapsed());
                    let cancelled = OrchestratorError::Cancelled.to_string();
                    let _ = tx.send(StreamChunk::Error(cancelled)).await;
                    return;
                }
                item = upstream.next() => item,
            };

            match next {
                Some(Ok(StreamEvent::Delta(text))) => {
                    if tx.send(StreamChunk::Text(text)).await.is_err() {
                        tracing::debug!(provider = ctx.provider, "stream consumer went away");
                        return;
                    }
                }
                Some(Ok(StreamEvent::Usage(reported))) => usage = usage.merge_max(reported),
                Some(Err(err)) => {
                    self.record_failure(ctx, &err, started.elapsed());
                    tracing::warn!(provider = ctx.provider, error = %err, "stream interrupted");
                    let message = format!("{} stream interrupted: {err}", ctx.provider);
                    let _ = tx.send(StreamChunk::Error(message)).await;
                    return;
                }
                None => {
                    self.record_success(ctx, usage, started.elapsed());
                    let _ = tx.send(StreamChunk::Done).await;
                    return;
                }
            }
        }
    }

    fn record_success(&self, ctx: &AttemptContext<'_>, usage: TokenUsage, elapsed: Duration) {
        let cost = self
            .pricing
            .estimate_cost(ctx.provider, usage.input_tokens, usage.output_tokens);
        tracing::debug!(
            provider = ctx.provider,
            attempt = ctx.attempt,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost_usd = %cost,
            "provider attempt succeeded"
        );
        self.usage
            .append(ctx.entry(usage, elapsed, cost, AttemptOutcome::Succeeded));
    }

    fn record_failure(&self, ctx: &AttemptContext<'_>, err: &ProviderError, elapsed: Duration) {
        self.usage.append(ctx.entry(
            TokenUsage::default(),
            elapsed,
            rust_decimal::Decimal::ZERO,
            AttemptOutcome::Failed {
                error: err.to_string(),
            },
        ));
    }
}

/// Collapse per-provider failures into the caller-facing error. One failure
/// reports that provider; several report the primary's error as the cause.
fn exhausted_error(failures: Vec<(String, Exhausted)>) -> OrchestratorError {
    let attempted: Vec<String> = failures.iter().map(|(id, _)| id.clone()).collect();
    let mut failures = failures.into_iter();
    let Some((primary, first)) = failures.next() else {
        return OrchestratorError::NoProviderConfigured;
    };
    match failures.last() {
        None => OrchestratorError::ProviderFailed {
            provider: primary,
            attempts: first.attempts,
            source: first.error,
        },
        Some((last_provider, last)) => OrchestratorError::AllProvidersFailed {
            primary,
            primary_error: first.error,
            last_provider,
            last_error: last.error,
            attempted,
        },
    }
}
