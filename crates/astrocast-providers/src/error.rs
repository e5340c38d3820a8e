use astrocast_core::ConfigError;
use thiserror::Error;

/// Errors from a single call to one provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} rate limited the request (HTTP 429)")]
    RateLimited { provider: String },

    /// 5xx from the vendor: overloaded or failing upstream.
    #[error("{provider} returned server error {status}: {body}")]
    Upstream {
        provider: String,
        status: u16,
        body: String,
    },

    /// Non-retriable 4xx, e.g. bad credentials or an invalid request body.
    #[error("{provider} rejected the request with status {status}: {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} returned an empty completion")]
    EmptyResponse { provider: String },

    /// Error event delivered inside an event stream.
    #[error("{provider} stream error: {message}")]
    Stream { provider: String, message: String },

    #[error("{provider} has no credentials configured")]
    NotConfigured { provider: String },

    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Returns `true` for errors worth another attempt after a back-off delay.
    ///
    /// **Retriable:** network timeouts and connection failures, 429, 5xx,
    /// empty completions, and in-stream error events (vendors emit these for
    /// overload).
    ///
    /// **Not retriable:** rejected requests, malformed bodies, missing
    /// credentials, and cancellation.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ProviderError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            ProviderError::RateLimited { .. }
            | ProviderError::Upstream { .. }
            | ProviderError::EmptyResponse { .. }
            | ProviderError::Stream { .. } => true,
            ProviderError::Rejected { .. }
            | ProviderError::Deserialize { .. }
            | ProviderError::NotConfigured { .. }
            | ProviderError::Cancelled => false,
        }
    }
}

/// Errors surfaced by the orchestrator once retries and fallback are spent.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No provider has credentials; nothing was attempted.
    #[error("no generative provider is configured")]
    NoProviderConfigured,

    /// The only configured provider exhausted its retry budget.
    #[error("provider {provider} failed after {attempts} attempt(s): {source}")]
    ProviderFailed {
        provider: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// Every provider in the fallback chain failed. The primary's terminal
    /// error is the reported cause; the last provider's error is kept too.
    #[error(
        "all {} providers failed; primary {primary}: {primary_error}; last {last_provider}: {last_error}",
        .attempted.len()
    )]
    AllProvidersFailed {
        primary: String,
        #[source]
        primary_error: ProviderError,
        last_provider: String,
        last_error: ProviderError,
        attempted: Vec<String>,
    },

    #[error("generation cancelled")]
    Cancelled,
}

/// Errors building an orchestrator from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build provider client: {0}")]
    Client(#[from] ProviderError),
}
