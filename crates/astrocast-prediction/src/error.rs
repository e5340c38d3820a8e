use astrocast_providers::OrchestratorError;
use thiserror::Error;

/// Errors reported by a [`ChartStore`](crate::ChartStore) implementation.
#[derive(Debug, Error)]
pub enum ChartStoreError {
    #[error("no natal chart stored for user {user_id}")]
    NotFound { user_id: String },

    #[error("chart store backend error: {0}")]
    Backend(String),
}

/// Errors reported by an [`Ephemeris`](crate::Ephemeris) implementation.
#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("ephemeris unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PredictionError {
    /// The user has no natal chart. Not retriable.
    #[error("natal chart not found for user {user_id}")]
    ChartNotFound { user_id: String },

    #[error(transparent)]
    ChartStore(ChartStoreError),

    #[error("transit lookup failed: {0}")]
    Ephemeris(#[from] EphemerisError),

    /// Paid request while no generative provider is configured. Never
    /// downgraded to the rule-based path.
    #[error("generative tier unavailable: no provider is configured")]
    GenerativeTierUnavailable,

    /// Every provider failed after retries and fallback.
    #[error("generation failed: {0}")]
    Generation(#[source] OrchestratorError),

    #[error("streaming is only offered on the paid tier")]
    StreamingRequiresPaidTier,

    #[error("prediction cancelled")]
    Cancelled,
}

impl PredictionError {
    /// `true` when a paid generation was attempted and failed, so the caller
    /// should not charge for it. Degraded-but-parsed text is a success and
    /// never reaches this path.
    #[must_use]
    pub fn is_billable_failure(&self) -> bool {
        matches!(self, PredictionError::Generation(_))
    }
}

impl From<ChartStoreError> for PredictionError {
    fn from(err: ChartStoreError) -> Self {
        match err {
            ChartStoreError::NotFound { user_id } => PredictionError::ChartNotFound { user_id },
            other => PredictionError::ChartStore(other),
        }
    }
}

impl From<OrchestratorError> for PredictionError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NoProviderConfigured => PredictionError::GenerativeTierUnavailable,
            OrchestratorError::Cancelled => PredictionError::Cancelled,
            other => PredictionError::Generation(other),
        }
    }
}
