//! Per-attempt usage and cost accounting.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::provider::TokenUsage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { error: String },
}

/// One provider attempt, successful or not.
///
/// All attempts belonging to one orchestrator call share a `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEntry {
    pub request_id: Uuid,
    pub provider: String,
    /// 1-based attempt number on this provider.
    pub attempt: u32,
    pub recorded_at: DateTime<Utc>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    pub cost_usd: Decimal,
    pub streamed: bool,
    pub outcome: AttemptOutcome,
}

impl UsageEntry {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Succeeded
    }
}

/// Aggregate of every entry recorded for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub provider: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost_usd: Decimal,
    pub total_duration_ms: u64,
}

/// Append-only, thread-safe log shared by concurrent generations.
#[derive(Debug, Default)]
pub(crate) struct UsageLog {
    entries: Mutex<Vec<UsageEntry>>,
}

impl UsageLog {
    pub(crate) fn append(&self, entry: UsageEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub(crate) fn snapshot(&self) -> Vec<UsageEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Hand every entry to the caller and start over empty.
    pub(crate) fn drain(&self) -> Vec<UsageEntry> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn for_provider(&self, provider: &str) -> Vec<UsageEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.provider == provider)
            .cloned()
            .collect()
    }

    pub(crate) fn summary(&self, provider: &str) -> UsageSummary {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|e| e.provider == provider).fold(
            UsageSummary {
                provider: provider.to_owned(),
                ..UsageSummary::default()
            },
            |mut acc, e| {
                acc.attempts += 1;
                if e.succeeded() {
                    acc.successes += 1;
                } else {
                    acc.failures += 1;
                }
                acc.input_tokens += e.input_tokens;
                acc.output_tokens += e.output_tokens;
                acc.total_cost_usd += e.cost_usd;
                acc.total_duration_ms += e.duration_ms;
                acc
            },
        )
    }
}

/// Fields shared by every entry an attempt produces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttemptContext<'a> {
    pub request_id: Uuid,
    pub provider: &'a str,
    pub attempt: u32,
    pub streamed: bool,
}

impl AttemptContext<'_> {
    pub(crate) fn entry(
        &self,
        usage: TokenUsage,
        duration: std::time::Duration,
        cost_usd: Decimal,
        outcome: AttemptOutcome,
    ) -> UsageEntry {
        UsageEntry {
            request_id: self.request_id,
            provider: self.provider.to_owned(),
            attempt: self.attempt,
            recorded_at: Utc::now(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            cost_usd,
            streamed: self.streamed,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn record(log: &UsageLog, provider: &str, outcome: AttemptOutcome, cost: Decimal) {
        let ctx = AttemptContext {
            request_id: Uuid::new_v4(),
            provider,
            attempt: 1,
            streamed: false,
        };
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        log.append(ctx.entry(usage, Duration::from_millis(20), cost, outcome));
    }

    #[test]
    fn summary_aggregates_one_provider() {
        let log = UsageLog::default();
        record(&log, "anthropic", AttemptOutcome::Succeeded, Decimal::new(15, 4));
        record(
            &log,
            "anthropic",
            AttemptOutcome::Failed {
                error: "boom".to_owned(),
            },
            Decimal::ZERO,
        );
        record(&log, "openai", AttemptOutcome::Succeeded, Decimal::new(1, 4));

        let summary = log.summary("anthropic");
        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.input_tokens, 200);
        assert_eq!(summary.total_cost_usd, Decimal::new(15, 4));
        assert_eq!(summary.total_duration_ms, 40);
    }

    #[test]
    fn for_provider_filters_entries() {
        let log = UsageLog::default();
        record(&log, "anthropic", AttemptOutcome::Succeeded, Decimal::ZERO);
        record(&log, "openai", AttemptOutcome::Succeeded, Decimal::ZERO);
        assert_eq!(log.for_provider("openai").len(), 1);
        assert_eq!(log.snapshot().len(), 2);
        assert!(log.for_provider("unknown").is_empty());
    }

    #[test]
    fn drain_exports_then_empties() {
        let log = UsageLog::default();
        record(&log, "anthropic", AttemptOutcome::Succeeded, Decimal::ZERO);
        record(&log, "openai", AttemptOutcome::Succeeded, Decimal::ZERO);

        let exported = log.drain();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].provider, "anthropic");
        assert!(log.snapshot().is_empty());

        record(&log, "openai", AttemptOutcome::Succeeded, Decimal::ZERO);
        assert_eq!(log.summary("openai").attempts, 1);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(AttemptOutcome::Failed {
            error: "timeout".to_owned(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "timeout");
    }
}
