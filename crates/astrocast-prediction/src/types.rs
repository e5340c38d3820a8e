use astrocast_aspects::{AspectMatch, Mood, Tone};
use astrocast_core::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::ParseStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredictionSource {
    Generated,
    RuleBased,
}

/// The six narrative sections of a forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub general: String,
    pub love: String,
    pub career: String,
    pub health: String,
    pub finance: String,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub user_id: String,
    pub period: Period,
    pub is_paid_tier: bool,
    /// Provider id to try first, when configured.
    pub preferred_provider: Option<String>,
}

impl PredictionRequest {
    #[must_use]
    pub fn new(user_id: impl Into<String>, period: Period) -> Self {
        Self {
            user_id: user_id.into(),
            period,
            is_paid_tier: false,
            preferred_provider: None,
        }
    }

    #[must_use]
    pub fn paid(mut self) -> Self {
        self.is_paid_tier = true;
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }
}

/// An assembled forecast. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub user_id: String,
    pub period: Period,
    pub target_date: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub narrative: Narrative,
    /// Three entries on the paid tier when the model supplied them; always
    /// empty on the free tier.
    pub challenges: Vec<String>,
    pub opportunities: Vec<String>,
    pub energy: u8,
    pub mood: Mood,
    pub tone: Tone,
    pub lucky_numbers: Vec<u8>,
    pub lucky_colors: Vec<String>,
    pub dominant_aspect: Option<AspectMatch>,
    pub source: PredictionSource,
    /// Provider that produced the text (paid tier only).
    pub provider: Option<String>,
    /// How the provider response was parsed (paid tier only).
    pub parse_strategy: Option<ParseStrategy>,
}
