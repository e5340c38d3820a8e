//! Request orchestration: chart lookup, transits, aspects, then either the
//! rule-based synthesizer (free tier) or a generative provider (paid tier).

use std::collections::BTreeMap;
use std::sync::Arc;

use astrocast_aspects::{
    compute_energy, compute_transit_aspects, derive_mood, dominant_aspect, score_tone, AspectMatch,
};
use astrocast_core::{AppConfig, Period, PlanetPosition};
use astrocast_providers::{
    CancelToken, ChunkStream, CompletionRequest, Orchestrator, OrchestratorStatus,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::collaborators::{ChartStore, Ephemeris, NatalChart};
use crate::error::PredictionError;
use crate::lucky::{lucky_colors, lucky_numbers};
use crate::parser::{parse_response, ParseStrategy};
use crate::prompt::{build_prompt, SYSTEM_INSTRUCTIONS};
use crate::synthesizer::{synthesize, SynthesisInput};
use crate::types::{Narrative, Prediction, PredictionRequest, PredictionSource};

/// Sampling parameters sent with every paid-tier request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2000,
        }
    }
}

/// Everything computed before the tiers diverge.
struct ChartContext {
    chart: NatalChart,
    transits: BTreeMap<String, PlanetPosition>,
    aspects: Vec<AspectMatch>,
    target: DateTime<Utc>,
}

/// Narrative plus tier-specific metadata.
struct Drafted {
    narrative: Narrative,
    challenges: Vec<String>,
    opportunities: Vec<String>,
    source: PredictionSource,
    provider: Option<String>,
    parse_strategy: Option<ParseStrategy>,
}

pub struct PredictionPipeline {
    charts: Arc<dyn ChartStore>,
    ephemeris: Arc<dyn Ephemeris>,
    orchestrator: Arc<Orchestrator>,
    settings: GenerationSettings,
    /// Fixed seed for template selection; `None` draws from the OS.
    template_seed: Option<u64>,
}

impl PredictionPipeline {
    #[must_use]
    pub fn new(
        charts: Arc<dyn ChartStore>,
        ephemeris: Arc<dyn Ephemeris>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            charts,
            ephemeris,
            orchestrator,
            settings: GenerationSettings::default(),
            template_seed: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_template_seed(mut self, seed: u64) -> Self {
        self.template_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn orchestrator_status(&self) -> OrchestratorStatus {
        self.orchestrator.status()
    }

    /// # Errors
    ///
    /// See [`PredictionPipeline::generate_at`].
    pub async fn generate_prediction(
        &self,
        user_id: &str,
        period: Period,
        is_paid_tier: bool,
    ) -> Result<Prediction, PredictionError> {
        let mut request = PredictionRequest::new(user_id, period);
        request.is_paid_tier = is_paid_tier;
        self.generate(&request).await
    }

    /// # Errors
    ///
    /// See [`PredictionPipeline::generate_at`].
    pub async fn generate(&self, request: &PredictionRequest) -> Result<Prediction, PredictionError> {
        self.generate_at(request, Utc::now(), &CancelToken::never()).await
    }

    /// # Errors
    ///
    /// See [`PredictionPipeline::generate_at`].
    pub async fn generate_cancellable(
        &self,
        request: &PredictionRequest,
        cancel: &CancelToken,
    ) -> Result<Prediction, PredictionError> {
        self.generate_at(request, Utc::now(), cancel).await
    }

    /// Produce a prediction as of `now`.
    ///
    /// # Errors
    ///
    /// - [`PredictionError::ChartNotFound`] when the user has no natal chart.
    /// - [`PredictionError::Ephemeris`] when transits cannot be computed.
    /// - [`PredictionError::GenerativeTierUnavailable`] for a paid request
    ///   with no configured provider.
    /// - [`PredictionError::Generation`] when every provider failed.
    /// - [`PredictionError::Cancelled`] when `cancel` fires first.
    pub async fn generate_at(
        &self,
        request: &PredictionRequest,
        now: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> Result<Prediction, PredictionError> {
        if cancel.is_cancelled() {
            return Err(PredictionError::Cancelled);
        }
        let context = self.resolve(&request.user_id, request.period, now).await?;

        let drafted = if request.is_paid_tier {
            self.draft_generated(request, &context, cancel).await?
        } else {
            self.draft_rule_based(request.period, &context)
        };

        let prediction = assemble(request, now, context, drafted);
        tracing::info!(
            user_id = %prediction.user_id,
            period = %prediction.period,
            source = ?prediction.source,
            provider = prediction.provider.as_deref().unwrap_or("none"),
            energy = prediction.energy,
            "prediction generated"
        );
        Ok(prediction)
    }

    /// Stream a paid-tier forecast as raw generated text.
    ///
    /// # Errors
    ///
    /// See [`PredictionPipeline::generate_prediction_stream_with`].
    pub async fn generate_prediction_stream(
        &self,
        user_id: &str,
        period: Period,
    ) -> Result<ChunkStream, PredictionError> {
        let request = PredictionRequest::new(user_id, period).paid();
        self.generate_prediction_stream_with(&request, CancelToken::never())
            .await
    }

    /// Chart and availability errors surface here, before any chunk is
    /// produced; provider failures arrive as a final `Error` chunk.
    ///
    /// # Errors
    ///
    /// - [`PredictionError::StreamingRequiresPaidTier`] for free-tier requests.
    /// - [`PredictionError::ChartNotFound`] and [`PredictionError::Ephemeris`]
    ///   as for [`PredictionPipeline::generate_at`].
    /// - [`PredictionError::GenerativeTierUnavailable`] when no provider is
    ///   configured.
    pub async fn generate_prediction_stream_with(
        &self,
        request: &PredictionRequest,
        cancel: CancelToken,
    ) -> Result<ChunkStream, PredictionError> {
        if !request.is_paid_tier {
            return Err(PredictionError::StreamingRequiresPaidTier);
        }
        let context = self
            .resolve(&request.user_id, request.period, Utc::now())
            .await?;
        if !self.orchestrator.is_available() {
            return Err(PredictionError::GenerativeTierUnavailable);
        }

        let completion = self.completion_request(request.period, &context);
        tracing::debug!(
            user_id = %request.user_id,
            period = %request.period,
            "opening prediction stream"
        );
        Ok(self.orchestrator.generate_streaming(
            completion,
            request.preferred_provider.as_deref(),
            cancel,
        ))
    }

    async fn resolve(
        &self,
        user_id: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<ChartContext, PredictionError> {
        let chart = self.charts.natal_chart(user_id).await?;
        let target = period.target_date(now);
        let transits = self.ephemeris.positions_at(target).await?;
        let aspects = compute_transit_aspects(chart.planets.values(), transits.values());
        tracing::debug!(
            user_id,
            period = %period,
            aspects = aspects.len(),
            "transit aspects computed"
        );
        Ok(ChartContext {
            chart,
            transits,
            aspects,
            target,
        })
    }

    fn draft_rule_based(&self, period: Period, context: &ChartContext) -> Drafted {
        let input = SynthesisInput {
            sun_sign: context.chart.sun_sign(),
            moon_sign: context.chart.moon_sign(),
            dominant: dominant_aspect(&context.aspects),
            aspects: &context.aspects,
            period,
            tone: score_tone(&context.aspects),
        };
        let mut rng = match self.template_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Drafted {
            narrative: synthesize(&input, &mut rng),
            challenges: Vec::new(),
            opportunities: Vec::new(),
            source: PredictionSource::RuleBased,
            provider: None,
            parse_strategy: None,
        }
    }

    async fn draft_generated(
        &self,
        request: &PredictionRequest,
        context: &ChartContext,
        cancel: &CancelToken,
    ) -> Result<Drafted, PredictionError> {
        if !self.orchestrator.is_available() {
            return Err(PredictionError::GenerativeTierUnavailable);
        }

        let completion = self.completion_request(request.period, context);
        let generation = self
            .orchestrator
            .generate_with(&completion, request.preferred_provider.as_deref(), cancel)
            .await?;

        let parsed = parse_response(&generation.text);
        tracing::debug!(
            provider = %generation.provider,
            request_id = %generation.request_id,
            strategy = ?parsed.strategy,
            "generated response parsed"
        );
        Ok(Drafted {
            narrative: parsed.narrative(),
            challenges: parsed.challenges.unwrap_or_default(),
            opportunities: parsed.opportunities.unwrap_or_default(),
            source: PredictionSource::Generated,
            provider: Some(generation.provider),
            parse_strategy: Some(parsed.strategy),
        })
    }

    fn completion_request(&self, period: Period, context: &ChartContext) -> CompletionRequest {
        let prompt = build_prompt(
            &context.chart,
            &context.transits,
            &context.aspects,
            period,
            context.target,
        );
        CompletionRequest::new(SYSTEM_INSTRUCTIONS, prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_output_tokens)
    }
}

fn assemble(
    request: &PredictionRequest,
    now: DateTime<Utc>,
    context: ChartContext,
    drafted: Drafted,
) -> Prediction {
    let energy = compute_energy(&context.aspects);
    Prediction {
        user_id: request.user_id.clone(),
        period: request.period,
        target_date: context.target,
        generated_at: now,
        narrative: drafted.narrative,
        challenges: drafted.challenges,
        opportunities: drafted.opportunities,
        energy,
        mood: derive_mood(energy),
        tone: score_tone(&context.aspects),
        lucky_numbers: lucky_numbers(context.target),
        lucky_colors: lucky_colors(context.chart.sun_sign()),
        dominant_aspect: dominant_aspect(&context.aspects).cloned(),
        source: drafted.source,
        provider: drafted.provider,
        parse_strategy: drafted.parse_strategy,
    }
}
