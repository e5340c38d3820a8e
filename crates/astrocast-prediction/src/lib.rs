//! Prediction pipeline: natal chart + transits → aspects → narrative.
//!
//! Free-tier requests are answered by the rule-based [`synthesizer`]; paid
//! requests go through the generative [`Orchestrator`](astrocast_providers::Orchestrator)
//! and the tolerant response [`parser`].

pub mod collaborators;
pub mod error;
pub mod lucky;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod synthesizer;
pub mod types;

pub use collaborators::{ChartStore, Ephemeris, HouseCusp, NatalChart};
pub use error::{ChartStoreError, EphemerisError, PredictionError};
pub use lucky::{lucky_colors, lucky_numbers};
pub use parser::{parse_response, ParseStrategy, ParsedPrediction};
pub use pipeline::{GenerationSettings, PredictionPipeline};
pub use types::{Narrative, Prediction, PredictionRequest, PredictionSource};
