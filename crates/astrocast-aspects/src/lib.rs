//! Aspect engine and tone heuristics.
//!
//! Pure functions only: turns natal and transiting planet sets into a ranked
//! list of [`AspectMatch`]es, then reduces that list to a coarse [`Tone`], an
//! energy score, and a [`Mood`] label. No I/O happens in this crate.

pub mod engine;
pub mod tone;
pub mod types;

pub use engine::{compute_all_aspects, compute_aspect, compute_aspect_with, compute_transit_aspects};
pub use tone::{compute_energy, derive_mood, dominant_aspect, score_tone, Mood, Tone};
pub use types::{Aspect, AspectKind, AspectMatch, OrbTable};
