//! Coarse tone, energy, and mood heuristics over an aspect list.

use serde::{Deserialize, Serialize};

use crate::types::{AspectKind, AspectMatch};

/// Net harmonious-minus-tense strength above which the tone is positive.
const TONE_THRESHOLD: f64 = 0.5;

const ENERGY_BASELINE: f64 = 50.0;

/// Energy contributed per unit of strength, by aspect family.
const HARMONIOUS_WEIGHT: f64 = 15.0;
const CONJUNCTION_WEIGHT: f64 = 10.0;
const TENSE_WEIGHT: f64 = 5.0;

/// Mood bands as `(minimum energy, mood)`, highest first.
const MOOD_BANDS: &[(u8, Mood)] = &[
    (80, Mood::Energized),
    (60, Mood::Optimistic),
    (40, Mood::Balanced),
    (20, Mood::Reflective),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Challenging,
}

impl Tone {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Positive => "positive",
            Tone::Neutral => "neutral",
            Tone::Challenging => "challenging",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energized,
    Optimistic,
    Balanced,
    Reflective,
    Restful,
}

impl Mood {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Mood::Energized => "energized",
            Mood::Optimistic => "optimistic",
            Mood::Balanced => "balanced",
            Mood::Reflective => "reflective",
            Mood::Restful => "restful",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify the overall tone of an aspect list.
///
/// Trines and sextiles add their strength, squares and oppositions subtract
/// it; conjunctions do not vote.
#[must_use]
pub fn score_tone(aspects: &[AspectMatch]) -> Tone {
    let score: f64 = aspects
        .iter()
        .map(|a| {
            if a.kind.is_harmonious() {
                a.strength
            } else if a.kind.is_tense() {
                -a.strength
            } else {
                0.0
            }
        })
        .sum();

    if score > TONE_THRESHOLD {
        Tone::Positive
    } else if score < -TONE_THRESHOLD {
        Tone::Challenging
    } else {
        Tone::Neutral
    }
}

/// Energy score in `[0, 100]`, starting from a baseline of 50.
///
/// Every aspect adds energy, so the score never decreases as aspects are
/// added, and the result does not depend on list order.
#[must_use]
pub fn compute_energy(aspects: &[AspectMatch]) -> u8 {
    let total = aspects.iter().fold(ENERGY_BASELINE, |acc, a| {
        let weight = match a.kind {
            AspectKind::Trine | AspectKind::Sextile => HARMONIOUS_WEIGHT,
            AspectKind::Conjunction => CONJUNCTION_WEIGHT,
            AspectKind::Square | AspectKind::Opposition => TENSE_WEIGHT,
        };
        acc + a.strength * weight
    });

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let energy = total.clamp(0.0, 100.0).round() as u8;
    energy
}

#[must_use]
pub fn derive_mood(energy: u8) -> Mood {
    MOOD_BANDS
        .iter()
        .find(|(min, _)| energy >= *min)
        .map_or(Mood::Restful, |(_, mood)| *mood)
}

/// Highest-strength aspect; the earliest one wins ties.
#[must_use]
pub fn dominant_aspect(aspects: &[AspectMatch]) -> Option<&AspectMatch> {
    aspects.iter().fold(None, |best: Option<&AspectMatch>, a| match best {
        Some(b) if b.strength >= a.strength => Some(b),
        _ => Some(a),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect(kind: AspectKind, strength: f64) -> AspectMatch {
        AspectMatch {
            source_planet: "sun".to_string(),
            target_planet: "jupiter".to_string(),
            kind,
            orb: 0.0,
            strength,
        }
    }

    #[test]
    fn empty_list_is_neutral_baseline() {
        assert_eq!(score_tone(&[]), Tone::Neutral);
        assert_eq!(compute_energy(&[]), 50);
        assert!(dominant_aspect(&[]).is_none());
    }

    #[test]
    fn harmonious_aspects_are_positive() {
        let aspects = vec![aspect(AspectKind::Trine, 0.4), aspect(AspectKind::Sextile, 0.3)];
        assert_eq!(score_tone(&aspects), Tone::Positive);
    }

    #[test]
    fn tense_aspects_are_challenging() {
        let aspects = vec![aspect(AspectKind::Square, 0.9)];
        assert_eq!(score_tone(&aspects), Tone::Challenging);
    }

    #[test]
    fn conjunctions_do_not_vote_on_tone() {
        let aspects = vec![
            aspect(AspectKind::Conjunction, 1.0),
            aspect(AspectKind::Conjunction, 1.0),
        ];
        assert_eq!(score_tone(&aspects), Tone::Neutral);
    }

    #[test]
    fn tone_threshold_is_exclusive() {
        let aspects = vec![aspect(AspectKind::Trine, 0.5)];
        assert_eq!(score_tone(&aspects), Tone::Neutral);
    }

    #[test]
    fn energy_weights_by_family() {
        // 50 + 1.0*15 + 1.0*10 + 1.0*5
        let aspects = vec![
            aspect(AspectKind::Trine, 1.0),
            aspect(AspectKind::Conjunction, 1.0),
            aspect(AspectKind::Opposition, 1.0),
        ];
        assert_eq!(compute_energy(&aspects), 80);
    }

    #[test]
    fn energy_rounds_to_nearest() {
        // 50 + 0.375*5 = 51.875
        assert_eq!(compute_energy(&[aspect(AspectKind::Square, 0.375)]), 52);
    }

    #[test]
    fn energy_clamps_at_one_hundred() {
        let aspects: Vec<_> = (0..10).map(|_| aspect(AspectKind::Trine, 1.0)).collect();
        assert_eq!(compute_energy(&aspects), 100);
    }

    #[test]
    fn energy_is_order_invariant() {
        let forward = vec![
            aspect(AspectKind::Trine, 0.25),
            aspect(AspectKind::Square, 0.5),
            aspect(AspectKind::Conjunction, 0.75),
            aspect(AspectKind::Sextile, 0.125),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(compute_energy(&forward), compute_energy(&reversed));
    }

    #[test]
    fn energy_never_decreases_when_aspects_are_added() {
        let mut aspects = Vec::new();
        let mut previous = compute_energy(&aspects);
        for kind in AspectKind::PRIORITY.iter().cycle().take(20) {
            aspects.push(aspect(*kind, 0.6));
            let current = compute_energy(&aspects);
            assert!(current >= previous, "{current} < {previous}");
            previous = current;
        }
    }

    #[test]
    fn mood_bands() {
        assert_eq!(derive_mood(100), Mood::Energized);
        assert_eq!(derive_mood(80), Mood::Energized);
        assert_eq!(derive_mood(79), Mood::Optimistic);
        assert_eq!(derive_mood(60), Mood::Optimistic);
        assert_eq!(derive_mood(59), Mood::Balanced);
        assert_eq!(derive_mood(40), Mood::Balanced);
        assert_eq!(derive_mood(39), Mood::Reflective);
        assert_eq!(derive_mood(20), Mood::Reflective);
        assert_eq!(derive_mood(19), Mood::Restful);
        assert_eq!(derive_mood(0), Mood::Restful);
    }

    #[test]
    fn dominant_aspect_prefers_first_on_ties() {
        let mut first = aspect(AspectKind::Trine, 0.9);
        first.target_planet = "venus".to_string();
        let second = aspect(AspectKind::Square, 0.9);
        let aspects = vec![aspect(AspectKind::Sextile, 0.2), first, second];
        let dominant = dominant_aspect(&aspects).unwrap();
        assert_eq!(dominant.target_planet, "venus");
    }
}
