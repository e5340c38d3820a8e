use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectKind {
    Conjunction,
    Sextile,
    Square,
    Trine,
    Opposition,
}

impl AspectKind {
    /// Match priority: the first kind within orb wins.
    pub const PRIORITY: [AspectKind; 5] = [
        AspectKind::Conjunction,
        AspectKind::Sextile,
        AspectKind::Square,
        AspectKind::Trine,
        AspectKind::Opposition,
    ];

    /// Canonical separation in degrees.
    #[must_use]
    pub fn angle(self) -> f64 {
        match self {
            AspectKind::Conjunction => 0.0,
            AspectKind::Sextile => 60.0,
            AspectKind::Square => 90.0,
            AspectKind::Trine => 120.0,
            AspectKind::Opposition => 180.0,
        }
    }

    /// Trine and sextile.
    #[must_use]
    pub fn is_harmonious(self) -> bool {
        matches!(self, AspectKind::Trine | AspectKind::Sextile)
    }

    /// Square and opposition.
    #[must_use]
    pub fn is_tense(self) -> bool {
        matches!(self, AspectKind::Square | AspectKind::Opposition)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AspectKind::Conjunction => "conjunction",
            AspectKind::Sextile => "sextile",
            AspectKind::Square => "square",
            AspectKind::Trine => "trine",
            AspectKind::Opposition => "opposition",
        }
    }
}

impl std::fmt::Display for AspectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum orb, in degrees, tolerated for each aspect kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbTable {
    pub conjunction: f64,
    pub sextile: f64,
    pub square: f64,
    pub trine: f64,
    pub opposition: f64,
}

impl OrbTable {
    /// 8° for the major aspects, 6° for sextile.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            conjunction: 8.0,
            sextile: 6.0,
            square: 8.0,
            trine: 8.0,
            opposition: 8.0,
        }
    }

    /// Transit-to-natal orbs: the standard table with sextile widened to 10°.
    #[must_use]
    pub const fn transit() -> Self {
        Self {
            sextile: 10.0,
            ..Self::standard()
        }
    }

    #[must_use]
    pub fn max_orb(&self, kind: AspectKind) -> f64 {
        match kind {
            AspectKind::Conjunction => self.conjunction,
            AspectKind::Sextile => self.sextile,
            AspectKind::Square => self.square,
            AspectKind::Trine => self.trine,
            AspectKind::Opposition => self.opposition,
        }
    }
}

impl Default for OrbTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Angular relationship between two longitudes, without planet identities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    pub kind: AspectKind,
    /// Absolute deviation from the canonical angle, in degrees.
    pub orb: f64,
    /// `1 - orb / max_orb`, in `[0, 1]`; higher is tighter.
    pub strength: f64,
}

/// An aspect between a natal planet (`source_planet`) and a transiting
/// planet (`target_planet`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectMatch {
    pub source_planet: String,
    pub target_planet: String,
    pub kind: AspectKind,
    pub orb: f64,
    pub strength: f64,
}

impl AspectMatch {
    #[must_use]
    pub fn new(source_planet: &str, target_planet: &str, aspect: Aspect) -> Self {
        Self {
            source_planet: source_planet.to_string(),
            target_planet: target_planet.to_string(),
            kind: aspect.kind,
            orb: aspect.orb,
            strength: aspect.strength,
        }
    }
}
