//! Zodiac signs and planet positions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Width of one zodiac sign along the ecliptic, in degrees.
pub const SIGN_WIDTH_DEG: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    /// All twelve signs in ecliptic order, starting at 0° Aries.
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Sign occupied by an ecliptic longitude. Longitudes outside `[0, 360)`
    /// are wrapped first.
    #[must_use]
    pub fn from_longitude(longitude: f64) -> Self {
        let lon = normalize_longitude(longitude);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (lon / SIGN_WIDTH_DEG).floor() as usize;
        Self::ALL[index.min(11)]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }
}

impl std::fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ZodiacSign {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|sign| sign.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownSign(s.to_string()))
    }
}

/// Wraps any finite longitude into `[0, 360)`.
#[must_use]
pub fn normalize_longitude(longitude: f64) -> f64 {
    let lon = longitude.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if lon >= 360.0 {
        0.0
    } else {
        lon
    }
}

/// Position of one planet on the ecliptic.
///
/// Sign and degree are always derived from the longitude, including when a
/// position is deserialized, so the three fields cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PositionRecord")]
pub struct PlanetPosition {
    /// Lowercase planet identifier, e.g. `"sun"` or `"jupiter"`.
    pub planet: String,
    /// Ecliptic longitude in degrees, `[0, 360)`.
    pub longitude: f64,
    pub sign: ZodiacSign,
    /// Degree within the sign, `[0, 30)`.
    pub degree: f64,
}

impl PlanetPosition {
    #[must_use]
    pub fn new(planet: impl Into<String>, longitude: f64) -> Self {
        let longitude = normalize_longitude(longitude);
        Self {
            planet: planet.into().to_lowercase(),
            longitude,
            sign: ZodiacSign::from_longitude(longitude),
            degree: longitude % SIGN_WIDTH_DEG,
        }
    }
}

#[derive(Deserialize)]
struct PositionRecord {
    planet: String,
    longitude: f64,
}

impl From<PositionRecord> for PlanetPosition {
    fn from(record: PositionRecord) -> Self {
        Self::new(record.planet, record.longitude)
    }
}
