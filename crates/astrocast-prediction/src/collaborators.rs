//! Data sources the pipeline consumes but does not own.

use std::collections::BTreeMap;

use astrocast_aspects::AspectMatch;
use astrocast_core::{PlanetPosition, ZodiacSign};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChartStoreError, EphemerisError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseCusp {
    pub sign: ZodiacSign,
}

/// Planet positions and houses at a person's birth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NatalChart {
    /// Keyed by lowercase planet id.
    pub planets: BTreeMap<String, PlanetPosition>,
    /// Keyed by house number, 1 through 12.
    #[serde(default)]
    pub houses: BTreeMap<u8, HouseCusp>,
    /// Natal-to-natal aspects, when the store precomputed them.
    #[serde(default)]
    pub aspects: Option<Vec<AspectMatch>>,
}

impl NatalChart {
    /// Build a chart from `(planet, longitude)` pairs.
    pub fn from_longitudes<'a, I>(longitudes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let planets = longitudes
            .into_iter()
            .map(|(planet, lon)| {
                let position = PlanetPosition::new(planet, lon);
                (position.planet.clone(), position)
            })
            .collect();
        Self {
            planets,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_house(mut self, house: u8, sign: ZodiacSign) -> Self {
        self.houses.insert(house, HouseCusp { sign });
        self
    }

    #[must_use]
    pub fn sun_sign(&self) -> Option<ZodiacSign> {
        self.planets.get("sun").map(|p| p.sign)
    }

    #[must_use]
    pub fn moon_sign(&self) -> Option<ZodiacSign> {
        self.planets.get("moon").map(|p| p.sign)
    }

    /// Sign on the first house cusp.
    #[must_use]
    pub fn ascendant(&self) -> Option<ZodiacSign> {
        self.houses.get(&1).map(|h| h.sign)
    }
}

/// Source of natal charts, e.g. a database.
#[async_trait]
pub trait ChartStore: Send + Sync {
    /// # Errors
    ///
    /// [`ChartStoreError::NotFound`] when the user has no chart;
    /// [`ChartStoreError::Backend`] for storage failures.
    async fn natal_chart(&self, user_id: &str) -> Result<NatalChart, ChartStoreError>;
}

/// Source of planetary positions at an instant.
#[async_trait]
pub trait Ephemeris: Send + Sync {
    /// # Errors
    ///
    /// [`EphemerisError::Unavailable`] when positions cannot be computed.
    async fn positions_at(
        &self,
        at: DateTime<Utc>,
    ) -> Result<BTreeMap<String, PlanetPosition>, EphemerisError>;
}
