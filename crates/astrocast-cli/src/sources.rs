//! File-backed chart store and ephemeris for local runs.
//!
//! Charts are read from a JSON object keyed by user id, each holding bare
//! planet longitudes and house signs:
//!
//! ```json
//! { "user-1": { "planets": { "sun": 10.0 }, "houses": { "1": "leo" } } }
//! ```
//!
//! Transits are a flat planet→longitude map and apply to every instant.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use astrocast_core::{PlanetPosition, ZodiacSign};
use astrocast_prediction::{ChartStore, ChartStoreError, Ephemeris, EphemerisError, NatalChart};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChartRecord {
    planets: BTreeMap<String, f64>,
    #[serde(default)]
    houses: BTreeMap<u8, ZodiacSign>,
}

impl From<ChartRecord> for NatalChart {
    fn from(record: ChartRecord) -> Self {
        let chart = NatalChart::from_longitudes(
            record
                .planets
                .iter()
                .map(|(planet, lon)| (planet.as_str(), *lon)),
        );
        record
            .houses
            .into_iter()
            .fold(chart, |chart, (house, sign)| chart.with_house(house, sign))
    }
}

pub(crate) struct FileChartStore {
    charts: HashMap<String, NatalChart>,
}

impl FileChartStore {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading charts from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing charts in {}", path.display()))
    }

    fn from_json(raw: &str) -> anyhow::Result<Self> {
        let records: HashMap<String, ChartRecord> = serde_json::from_str(raw)?;
        let charts = records
            .into_iter()
            .map(|(user, record)| (user, NatalChart::from(record)))
            .collect();
        Ok(Self { charts })
    }
}

#[async_trait]
impl ChartStore for FileChartStore {
    async fn natal_chart(&self, user_id: &str) -> Result<NatalChart, ChartStoreError> {
        self.charts
            .get(user_id)
            .cloned()
            .ok_or_else(|| ChartStoreError::NotFound {
                user_id: user_id.to_owned(),
            })
    }
}

pub(crate) struct FileEphemeris {
    positions: BTreeMap<String, PlanetPosition>,
}

impl FileEphemeris {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading transits from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing transits in {}", path.display()))
    }

    fn from_json(raw: &str) -> anyhow::Result<Self> {
        let longitudes: BTreeMap<String, f64> = serde_json::from_str(raw)?;
        let positions = longitudes
            .into_iter()
            .map(|(planet, lon)| {
                let position = PlanetPosition::new(planet, lon);
                (position.planet.clone(), position)
            })
            .collect();
        Ok(Self { positions })
    }
}

#[async_trait]
impl Ephemeris for FileEphemeris {
    async fn positions_at(
        &self,
        at: DateTime<Utc>,
    ) -> Result<BTreeMap<String, PlanetPosition>, EphemerisError> {
        if self.positions.is_empty() {
            return Err(EphemerisError::Unavailable(format!(
                "transit file has no positions for {at}"
            )));
        }
        Ok(self.positions.clone())
    }
}
