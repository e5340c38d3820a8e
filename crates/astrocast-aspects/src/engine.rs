//! Aspect detection between planet longitudes.

use std::collections::HashSet;

use astrocast_core::astro::normalize_longitude;
use astrocast_core::PlanetPosition;

use crate::types::{Aspect, AspectKind, AspectMatch, OrbTable};

/// Shortest angular distance between two longitudes, in `[0, 180]`.
fn separation(lon_a: f64, lon_b: f64) -> f64 {
    let diff = (normalize_longitude(lon_a) - normalize_longitude(lon_b)).abs();
    diff.min(360.0 - diff)
}

/// Detect the aspect between two longitudes using the standard orbs.
///
/// Symmetric in its arguments. Returns `None` when no canonical angle is
/// within orb.
#[must_use]
pub fn compute_aspect(lon_a: f64, lon_b: f64) -> Option<Aspect> {
    compute_aspect_with(lon_a, lon_b, &OrbTable::standard())
}

/// Detect the aspect between two longitudes with an explicit orb table.
///
/// Kinds are tried in [`AspectKind::PRIORITY`] order and the first one whose
/// deviation is within its maximum orb is returned.
#[must_use]
pub fn compute_aspect_with(lon_a: f64, lon_b: f64, orbs: &OrbTable) -> Option<Aspect> {
    let sep = separation(lon_a, lon_b);
    for kind in AspectKind::PRIORITY {
        let max_orb = orbs.max_orb(kind);
        if max_orb <= 0.0 {
            continue;
        }
        let orb = (sep - kind.angle()).abs();
        if orb <= max_orb {
            return Some(Aspect {
                kind,
                orb,
                strength: (1.0 - orb / max_orb).clamp(0.0, 1.0),
            });
        }
    }
    None
}

/// All aspects between `natal` and `transiting` planets, standard orbs.
///
/// See [`compute_aspects_with`] for ordering guarantees.
#[must_use]
pub fn compute_all_aspects<'a, N, T>(natal: N, transiting: T) -> Vec<AspectMatch>
where
    N: IntoIterator<Item = &'a PlanetPosition>,
    T: IntoIterator<Item = &'a PlanetPosition>,
{
    compute_aspects_with(natal, transiting, &OrbTable::standard())
}

/// All aspects between natal and transiting planets using the wider
/// transit-to-natal orbs.
#[must_use]
pub fn compute_transit_aspects<'a, N, T>(natal: N, transiting: T) -> Vec<AspectMatch>
where
    N: IntoIterator<Item = &'a PlanetPosition>,
    T: IntoIterator<Item = &'a PlanetPosition>,
{
    compute_aspects_with(natal, transiting, &OrbTable::transit())
}

/// Cartesian product natal × transiting, sorted by descending strength.
///
/// The sort is stable, so equal strengths keep their natal-major arrival
/// order. A planet id repeated within one side is only considered once, which
/// guarantees at most one match per (source, target) pair.
pub fn compute_aspects_with<'a, N, T>(natal: N, transiting: T, orbs: &OrbTable) -> Vec<AspectMatch>
where
    N: IntoIterator<Item = &'a PlanetPosition>,
    T: IntoIterator<Item = &'a PlanetPosition>,
{
    let transiting = dedup_by_planet(transiting);
    let natal = dedup_by_planet(natal);

    let mut matches = Vec::new();
    for source in &natal {
        for target in &transiting {
            if let Some(aspect) = compute_aspect_with(source.longitude, target.longitude, orbs) {
                matches.push(AspectMatch::new(&source.planet, &target.planet, aspect));
            }
        }
    }

    matches.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    matches
}

fn dedup_by_planet<'a, I>(positions: I) -> Vec<&'a PlanetPosition>
where
    I: IntoIterator<Item = &'a PlanetPosition>,
{
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut unique = Vec::new();
    for position in positions {
        if seen.insert(position.planet.as_str()) {
            unique.push(position);
        }
    }
    unique
}
