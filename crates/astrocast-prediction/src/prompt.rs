use std::collections::BTreeMap;
use std::fmt::Write as _;

use astrocast_aspects::AspectMatch;
use astrocast_core::{Period, PlanetPosition, ZodiacSign};
use chrono::{DateTime, Utc};

use crate::collaborators::NatalChart;

/// Aspects listed in the prompt, strongest first.
const PROMPT_ASPECT_LIMIT: usize = 10;

pub const SYSTEM_INSTRUCTIONS: &str = "You are an experienced astrologer writing personal \
horoscopes. Ground every statement in the chart data you are given. Reply with a single JSON \
object and nothing else. The object has the string keys \"general\", \"love\", \"career\", \
\"health\", \"finance\" and \"advice\" (two to four sentences each), plus \"challenges\" and \
\"opportunities\", each an array of exactly three short strings.";

/// User-turn prompt describing the chart, the transits and their aspects.
#[must_use]
pub fn build_prompt(
    chart: &NatalChart,
    transits: &BTreeMap<String, PlanetPosition>,
    aspects: &[AspectMatch],
    period: Period,
    target: DateTime<Utc>,
) -> String {
    let sign = |s: Option<ZodiacSign>| s.map_or_else(|| "unknown".to_owned(), |s| s.to_string());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Write the horoscope for {} ({}).",
        period.display_phrase(),
        target.format("%A, %B %-d, %Y")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Sun sign: {}", sign(chart.sun_sign()));
    let _ = writeln!(out, "Moon sign: {}", sign(chart.moon_sign()));
    let _ = writeln!(out, "Ascendant: {}", sign(chart.ascendant()));

    let _ = writeln!(out);
    let _ = writeln!(out, "Natal planets:");
    write_positions(&mut out, chart.planets.values());

    let _ = writeln!(out);
    let _ = writeln!(out, "Transiting planets:");
    write_positions(&mut out, transits.values());

    let _ = writeln!(out);
    if aspects.is_empty() {
        let _ = writeln!(out, "No significant transit aspects are active.");
    } else {
        let _ = writeln!(out, "Active transit aspects (strongest first):");
        for aspect in aspects.iter().take(PROMPT_ASPECT_LIMIT) {
            let _ = writeln!(
                out,
                "- transiting {} {} natal {} (orb {:.1}°, strength {:.2})",
                aspect.target_planet, aspect.kind, aspect.source_planet, aspect.orb, aspect.strength
            );
        }
    }
    out
}

fn write_positions<'a>(out: &mut String, positions: impl Iterator<Item = &'a PlanetPosition>) {
    for position in positions {
        let _ = writeln!(
            out,
            "- {}: {:.1}° {}",
            position.planet, position.degree, position.sign
        );
    }
}
