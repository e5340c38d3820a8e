//! Lucky numbers and colors, derived deterministically.

use astrocast_core::ZodiacSign;
use chrono::{DateTime, Datelike, Utc};

const CANDIDATES: u32 = 5;
const NEUTRAL_COLORS: [&str; 2] = ["white", "silver"];

/// Up to five distinct numbers in `1..=90`, seeded from the target date.
///
/// `seed = day_of_month + month × 31`; candidate `i` is
/// `(seed × (i + 1) × 7) mod 90 + 1`. Duplicates are dropped, keeping the
/// first occurrence.
#[must_use]
pub fn lucky_numbers(target: DateTime<Utc>) -> Vec<u8> {
    let seed = target.day() + target.month() * 31;
    let mut numbers: Vec<u8> = Vec::with_capacity(CANDIDATES as usize);
    for i in 0..CANDIDATES {
        let candidate = (seed * (i + 1) * 7) % 90 + 1;
        // Always in 1..=90.
        let candidate = u8::try_from(candidate).unwrap_or(u8::MAX);
        if !numbers.contains(&candidate) {
            numbers.push(candidate);
        }
    }
    numbers
}

/// Two colors associated with the sun sign; white and silver when the sign
/// is unknown.
#[must_use]
pub fn lucky_colors(sun_sign: Option<ZodiacSign>) -> Vec<String> {
    let pair = sun_sign.map_or(NEUTRAL_COLORS, sign_colors);
    pair.iter().map(|c| (*c).to_owned()).collect()
}

fn sign_colors(sign: ZodiacSign) -> [&'static str; 2] {
    match sign {
        ZodiacSign::Aries => ["red", "scarlet"],
        ZodiacSign::Taurus => ["green", "pink"],
        ZodiacSign::Gemini => ["yellow", "light blue"],
        ZodiacSign::Cancer => ["silver", "sea green"],
        ZodiacSign::Leo => ["gold", "orange"],
        ZodiacSign::Virgo => ["navy", "beige"],
        ZodiacSign::Libra => ["pink", "lavender"],
        ZodiacSign::Scorpio => ["crimson", "black"],
        ZodiacSign::Sagittarius => ["purple", "royal blue"],
        ZodiacSign::Capricorn => ["brown", "charcoal"],
        ZodiacSign::Aquarius => ["turquoise", "electric blue"],
        ZodiacSign::Pisces => ["lavender", "aquamarine"],
    }
}
