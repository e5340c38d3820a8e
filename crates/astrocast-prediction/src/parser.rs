//! Tolerant parsing of generative responses.
//!
//! [`parse_response`] never fails. It tries, in order:
//!
//! 1. the whole text as a JSON object;
//! 2. each balanced `{...}` block inside the text, in order (markdown
//!    fences, prose around the JSON);
//! 3. keyword-delimited sections (`General: ... Love: ...`).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Narrative;

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(general|love|career|health|financ\w*|advice)(?:\s+(?:outlook|forecast))?\b",
    )
    .expect("valid section regex")
});

const NARRATIVE_FIELDS: [&str; 6] = ["general", "love", "career", "health", "finance", "advice"];
const LIST_FIELDS: [&str; 2] = ["challenges", "opportunities"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    Structured,
    EmbeddedObject,
    Sections,
}

/// Best-effort extraction. `None` means the field was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrediction {
    pub general: Option<String>,
    pub love: Option<String>,
    pub career: Option<String>,
    pub health: Option<String>,
    pub finance: Option<String>,
    pub advice: Option<String>,
    pub challenges: Option<Vec<String>>,
    pub opportunities: Option<Vec<String>>,
    pub strategy: ParseStrategy,
}

impl ParsedPrediction {
    fn empty(strategy: ParseStrategy) -> Self {
        Self {
            general: None,
            love: None,
            career: None,
            health: None,
            finance: None,
            advice: None,
            challenges: None,
            opportunities: None,
            strategy,
        }
    }

    fn narrative_slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "general" => Some(&mut self.general),
            "love" => Some(&mut self.love),
            "career" => Some(&mut self.career),
            "health" => Some(&mut self.health),
            "finance" => Some(&mut self.finance),
            "advice" => Some(&mut self.advice),
            _ => None,
        }
    }

    /// Absent sections become empty strings.
    #[must_use]
    pub fn narrative(&self) -> Narrative {
        let text = |field: &Option<String>| field.clone().unwrap_or_default();
        Narrative {
            general: text(&self.general),
            love: text(&self.love),
            career: text(&self.career),
            health: text(&self.health),
            finance: text(&self.finance),
            advice: text(&self.advice),
        }
    }
}

#[must_use]
pub fn parse_response(raw: &str) -> ParsedPrediction {
    if let Some(parsed) = parse_structured(raw, ParseStrategy::Structured) {
        return parsed;
    }
    if let Some(parsed) = embedded_objects(raw)
        .find_map(|block| parse_structured(block, ParseStrategy::EmbeddedObject))
    {
        return parsed;
    }
    tracing::debug!("response is not JSON, falling back to section scan");
    parse_sections(raw)
}

fn parse_structured(text: &str, strategy: ParseStrategy) -> Option<ParsedPrediction> {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text.trim()) else {
        return None;
    };

    let mut parsed = ParsedPrediction::empty(strategy);
    for field in NARRATIVE_FIELDS {
        let value = object.get(field).and_then(Value::as_str).map(str::to_owned);
        if value.is_none() {
            tracing::warn!(field, "generated response is missing a narrative field");
        }
        if let Some(slot) = parsed.narrative_slot(field) {
            *slot = value;
        }
    }
    parsed.challenges = string_list(&object, LIST_FIELDS[0]);
    parsed.opportunities = string_list(&object, LIST_FIELDS[1]);
    Some(parsed)
}

fn string_list(object: &Map<String, Value>, field: &str) -> Option<Vec<String>> {
    let list = object.get(field).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect::<Vec<_>>()
    });
    if list.is_none() {
        tracing::warn!(field, "generated response is missing a list field");
    }
    list
}

/// Balanced `{...}` blocks in order of appearance. A `{` that never closes
/// is skipped so later blocks are still found.
fn embedded_objects(text: &str) -> impl Iterator<Item = &str> {
    let mut from = 0;
    std::iter::from_fn(move || {
        while let Some(offset) = text[from..].find('{') {
            let start = from + offset;
            if let Some(block) = balanced_at(text, start) {
                from = start + block.len();
                return Some(block);
            }
            from = start + 1;
        }
        None
    })
}

/// The block opened by the `{` at `start`, ignoring braces inside JSON
/// strings.
fn balanced_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn field_for_keyword(keyword: &str) -> &'static str {
    let lower = keyword.to_ascii_lowercase();
    match lower.as_str() {
        "general" => "general",
        "love" => "love",
        "career" => "career",
        "health" => "health",
        "advice" => "advice",
        _ => "finance",
    }
}

fn parse_sections(raw: &str) -> ParsedPrediction {
    let hits: Vec<(&'static str, usize, usize)> = SECTION_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let keyword = caps.get(1)?;
            Some((field_for_keyword(keyword.as_str()), whole.start(), whole.end()))
        })
        .collect();

    let mut parsed = ParsedPrediction::empty(ParseStrategy::Sections);
    for field in NARRATIVE_FIELDS {
        let text = hits
            .iter()
            .position(|(f, _, _)| *f == field)
            .map(|index| {
                let (_, _, body_start) = hits[index];
                let body_end = hits[index + 1..]
                    .iter()
                    .find(|(f, _, _)| *f != field)
                    .map_or(raw.len(), |(_, start, _)| *start);
                clean_section(&raw[body_start..body_end])
            })
            .unwrap_or_default();
        if let Some(slot) = parsed.narrative_slot(field) {
            *slot = Some(text);
        }
    }
    parsed
}

fn clean_section(body: &str) -> String {
    const MARKUP: &[char] = &[':', '-', '*', '#'];
    body.trim_start_matches(|c: char| c.is_whitespace() || MARKUP.contains(&c))
        .trim_end_matches(|c: char| c.is_whitespace() || MARKUP.contains(&c))
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_present_fields_only() {
        let parsed = parse_response(r#"{"general":"ok","love":"ok"}"#);
        assert_eq!(parsed.strategy, ParseStrategy::Structured);
        assert_eq!(parsed.general.as_deref(), Some("ok"));
        assert_eq!(parsed.love.as_deref(), Some("ok"));
        assert_eq!(parsed.career, None);
        assert_eq!(parsed.health, None);
        assert_eq!(parsed.finance, None);
        assert_eq!(parsed.advice, None);
        assert_eq!(parsed.challenges, None);
        assert_eq!(parsed.opportunities, None);

        let narrative = parsed.narrative();
        assert_eq!(narrative.general, "ok");
        assert_eq!(narrative.career, "");
    }

    #[test]
    fn full_json_extracts_lists() {
        let raw = serde_json::json!({
            "general": "g", "love": "l", "career": "c",
            "health": "h", "finance": "f", "advice": "a",
            "challenges": ["one", "two", "three"],
            "opportunities": ["x", 42, "y"]
        })
        .to_string();
        let parsed = parse_response(&raw);
        assert_eq!(parsed.finance.as_deref(), Some("f"));
        assert_eq!(
            parsed.challenges,
            Some(vec!["one".to_owned(), "two".to_owned(), "three".to_owned()])
        );
        assert_eq!(parsed.opportunities, Some(vec!["x".to_owned(), "y".to_owned()]));
    }

    #[test]
    fn fenced_json_uses_embedded_object() {
        let raw = "Here is your forecast:\n```json\n{\"general\": \"Bright {days} ahead\", \"advice\": \"Say \\\"yes\\\"\"}\n```\nEnjoy!";
        let parsed = parse_response(raw);
        assert_eq!(parsed.strategy, ParseStrategy::EmbeddedObject);
        assert_eq!(parsed.general.as_deref(), Some("Bright {days} ahead"));
        assert_eq!(parsed.advice.as_deref(), Some("Say \"yes\""));
    }

    #[test]
    fn nested_objects_are_balanced() {
        let raw = r#"prefix {"general": "g", "meta": {"x": {"y": 1}}} suffix {"love": "later"}"#;
        let blocks: Vec<&str> = embedded_objects(raw).collect();
        assert_eq!(
            blocks,
            vec![r#"{"general": "g", "meta": {"x": {"y": 1}}}"#, r#"{"love": "later"}"#]
        );
    }

    #[test]
    fn prose_braces_before_the_json_are_skipped() {
        let parsed = parse_response(r#"Note {draft} below: {"general":"g","love":"l"}"#);
        assert_eq!(parsed.strategy, ParseStrategy::EmbeddedObject);
        assert_eq!(parsed.general.as_deref(), Some("g"));
        assert_eq!(parsed.love.as_deref(), Some("l"));
    }

    #[test]
    fn unclosed_brace_does_not_hide_later_object() {
        let parsed = parse_response(r#"{ draft cut off... {"advice":"wait"}"#);
        assert_eq!(parsed.strategy, ParseStrategy::EmbeddedObject);
        assert_eq!(parsed.advice.as_deref(), Some("wait"));
    }

    #[test]
    fn outlook_suffix_belongs_to_the_heading() {
        let parsed = parse_response("Career forecast: Promotion.\nFinances: Tight.");
        assert_eq!(parsed.career.as_deref(), Some("Promotion."));
        assert_eq!(parsed.finance.as_deref(), Some("Tight."));
    }

    #[test]
    fn unbalanced_braces_fall_through_to_sections() {
        let parsed = parse_response("General: { unfinished\nLove: steady");
        assert_eq!(parsed.strategy, ParseStrategy::Sections);
        assert_eq!(parsed.general.as_deref(), Some("{ unfinished"));
        assert_eq!(parsed.love.as_deref(), Some("steady"));
    }

    #[test]
    fn plain_text_sections_are_split_by_keyword() {
        let raw = "## General\nA strong week.\n\n**Love:** Sweet talk.\nCareer - New tasks.\nHealth: Rest.\nFinancial outlook: Save more.\nAdvice: Breathe.";
        let parsed = parse_response(raw);
        assert_eq!(parsed.strategy, ParseStrategy::Sections);
        assert_eq!(parsed.general.as_deref(), Some("A strong week."));
        assert_eq!(parsed.love.as_deref(), Some("Sweet talk."));
        assert_eq!(parsed.career.as_deref(), Some("New tasks."));
        assert_eq!(parsed.health.as_deref(), Some("Rest."));
        assert_eq!(parsed.finance.as_deref(), Some("Save more."));
        assert_eq!(parsed.advice.as_deref(), Some("Breathe."));
        assert_eq!(parsed.challenges, None);
    }

    #[test]
    fn missing_sections_become_empty_strings() {
        let parsed = parse_response("Love: all good");
        assert_eq!(parsed.love.as_deref(), Some("all good"));
        assert_eq!(parsed.general.as_deref(), Some(""));
        assert_eq!(parsed.advice.as_deref(), Some(""));
    }

    #[test]
    fn garbage_never_panics() {
        for raw in ["", "}", "{", "\"", "{\"a\": \"\\", "💫 stars"] {
            let parsed = parse_response(raw);
            assert_eq!(parsed.strategy, ParseStrategy::Sections);
        }
    }

    #[test]
    fn non_object_json_is_not_structured() {
        let parsed = parse_response("[1, 2, 3]");
        assert_eq!(parsed.strategy, ParseStrategy::Sections);
    }
}
