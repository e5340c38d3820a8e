use std::io::Write;

use astrocast_core::Period;
use astrocast_prediction::{Prediction, PredictionPipeline, PredictionRequest};
use astrocast_providers::{cancel_pair, Orchestrator, StreamChunk};
use futures::StreamExt;

#[derive(Debug)]
pub(crate) struct PredictOptions {
    pub user: String,
    pub period: Period,
    pub paid: bool,
    pub provider: Option<String>,
    pub json: bool,
}

/// Print the provider list, primary first.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub(crate) fn run_status(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&orchestrator.status())?);
    Ok(())
}

/// # Errors
///
/// Returns an error if serialization fails.
pub(crate) fn run_pricing(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(orchestrator.pricing())?);
    Ok(())
}

/// Generate one prediction and print it.
///
/// # Errors
///
/// Returns an error if the chart is missing, the paid tier is unavailable, or
/// every provider failed.
pub(crate) async fn run_predict(
    pipeline: &PredictionPipeline,
    options: PredictOptions,
) -> anyhow::Result<()> {
    let mut request = PredictionRequest::new(options.user, options.period);
    request.is_paid_tier = options.paid;
    request.preferred_provider = options.provider;

    let prediction = pipeline.generate(&request).await?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        print!("{}", render(&prediction));
    }
    Ok(())
}

/// Stream a paid-tier prediction to stdout. Ctrl-C cancels the request.
///
/// # Errors
///
/// Returns an error if the stream could not be opened or ended with an error
/// chunk.
pub(crate) async fn run_stream(
    pipeline: &PredictionPipeline,
    user: &str,
    period: Period,
    provider: Option<String>,
) -> anyhow::Result<()> {
    let mut request = PredictionRequest::new(user, period).paid();
    request.preferred_provider = provider;

    let (handle, token) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let mut stream = pipeline
        .generate_prediction_stream_with(&request, token)
        .await?;
    let mut stdout = std::io::stdout();
    let mut outcome = Ok(());
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Text(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamChunk::Done => break,
            StreamChunk::Error(message) => {
                outcome = Err(anyhow::anyhow!("stream ended with an error: {message}"));
                break;
            }
        }
    }
    writeln!(stdout)?;
    interrupt.abort();
    outcome
}

fn render(prediction: &Prediction) -> String {
    let narrative = &prediction.narrative;
    let mut out = format!(
        "{} forecast for {} ({}), {:?} source\n\n",
        prediction.period.display_phrase(),
        prediction.user_id,
        prediction.target_date.format("%Y-%m-%d"),
        prediction.source,
    );
    for (title, text) in [
        ("General", &narrative.general),
        ("Love", &narrative.love),
        ("Career", &narrative.career),
        ("Health", &narrative.health),
        ("Finance", &narrative.finance),
        ("Advice", &narrative.advice),
    ] {
        out.push_str(&format!("{title}: {text}\n"));
    }
    if !prediction.challenges.is_empty() {
        out.push_str(&format!("\nChallenges: {}\n", prediction.challenges.join("; ")));
    }
    if !prediction.opportunities.is_empty() {
        out.push_str(&format!(
            "Opportunities: {}\n",
            prediction.opportunities.join("; ")
        ));
    }
    let numbers: Vec<String> = prediction.lucky_numbers.iter().map(ToString::to_string).collect();
    out.push_str(&format!(
        "\nEnergy {} ({}), tone {}\nLucky numbers: {}\nLucky colors: {}\n",
        prediction.energy,
        prediction.mood,
        prediction.tone,
        numbers.join(", "),
        prediction.lucky_colors.join(", "),
    ));
    if let Some(provider) = &prediction.provider {
        out.push_str(&format!("Generated by {provider}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use astrocast_aspects::{Mood, Tone};
    use astrocast_prediction::{Narrative, PredictionSource};
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn render_includes_sections_and_lucky_values() {
        let target = Utc.with_ymd_and_hms(2026, 1, 14, 9, 0, 0).unwrap();
        let prediction = Prediction {
            user_id: "u1".to_owned(),
            period: Period::Week,
            target_date: target,
            generated_at: target,
            narrative: Narrative {
                general: "Big week.".to_owned(),
                advice: "Rest.".to_owned(),
                ..Narrative::default()
            },
            challenges: vec![],
            opportunities: vec!["travel".to_owned()],
            energy: 72,
            mood: Mood::Optimistic,
            tone: Tone::Positive,
            lucky_numbers: vec![46, 1],
            lucky_colors: vec!["gold".to_owned(), "orange".to_owned()],
            dominant_aspect: None,
            source: PredictionSource::RuleBased,
            provider: None,
            parse_strategy: None,
        };

        let text = render(&prediction);
        assert!(text.starts_with("this week forecast for u1 (2026-01-14)"));
        assert!(text.contains("General: Big week.\n"));
        assert!(text.contains("Opportunities: travel\n"));
        assert!(!text.contains("Challenges"));
        assert!(text.contains("Energy 72 (optimistic), tone positive\n"));
        assert!(text.contains("Lucky numbers: 46, 1\n"));
        assert!(text.contains("Lucky colors: gold, orange\n"));
        assert!(!text.contains("Generated by"));
    }
}
