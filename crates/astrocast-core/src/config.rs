use std::env::VarError;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, ProviderSettings};
use crate::ConfigError;

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but holds an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "value is empty".to_string(),
            });
        }
        Ok(raw)
    };

    let env = parse_environment(&or_default("ASTROCAST_ENV", "development"))?;
    let log_level = or_default("ASTROCAST_LOG_LEVEL", "info");

    let anthropic = ProviderSettings {
        api_key: optional("ANTHROPIC_API_KEY"),
        base_url: parse("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL)?,
        model: parse("ASTROCAST_ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL)?,
        priority: parse_number(&lookup, "ASTROCAST_ANTHROPIC_PRIORITY", "1")?,
    };
    let openai = ProviderSettings {
        api_key: optional("OPENAI_API_KEY"),
        base_url: parse("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)?,
        model: parse("ASTROCAST_OPENAI_MODEL", DEFAULT_OPENAI_MODEL)?,
        priority: parse_number(&lookup, "ASTROCAST_OPENAI_PRIORITY", "2")?,
    };

    let provider_timeout_secs: u64 =
        parse_number(&lookup, "ASTROCAST_PROVIDER_TIMEOUT_SECS", "60")?;
    let provider_max_attempts: u32 =
        parse_number(&lookup, "ASTROCAST_PROVIDER_MAX_ATTEMPTS", "3")?;
    if provider_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ASTROCAST_PROVIDER_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry_backoff_base_ms: u64 =
        parse_number(&lookup, "ASTROCAST_RETRY_BACKOFF_BASE_MS", "1000")?;

    let temperature: f32 = parse_number(&lookup, "ASTROCAST_TEMPERATURE", "0.7")?;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::InvalidEnvVar {
            var: "ASTROCAST_TEMPERATURE".to_string(),
            reason: format!("{temperature} is outside 0.0..=2.0"),
        });
    }
    let max_output_tokens: u32 = parse_number(&lookup, "ASTROCAST_MAX_OUTPUT_TOKENS", "2000")?;

    let pricing_path = optional("ASTROCAST_PRICING_PATH").map(PathBuf::from);

    Ok(AppConfig {
        env,
        log_level,
        anthropic,
        openai,
        provider_timeout_secs,
        provider_max_attempts,
        retry_backoff_base_ms,
        temperature,
        max_output_tokens,
        pricing_path,
    })
}

fn parse_number<F, T>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ASTROCAST_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
