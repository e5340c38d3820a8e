//! Per-provider token pricing used for usage cost estimates.
//!
//! Vendor prices drift, so the table is configuration data: a built-in
//! default that a YAML file (`ASTROCAST_PRICING_PATH`) can replace.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const TOKENS_PER_MILLION: u32 = 1_000_000;

/// USD price per million tokens for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_mtok: Decimal,
    pub output_per_mtok: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default)]
    pub providers: BTreeMap<String, ModelPrice>,
}

impl PriceTable {
    /// Prices shipped with the binary, keyed by provider id.
    #[must_use]
    pub fn builtin() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "anthropic".to_string(),
            ModelPrice {
                input_per_mtok: Decimal::new(300, 2),
                output_per_mtok: Decimal::new(1500, 2),
            },
        );
        providers.insert(
            "openai".to_string(),
            ModelPrice {
                input_per_mtok: Decimal::new(15, 2),
                output_per_mtok: Decimal::new(60, 2),
            },
        );
        Self { providers }
    }

    #[must_use]
    pub fn price_for(&self, provider: &str) -> Option<&ModelPrice> {
        self.providers.get(provider)
    }

    /// `input × in_price / 1e6 + output × out_price / 1e6`.
    ///
    /// Providers missing from the table cost zero.
    #[must_use]
    pub fn estimate_cost(&self, provider: &str, input_tokens: u64, output_tokens: u64) -> Decimal {
        let Some(price) = self.price_for(provider) else {
            return Decimal::ZERO;
        };
        let million = Decimal::from(TOKENS_PER_MILLION);
        Decimal::from(input_tokens) * price.input_per_mtok / million
            + Decimal::from(output_tokens) * price.output_per_mtok / million
    }
}

/// Load and validate a price table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or contains a
/// negative price.
pub fn load_price_table(path: &Path) -> Result<PriceTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PricingFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_price_table(&content)
}

fn parse_price_table(content: &str) -> Result<PriceTable, ConfigError> {
    let table: PriceTable = serde_yaml::from_str(content).map_err(ConfigError::PricingFileParse)?;
    validate_price_table(&table)?;
    Ok(table)
}

fn validate_price_table(table: &PriceTable) -> Result<(), ConfigError> {
    for (provider, price) in &table.providers {
        if provider.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pricing provider id must be non-empty".to_string(),
            ));
        }
        if price.input_per_mtok.is_sign_negative() || price.output_per_mtok.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "provider '{provider}' has a negative price"
            )));
        }
    }
    Ok(())
}
