//! Shared domain types and configuration for astrocast.
//!
//! Holds the vocabulary every other crate speaks: zodiac signs, planet
//! positions, forecast periods, the provider price table, and the
//! environment-driven [`AppConfig`].

pub mod app_config;
pub mod astro;
pub mod config;
pub mod error;
pub mod period;
pub mod pricing;

pub use app_config::{AppConfig, Environment, ProviderSettings};
pub use astro::{PlanetPosition, ZodiacSign};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use period::Period;
pub use pricing::{load_price_table, ModelPrice, PriceTable};
