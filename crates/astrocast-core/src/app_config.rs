use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Credentials and endpoint for one generative-text provider.
///
/// A provider with no `api_key` is listed but never called.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Fallback rank; `1` is tried first.
    pub priority: u8,
}

impl ProviderSettings {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("priority", &self.priority)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub anthropic: ProviderSettings,
    pub openai: ProviderSettings,
    pub provider_timeout_secs: u64,
    /// Attempts per provider before falling back to the next one.
    pub provider_max_attempts: u32,
    /// Base delay for exponential backoff: `base * 2^(attempt - 1)`.
    pub retry_backoff_base_ms: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// YAML price table; the built-in table is used when unset.
    pub pricing_path: Option<PathBuf>,
}
