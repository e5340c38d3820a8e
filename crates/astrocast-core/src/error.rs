use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown zodiac sign: {0}")]
    UnknownSign(String),

    #[error("unknown forecast period: {0}")]
    UnknownPeriod(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read pricing file {path}: {source}")]
    PricingFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pricing file: {0}")]
    PricingFileParse(#[source] serde_yaml::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
