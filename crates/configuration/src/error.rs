use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration document must be a JSON object")]
    NotAnObject,

    #[error("Required integration '{name}' was not defined! I see: {available}")]
    MissingIntegration { name: String, available: String },

    #[error("Integration '{integration}' is missing the '{key}' key")]
    MissingKey {
        integration: String,
        key: &'static str,
    },
}
