//! Settings loader for the curator backend.
//!
//! The settings document is JSON with one extension: any line whose trimmed
//! content starts with `#` is a comment and is stripped before parsing.
//! External services live under the `integrations` key, e.g. the `Postgres`
//! integration holding the production and test connection strings.
//!
//! A `Configuration` is an explicit value constructed once at startup and
//! passed down to whoever needs it. A missing or malformed settings file is
//! fatal at startup: `load` returns an error instead of leaving the process
//! running unconfigured.

use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;

pub mod error;

pub use error::ConfigError as Error;

/// Key of the external-services namespace in the settings document.
pub const INTEGRATIONS: &str = "integrations";

/// Key of the local data directory setting.
pub const DATA_DIRECTORY: &str = "data_directory";

/// The parsed settings document.
#[derive(Debug, Clone)]
pub struct Configuration {
    root: Map<String, Value>,
}

impl Configuration {
    /// Name of the integration holding the database connection strings.
    pub const DATABASE_INTEGRATION: &'static str = "Postgres";
    const PRODUCTION_URL: &'static str = "production_url";
    const TEST_URL: &'static str = "test_url";

    /// Reads and parses the settings document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Returns the raw value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Returns the sub-mapping for a named integration, if it is defined
    /// and non-empty.
    pub fn integration(&self, name: &str) -> Option<&Map<String, Value>> {
        self.get(INTEGRATIONS)?
            .as_object()?
            .get(name)?
            .as_object()
            .filter(|map| !map.is_empty())
    }

    /// Like [`integration`](Self::integration), but an absent or empty
    /// integration is an error that names the integrations that do exist.
    pub fn required_integration(&self, name: &str) -> Result<&Map<String, Value>, ConfigError> {
        self.integration(name).ok_or_else(|| {
            let mut available: Vec<&str> = self
                .get(INTEGRATIONS)
                .and_then(Value::as_object)
                .map(|map| map.keys().map(String::as_str).collect())
                .unwrap_or_default();
            available.sort_unstable();
            ConfigError::MissingIntegration {
                name: name.to_string(),
                available: available.join(", "),
            }
        })
    }

    /// The production or test database connection string, per the `test`
    /// flag, from the `Postgres` integration.
    pub fn database_url(&self, test: bool) -> Result<&str, ConfigError> {
        let integration = self.required_integration(Self::DATABASE_INTEGRATION)?;
        let key = if test {
            Self::TEST_URL
        } else {
            Self::PRODUCTION_URL
        };
        integration
            .get(key)
            .and_then(Value::as_str)
            .ok_or(ConfigError::MissingKey {
                integration: Self::DATABASE_INTEGRATION.to_string(),
                key,
            })
    }

    /// The configured local data directory, if any.
    pub fn data_directory(&self) -> Option<&str> {
        self.get(DATA_DIRECTORY).and_then(Value::as_str)
    }
}

impl FromStr for Configuration {
    type Err = ConfigError;

    /// Parses a settings document, stripping full-line `#` comments first.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let stripped: Vec<&str> = text
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect();
        let value: Value = serde_json::from_str(&stripped.join("\n"))?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(ConfigError::NotAnObject),
        }
    }
}
