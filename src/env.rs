//! Build environment selection.
//!
//! The environment is chosen once at startup (from `--env` or the
//! `ASSETFLOW_ENV` variable) and passed by value into every transform when
//! its chain is assembled.

use std::fmt;
use std::str::FromStr;

/// Name of the process variable consulted for the environment.
pub const ENV_VAR: &str = "ASSETFLOW_ENV";

/// Build environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Fast iteration: readable output, source maps.
    #[default]
    Development,
    /// Deployable output: minified, prefixed, transpiled.
    Production,
}

impl Environment {
    /// Read the environment from [`ENV_VAR`], defaulting to development when unset.
    pub fn from_process() -> Result<Self, ParseEnvironmentError> {
        match std::env::var(ENV_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::Development),
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized environment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown environment '{0}' (expected 'development' or 'production')")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}
