//! Deployment mode.
//!
//! weft reads exactly one setting from the environment: whether it runs in
//! production. Everything else is configured in code on [`Server`](crate::Server).

use std::str::FromStr;

/// Name of the environment variable consulted by [`Mode::from_env`].
pub const ENV_VAR: &str = "WEFT_ENV";

/// Deployment mode. Production redacts fault diagnostics from 500 bodies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    /// Reads [`ENV_VAR`]. Unset or unrecognised values mean development.
    pub fn from_env() -> Self {
        std::env::var(ENV_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod"   => Ok(Self::Production),
            "development" | "dev"   => Ok(Self::Development),
            _                       => Err(()),
        }
    }
}
