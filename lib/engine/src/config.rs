//! Engine configuration.

use serde::Deserialize;
use std::time::Duration;

fn default_max_tool_rounds() -> u32 {
    8
}

fn default_completion_timeout_seconds() -> u64 {
    60
}

fn default_tool_timeout_seconds() -> u64 {
    30
}

/// Operational limits for a single turn.
///
/// Every field has a default; `from_env` overrides from `ENGINE_*`
/// environment variables (e.g. `ENGINE_MAX_TOOL_ROUNDS=4`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Maximum tool round-trips per turn before the loop gives up.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Deadline for a single completion call.
    #[serde(default = "default_completion_timeout_seconds")]
    pub completion_timeout_seconds: u64,
    /// Deadline for a single tool invocation.
    #[serde(default = "default_tool_timeout_seconds")]
    pub tool_timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            completion_timeout_seconds: default_completion_timeout_seconds(),
            tool_timeout_seconds: default_tool_timeout_seconds(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment override cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("ENGINE"))
            .build()?
            .try_deserialize()
    }

    /// Returns the completion deadline as a [`Duration`].
    #[must_use]
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_seconds)
    }

    /// Returns the tool deadline as a [`Duration`].
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }
}
