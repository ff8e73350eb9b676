//! Configuration
//!
//! Options for schedules and rate limiters. All options deserialize from
//! JSON, and every field has a default so partial documents are accepted.
//!
//! ```rust,ignore
//! let options = ScheduleOptions::from_json(r#"{ "name": "physics", "mode": "no_yield" }"#)?;
//! let schedule = SequentialSchedule::<f64>::with_options(options);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a schedule's `run` entry point executes task bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Task bodies may suspend; suspension suspends the whole run.
    #[default]
    Cooperative,

    /// Task bodies must finish without suspending.
    NoYield,
}

/// Options shared by sequential and parallel schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// Name used in log events.
    pub name: String,

    /// Mode used by `run`.
    pub mode: ExecutionMode,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            name: "schedule".to_string(),
            mode: ExecutionMode::Cooperative,
        }
    }
}

impl ScheduleOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for a [`RateLimiter`](crate::periodic::RateLimiter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitOptions {
    /// Target invocations per second.
    pub frequency_hz: f64,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self { frequency_hz: 30.0 }
    }
}

impl RateLimitOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
