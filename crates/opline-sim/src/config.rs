use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// Simulator tuning. All intervals are milliseconds in the TOML file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the traffic generator; equal seeds replay equal traffic.
    pub seed: u64,
    pub event_interval_ms: u64,
    pub error_interval_ms: u64,
    /// How often a random clear is rolled.
    pub clear_interval_ms: u64,
    /// Chance that a roll actually clears an unresolved error.
    pub clear_probability: f64,
    pub handshake_interval_ms: u64,
    pub handshake_attempts: u32,
    pub read_timeout_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            event_interval_ms: 250,
            error_interval_ms: 900,
            clear_interval_ms: 1200,
            clear_probability: 0.3,
            handshake_interval_ms: 500,
            handshake_attempts: 20,
            read_timeout_ms: 50,
        }
    }
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn event_interval(&self) -> Duration {
        Duration::from_millis(self.event_interval_ms)
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_millis(self.error_interval_ms)
    }

    pub fn clear_interval(&self) -> Duration {
        Duration::from_millis(self.clear_interval_ms)
    }

    pub fn handshake_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
