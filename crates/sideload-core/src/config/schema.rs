//! Schema of sideload.toml.

use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Polling used to recover a package's full name and launch id from the
    /// device when they cannot be derived locally.
    pub identity_resolution: PollPolicy,

    /// Polling used to wait for a freshly installed package to show up on
    /// the device before launching it.
    pub registration: PollPolicy,

    pub install: InstallSettings,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            identity_resolution: PollPolicy::new(4, 2000),
            registration: PollPolicy::new(5, 3000),
            install: InstallSettings::default(),
        }
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.identity_resolution.attempts == 0 {
            bail!("identity_resolution.attempts must be at least 1");
        }
        if self.registration.attempts == 0 {
            bail!("registration.attempts must be at least 1");
        }
        Ok(())
    }
}

/// Bounded polling: up to `attempts` queries, `delay_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl PollPolicy {
    pub fn new(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Parameters forwarded to the host install call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    pub timeout_ms: u64,
    pub retry_count: u32,
    pub move_only: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            retry_count: 1,
            move_only: false,
        }
    }
}
