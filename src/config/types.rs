use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::code_entry::CharClass;

/// Root configuration container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub code: CodeConfig,
    #[serde(default)]
    pub passcode: PasscodeConfig,
    #[serde(default)]
    pub identifier: IdentifierConfig,
    #[serde(default)]
    pub resend: ResendConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
}

/// One-time codes delivered by SMS or email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Number of cells (default: 6).
    #[serde(default = "default_code_length")]
    pub length: usize,
    /// Accepted characters (default: digits).
    #[serde(default)]
    pub charset: CharClass,
}

/// Passcodes chosen by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasscodeConfig {
    /// Number of cells (default: 4).
    #[serde(default = "default_passcode_length")]
    pub length: usize,
    #[serde(default)]
    pub charset: CharClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierConfig {
    /// Minimum trimmed length of an email, and minimum digit count of a
    /// phone number (default: 6).
    #[serde(default = "default_identifier_min_length")]
    pub min_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResendConfig {
    /// Countdown length in ticks (default: 120).
    #[serde(default = "default_resend_duration_ticks")]
    pub duration_ticks: u32,
    /// Real-time length of one tick in milliseconds (default: 1000).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Per-call timeout in seconds; 0 disables it (default: 30).
    #[serde(default = "default_submit_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Rejected attempts allowed on a verification step before the flow fails.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_code_length() -> usize {
    6
}

fn default_passcode_length() -> usize {
    4
}

fn default_identifier_min_length() -> usize {
    6
}

fn default_resend_duration_ticks() -> u32 {
    120
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_submit_timeout_seconds() -> u64 {
    30
}

impl ResendConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl SubmitConfig {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_seconds))
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            length: default_code_length(),
            charset: CharClass::Digits,
        }
    }
}

impl Default for PasscodeConfig {
    fn default() -> Self {
        Self {
            length: default_passcode_length(),
            charset: CharClass::Digits,
        }
    }
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            min_length: default_identifier_min_length(),
        }
    }
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            duration_ticks: default_resend_duration_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_submit_timeout_seconds(),
            max_attempts: None,
        }
    }
}
