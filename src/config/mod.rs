//! Engine configuration: code lengths, resend countdown, submission limits.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{
    CodeConfig, EngineConfig, IdentifierConfig, PasscodeConfig, ResendConfig, SubmitConfig,
};
