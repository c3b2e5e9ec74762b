//! Interfaces to the systems a verification flow drives.
//!
//! Backends are opaque: identifiers and codes pass through as strings and
//! every call answers with a single [`Outcome`].

mod memory;

use async_trait::async_trait;

use crate::executor::Outcome;

pub use memory::{BackendCall, InMemoryBackend};

/// Rejection reason for a code that does not match.
pub const WRONG_CODE: &str = "WrongCode";
/// Rejection reason for a passcode that does not match.
pub const WRONG_PASSCODE: &str = "WrongPasscode";
/// Rejection reason for an identifier the backend does not know.
pub const UNKNOWN_IDENTIFIER: &str = "UnknownIdentifier";

/// Issues and checks one-time codes sent to a phone number or email address.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    async fn request_code(&self, identifier: &str) -> Outcome;

    async fn verify_code(&self, identifier: &str, code: &str) -> Outcome;

    async fn resend_code(&self, identifier: &str) -> Outcome;
}

/// Account mutations triggered at the end of a flow.
#[async_trait]
pub trait AccountBackend: Send + Sync {
    async fn verify_passcode(&self, passcode: &str) -> Outcome;

    async fn set_passcode(&self, passcode: &str) -> Outcome;

    async fn delete_account(&self, identifier: &str) -> Outcome;
}
