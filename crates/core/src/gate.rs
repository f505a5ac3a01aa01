//! Shared-secret access gate for privileged operations.
//!
//! The requesting bot proves itself with a process-wide secret. Comparison
//! runs in constant time with respect to the secret's contents. An empty
//! configured secret rejects everything (fail-closed).

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::error::CoreError;

/// Message returned to callers presenting a wrong or missing secret.
pub const INVALID_SECRET_MESSAGE: &str = "Invalid secret";

#[derive(Clone)]
pub struct AccessGate {
    secret: Arc<str>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl AccessGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::from(secret.into()),
        }
    }

    /// Whether `provided` matches the configured secret.
    pub fn authorize(&self, provided: &str) -> bool {
        if self.secret.is_empty() {
            tracing::error!("access gate has no secret configured -- rejecting request");
            return false;
        }
        provided.as_bytes().ct_eq(self.secret.as_bytes()).into()
    }

    /// Like [`authorize`](Self::authorize) but yields a [`CoreError`].
    ///
    /// A missing secret is treated the same as a wrong one.
    pub fn check(&self, provided: Option<&str>) -> Result<(), CoreError> {
        match provided {
            Some(secret) if self.authorize(secret) => Ok(()),
            _ => Err(CoreError::Unauthorized(INVALID_SECRET_MESSAGE.into())),
        }
    }
}
