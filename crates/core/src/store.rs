//! Token persistence seam.
//!
//! The store exclusively owns token records. Callers only ever receive
//! clones, so no component can hold a copy that drifts from the stored one.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::token::TokenRecord;
use crate::types::Timestamp;

/// Result of [`TokenStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same token already exists; nothing was written.
    Collision,
}

/// Storage for token records with per-token atomicity.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert `record` unless its token is already present. Never overwrites.
    async fn insert(&self, record: TokenRecord) -> Result<InsertOutcome, CoreError>;

    /// Snapshot of the record for `token`, if any.
    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, CoreError>;

    /// Atomically move `token` from pending to verified at `at`.
    ///
    /// Under concurrent calls for the same token exactly one succeeds and
    /// receives the updated record; the others get
    /// [`CoreError::AlreadyVerified`]. Unknown tokens yield
    /// [`CoreError::TokenNotFound`].
    async fn mark_verified(&self, token: &str, at: Timestamp) -> Result<TokenRecord, CoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, CoreError>;
}
