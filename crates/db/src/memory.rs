//! In-memory token store backed by a sharded concurrent map.
//!
//! Each token lives in exactly one [`DashMap`] shard. Inserts go through the
//! entry API so an existing token is never overwritten, and the verified
//! transition runs under the entry's write guard, which serialises
//! concurrent completions of the same token without blocking unrelated
//! tokens in other shards. Guards are always released before returning, so
//! no lock is held across an `.await` by callers.

use adverify_core::error::CoreError;
use adverify_core::store::{InsertOutcome, TokenStore};
use adverify_core::token::TokenRecord;
use adverify_core::types::Timestamp;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: DashMap<String, TokenRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: TokenRecord) -> Result<InsertOutcome, CoreError> {
        match self.records.entry(record.token.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::Collision),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, CoreError> {
        Ok(self.records.get(token).map(|r| r.value().clone()))
    }

    async fn mark_verified(&self, token: &str, at: Timestamp) -> Result<TokenRecord, CoreError> {
        let mut record = self
            .records
            .get_mut(token)
            .ok_or(CoreError::TokenNotFound)?;
        record.mark_verified(at)?;
        Ok(record.clone())
    }

    async fn count(&self) -> Result<usize, CoreError> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use adverify_core::token::{NewToken, TokenState};
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn pending(token: &str, user_id: i64) -> TokenRecord {
        TokenRecord::pending(token.to_string(), NewToken::ad(user_id), Utc::now())
    }

    #[tokio::test]
    async fn insert_then_get_returns_snapshot() {
        let store = MemoryTokenStore::new();
        assert_eq!(
            store.insert(pending("abc", 1)).await.unwrap(),
            InsertOutcome::Inserted
        );

        let record = store.get("abc").await.unwrap().unwrap();
        assert_eq!(record.user_id, 1);
        assert_eq!(record.state(), TokenState::Pending);
    }

    #[tokio::test]
    async fn insert_never_overwrites() {
        let store = MemoryTokenStore::new();
        store.insert(pending("abc", 1)).await.unwrap();

        let outcome = store.insert(pending("abc", 2)).await.unwrap();

        assert_eq!(outcome, InsertOutcome::Collision);
        assert_eq!(store.get("abc").await.unwrap().unwrap().user_id, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = MemoryTokenStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_verified_unknown_is_not_found() {
        let store = MemoryTokenStore::new();
        assert_matches!(
            store.mark_verified("missing", Utc::now()).await,
            Err(CoreError::TokenNotFound)
        );
    }

    #[tokio::test]
    async fn mark_verified_twice_is_rejected() {
        let store = MemoryTokenStore::new();
        store.insert(pending("abc", 1)).await.unwrap();

        let first = store.mark_verified("abc", Utc::now()).await.unwrap();
        let second = store.mark_verified("abc", Utc::now()).await;

        assert!(first.is_verified());
        assert_matches!(second, Err(CoreError::AlreadyVerified));
        let stored = store.get("abc").await.unwrap().unwrap();
        assert_eq!(stored.verified_at(), first.verified_at());
    }

    #[tokio::test]
    async fn returned_snapshot_does_not_alias_store() {
        let store = MemoryTokenStore::new();
        store.insert(pending("abc", 1)).await.unwrap();
        let before = store.get("abc").await.unwrap().unwrap();

        store.mark_verified("abc", Utc::now()).await.unwrap();

        assert!(!before.is_verified());
        assert!(store.get("abc").await.unwrap().unwrap().is_verified());
    }
}
