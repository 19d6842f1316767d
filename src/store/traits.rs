//! `UserStore` trait — the async persistence interface for user records.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::events::UserId;

/// A durable per-user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Stable platform-assigned id. At most one record per id.
    pub id: UserId,
    /// Absent until the user shares a contact. First write wins.
    pub phone: Option<String>,
    /// Set true exactly once, on the first completed "begin" action.
    pub first_interaction_done: bool,
}

/// Backend-agnostic user persistence.
///
/// Every operation may fail with [`StorageError`]; callers must treat
/// that as non-fatal and answer the user with a degraded response.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the record if absent. An existing record is left
    /// untouched except that a missing phone is filled when one is
    /// supplied; a phone already on file is never overwritten.
    async fn upsert_user(&self, id: UserId, phone: Option<&str>) -> Result<(), StorageError>;

    /// False if no record exists or the phone is absent.
    async fn has_phone(&self, id: UserId) -> Result<bool, StorageError>;

    /// False if no record exists.
    async fn is_first_interaction_done(&self, id: UserId) -> Result<bool, StorageError>;

    /// Set the flag; idempotent, and creates a phoneless record when
    /// none exists yet.
    async fn mark_first_interaction_done(&self, id: UserId) -> Result<(), StorageError>;

    /// Snapshot of all known users at call time.
    async fn list_users(&self) -> Result<Vec<UserRecord>, StorageError>;
}
