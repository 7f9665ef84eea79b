//! Storage surfaces and backends for the Vitae profile store and the
//! resume hash registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use vitae_core::{EntityKind, EntityRecord, RootFields, UserProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const CRATE_NAME: &str = "vitae-storage";

/// Hex-encoded SHA-256 digest; the sole content identity for duplicate
/// detection. Filename and metadata never participate.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Append-only registry row for one distinct resume content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub file_hash: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("migration failed: {0}")]
    Migrate(String),
    #[error("stored {kind} record `{entity_id}` failed to decode: {source}")]
    Corrupt {
        kind: EntityKind,
        entity_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migrate(err.to_string())
    }
}

/// Read/write surface the reconciler works against. Handles are passed in
/// explicitly; lifecycle is owned by the calling boundary.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn root_document(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Merge-write the root scalars: carried fields overwrite, absent fields
    /// are left untouched, `updated_at` is stamped unconditionally. Creates
    /// the document on first write.
    async fn merge_root_document(
        &self,
        user_id: &str,
        fields: &RootFields,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn entity(
        &self,
        user_id: &str,
        kind: EntityKind,
        entity_id: &str,
    ) -> Result<Option<EntityRecord>, StoreError>;

    async fn upsert_entity(
        &self,
        user_id: &str,
        record: &EntityRecord,
    ) -> Result<(), StoreError>;

    /// All records of one kind, ordered by entity id.
    async fn entities(
        &self,
        user_id: &str,
        kind: EntityKind,
    ) -> Result<Vec<EntityRecord>, StoreError>;
}

/// Uniqueness-enforcing registry backing the duplicate guard. The insert
/// must be a single atomic constrained operation; an application-level
/// read-then-write is a race under concurrent callers.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Returns `true` if the record was inserted, `false` if a record with
    /// the same `file_hash` already exists. Never overwrites.
    async fn try_insert_unique(&self, record: &HashRecord) -> Result<bool, StoreError>;

    async fn lookup(&self, file_hash: &str) -> Result<Option<HashRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hashing_is_stable() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn content_hashing_ignores_nothing() {
        assert_ne!(sha256_hex(b"resume v1"), sha256_hex(b"resume v2"));
        assert_eq!(sha256_hex(b""), sha256_hex(b""));
    }
}
