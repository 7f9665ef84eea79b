//! Content-addressed duplicate detection for incoming resume files.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info_span};
use uuid::Uuid;

use vitae_storage::{sha256_hex, HashRecord, HashStore, StoreError};

#[derive(Debug, Error)]
pub enum AdmitError {
    #[error("hash registry unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one admission check. Rejection is a defined result, not an
/// error; callers branch on it like any other value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted(HashRecord),
    DuplicateRejected {
        file_hash: String,
        /// The record that already holds this content, when it could be
        /// read back; useful for reporting the original filename.
        existing: Option<HashRecord>,
    },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted(_))
    }
}

/// Admits a file exactly once per distinct content. Identity is the SHA-256
/// of the bytes alone; filenames are recorded but never compared.
pub struct DuplicateGuard {
    store: Arc<dyn HashStore>,
}

impl DuplicateGuard {
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self { store }
    }

    /// Check-and-insert in one constrained operation. Of N concurrent calls
    /// with identical content, exactly one is accepted.
    pub async fn admit(&self, content: &[u8], filename: &str) -> Result<Admission, AdmitError> {
        let op_id = Uuid::new_v4();
        let file_hash = sha256_hex(content);
        let span = info_span!("admit", %op_id, filename, %file_hash);
        let _guard = span.enter();

        let record = HashRecord {
            file_hash: file_hash.clone(),
            filename: filename.to_string(),
            created_at: Utc::now(),
        };

        if self.store.try_insert_unique(&record).await? {
            debug!("content admitted");
            return Ok(Admission::Accepted(record));
        }

        let existing = self.store.lookup(&file_hash).await?;
        debug!("duplicate content rejected");
        Ok(Admission::DuplicateRejected {
            file_hash,
            existing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitae_storage::MemoryStore;

    #[tokio::test]
    async fn same_bytes_different_filename_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let guard = DuplicateGuard::new(store);

        let first = guard.admit(b"resume body", "a.pdf").await.unwrap();
        let Admission::Accepted(record) = first else {
            panic!("first admission should be accepted");
        };
        assert_eq!(record.filename, "a.pdf");
        assert_eq!(record.file_hash, sha256_hex(b"resume body"));

        let second = guard.admit(b"resume body", "b.pdf").await.unwrap();
        let Admission::DuplicateRejected { file_hash, existing } = second else {
            panic!("second admission should be rejected");
        };
        assert_eq!(file_hash, record.file_hash);
        assert_eq!(existing.unwrap().filename, "a.pdf");
    }

    #[tokio::test]
    async fn different_bytes_same_filename_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        let guard = DuplicateGuard::new(store);

        assert!(guard.admit(b"version one", "a.pdf").await.unwrap().is_accepted());
        assert!(guard.admit(b"version two", "a.pdf").await.unwrap().is_accepted());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_admissions_accept_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let guard = Arc::new(DuplicateGuard::new(store));

        let mut handles = Vec::new();
        for i in 0..12 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move {
                guard
                    .admit(b"identical upload", &format!("copy-{i}.pdf"))
                    .await
                    .unwrap()
            }));
        }

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Admission::Accepted(_) => accepted += 1,
                Admission::DuplicateRejected { .. } => rejected += 1,
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(rejected, 11);
    }
}
