//! In-memory backend. Used by tests and as an embedded single-process
//! option. `try_insert_unique` performs its occupied-check and insert
//! under a single write-lock acquisition.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use vitae_core::{EntityKind, EntityRecord, RootFields, UserProfile};

use crate::{HashRecord, HashStore, ProfileStore, StoreError};

#[derive(Debug, Default)]
struct MemoryInner {
    profiles: HashMap<String, UserProfile>,
    entities: HashMap<String, BTreeMap<(EntityKind, String), EntityRecord>>,
    hashes: HashMap<String, HashRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn root_document(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn merge_root_document(
        &self,
        user_id: &str,
        fields: &RootFields,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id, updated_at));
        profile.apply(fields, updated_at);
        Ok(())
    }

    async fn entity(
        &self,
        user_id: &str,
        kind: EntityKind,
        entity_id: &str,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .entities
            .get(user_id)
            .and_then(|records| records.get(&(kind, entity_id.to_string())))
            .cloned())
    }

    async fn upsert_entity(
        &self,
        user_id: &str,
        record: &EntityRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .entities
            .entry(user_id.to_string())
            .or_default()
            .insert((record.kind(), record.id().to_string()), record.clone());
        Ok(())
    }

    async fn entities(
        &self,
        user_id: &str,
        kind: EntityKind,
    ) -> Result<Vec<EntityRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .entities
            .get(user_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|((k, _), _)| *k == kind)
                    .map(|(_, record)| record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl HashStore for MemoryStore {
    async fn try_insert_unique(&self, record: &HashRecord) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.hashes.entry(record.file_hash.clone()) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn lookup(&self, file_hash: &str) -> Result<Option<HashRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.hashes.get(file_hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitae_core::{SkillRecord, Source};

    fn skill(name: &str, source: Source) -> EntityRecord {
        EntityRecord::Skill(SkillRecord::from_draft(name, "technical", source, Utc::now()))
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = MemoryStore::new();
        let record = skill("Rust", Source::Resume);
        store.upsert_entity("u1", &record).await.unwrap();

        let fetched = store
            .entity("u1", EntityKind::Skill, "rust")
            .await
            .unwrap()
            .expect("record should exist");
        assert_eq!(fetched, record);

        assert!(store
            .entity("u1", EntityKind::Project, "rust")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .entity("u2", EntityKind::Skill, "rust")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn listing_filters_by_kind_and_orders_by_id() {
        let store = MemoryStore::new();
        store.upsert_entity("u1", &skill("Zig", Source::Resume)).await.unwrap();
        store.upsert_entity("u1", &skill("Ada", Source::Resume)).await.unwrap();

        let skills = store.entities("u1", EntityKind::Skill).await.unwrap();
        let ids: Vec<_> = skills.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["ada", "zig"]);
        assert!(store.entities("u1", EntityKind::Education).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn root_merge_creates_then_preserves() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .merge_root_document(
                "u1",
                &RootFields {
                    email: Some("a@example.com".into()),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        store
            .merge_root_document(
                "u1",
                &RootFields {
                    location: Some("Lisbon".into()),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();

        let profile = store.root_document("u1").await.unwrap().unwrap();
        assert_eq!(profile.email.as_deref(), Some("a@example.com"));
        assert_eq!(profile.location.as_deref(), Some("Lisbon"));
    }

    #[tokio::test]
    async fn duplicate_hash_insert_is_refused() {
        let store = MemoryStore::new();
        let record = HashRecord {
            file_hash: "abc".into(),
            filename: "a.pdf".into(),
            created_at: Utc::now(),
        };
        assert!(store.try_insert_unique(&record).await.unwrap());

        let rival = HashRecord {
            filename: "b.pdf".into(),
            ..record.clone()
        };
        assert!(!store.try_insert_unique(&rival).await.unwrap());

        // First writer's metadata survives.
        let stored = store.lookup("abc").await.unwrap().unwrap();
        assert_eq!(stored.filename, "a.pdf");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_admit_exactly_one() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let record = HashRecord {
                    file_hash: "same-content".into(),
                    filename: format!("copy-{i}.pdf"),
                    created_at: Utc::now(),
                };
                store.try_insert_unique(&record).await.unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }
}
