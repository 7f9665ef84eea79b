//! Postgres backend. Uniqueness and upsert semantics live in the database
//! itself (`ON CONFLICT` on constrained columns), so they hold across
//! concurrent process instances, not just tasks in one process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use vitae_core::{
    EntityKind, EntityRecord, RootFields, UserProfile,
};

use crate::{HashRecord, HashStore, ProfileStore, StoreError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("migrations applied");
        Ok(())
    }
}

fn decode_record(
    kind: EntityKind,
    entity_id: &str,
    payload: serde_json::Value,
) -> Result<EntityRecord, StoreError> {
    let corrupt = |source| StoreError::Corrupt {
        kind,
        entity_id: entity_id.to_string(),
        source,
    };
    Ok(match kind {
        EntityKind::Skill => {
            EntityRecord::Skill(serde_json::from_value(payload).map_err(corrupt)?)
        }
        EntityKind::Project => {
            EntityRecord::Project(serde_json::from_value(payload).map_err(corrupt)?)
        }
        EntityKind::Experience => {
            EntityRecord::Experience(serde_json::from_value(payload).map_err(corrupt)?)
        }
        EntityKind::Education => {
            EntityRecord::Education(serde_json::from_value(payload).map_err(corrupt)?)
        }
    })
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn root_document(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, full_name, email, phone, location,
                   professional_summary, resume_url, updated_at
              FROM user_profiles
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserProfile {
            user_id: row.try_get("user_id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            location: row.try_get("location")?,
            professional_summary: row.try_get("professional_summary")?,
            resume_url: row.try_get("resume_url")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn merge_root_document(
        &self,
        user_id: &str,
        fields: &RootFields,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles
                   (user_id, full_name, email, phone, location,
                    professional_summary, resume_url, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE
               SET full_name = COALESCE(EXCLUDED.full_name, user_profiles.full_name),
                   email = COALESCE(EXCLUDED.email, user_profiles.email),
                   phone = COALESCE(EXCLUDED.phone, user_profiles.phone),
                   location = COALESCE(EXCLUDED.location, user_profiles.location),
                   professional_summary = COALESCE(EXCLUDED.professional_summary,
                                                   user_profiles.professional_summary),
                   resume_url = COALESCE(EXCLUDED.resume_url, user_profiles.resume_url),
                   updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&fields.full_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.location)
        .bind(&fields.professional_summary)
        .bind(&fields.resume_url)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entity(
        &self,
        user_id: &str,
        kind: EntityKind,
        entity_id: &str,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT data_json
              FROM profile_entities
             WHERE user_id = $1 AND kind = $2 AND entity_id = $3
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: serde_json::Value = row.try_get("data_json")?;
        decode_record(kind, entity_id, payload).map(Some)
    }

    async fn upsert_entity(
        &self,
        user_id: &str,
        record: &EntityRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profile_entities
                   (user_id, kind, entity_id, source, data_json, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, kind, entity_id) DO UPDATE
               SET source = EXCLUDED.source,
                   data_json = EXCLUDED.data_json,
                   last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(user_id)
        .bind(record.kind().as_str())
        .bind(record.id())
        .bind(record.source().as_str())
        .bind(serde_json::to_value(record).expect("entity records serialize to plain JSON objects"))
        .bind(record.last_updated())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entities(
        &self,
        user_id: &str,
        kind: EntityKind,
    ) -> Result<Vec<EntityRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT entity_id, data_json
              FROM profile_entities
             WHERE user_id = $1 AND kind = $2
             ORDER BY entity_id
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let entity_id: String = row.try_get("entity_id")?;
            let payload: serde_json::Value = row.try_get("data_json")?;
            out.push(decode_record(kind, &entity_id, payload)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl HashStore for PgStore {
    async fn try_insert_unique(&self, record: &HashRecord) -> Result<bool, StoreError> {
        // The unique constraint on file_hash is the duplicate check; two
        // concurrent callers cannot both observe rows_affected = 1.
        let result = sqlx::query(
            r#"
            INSERT INTO resume_hashes (file_hash, filename, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (file_hash) DO NOTHING
            "#,
        )
        .bind(&record.file_hash)
        .bind(&record.filename)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn lookup(&self, file_hash: &str) -> Result<Option<HashRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT file_hash, filename, created_at
              FROM resume_hashes
             WHERE file_hash = $1
            "#,
        )
        .bind(file_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(HashRecord {
            file_hash: row.try_get("file_hash")?,
            filename: row.try_get("filename")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}
