//! Source-priority merge of one structured draft into the profile store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use vitae_core::{
    EntityKind, EntityRecord, MergeOutcome, ProfileDraft, RootFields, SkillRecord, Source,
    ValidationError,
};
use vitae_storage::{ProfileStore, StoreError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("root document write failed: {0}")]
    Store(#[from] StoreError),
}

/// Per-entity result line in a [`ReconcileSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityOutcome {
    pub collection: EntityKind,
    pub entity_id: String,
    pub outcome: MergeOutcome,
}

/// What one `reconcile` call did, entity by entity.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileSummary {
    pub op_id: Uuid,
    pub user_id: String,
    pub source: Source,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<EntityOutcome>,
}

impl ReconcileSummary {
    pub fn count(&self, outcome: MergeOutcome) -> usize {
        self.outcomes.iter().filter(|o| o.outcome == outcome).count()
    }
}

/// Applies one incoming draft to the profile store. Holds only an explicit
/// store handle; lifecycle belongs to the caller.
pub struct Reconciler {
    store: Arc<dyn ProfileStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Validate a raw JSON draft, then reconcile it.
    pub async fn reconcile_json(
        &self,
        user_id: &str,
        draft: serde_json::Value,
        source: Source,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let draft = ProfileDraft::from_json(draft)?;
        self.reconcile(user_id, &draft, source).await
    }

    /// Merge-write the root scalars, then upsert every entity in every
    /// collection under the source-priority rule. Entity upserts are a
    /// best-effort batch; only a root write failure fails the operation.
    pub async fn reconcile(
        &self,
        user_id: &str,
        draft: &ProfileDraft,
        source: Source,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let op_id = Uuid::new_v4();
        let span = info_span!("reconcile", %op_id, user_id, source = %source);
        let _guard = span.enter();
        let started_at = Utc::now();

        let fields = RootFields {
            full_name: draft.personal_info.full_name.clone(),
            email: draft.personal_info.email.clone(),
            phone: draft.personal_info.phone.clone(),
            location: draft.personal_info.location.clone(),
            professional_summary: draft.professional_summary.clone(),
            resume_url: draft.resume_url.clone(),
        };
        self.store
            .merge_root_document(user_id, &fields, started_at)
            .await?;

        let mut outcomes = Vec::new();

        for (category, names) in &draft.skills {
            if names.is_empty() {
                continue;
            }
            for name in names {
                let record = EntityRecord::Skill(SkillRecord::from_draft(
                    name, category, source, started_at,
                ));
                outcomes.push(self.apply_entity(user_id, record, source).await);
            }
        }

        for entry in &draft.projects {
            let record = EntityRecord::Project(entry.to_record(source, started_at));
            outcomes.push(self.apply_entity(user_id, record, source).await);
        }

        for entry in &draft.experience {
            let record = EntityRecord::Experience(entry.to_record(source, started_at));
            outcomes.push(self.apply_entity(user_id, record, source).await);
        }

        for entry in &draft.education {
            let record = EntityRecord::Education(entry.to_record(source, started_at));
            outcomes.push(self.apply_entity(user_id, record, source).await);
        }

        Ok(ReconcileSummary {
            op_id,
            user_id: user_id.to_string(),
            source,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        })
    }

    async fn apply_entity(
        &self,
        user_id: &str,
        record: EntityRecord,
        source: Source,
    ) -> EntityOutcome {
        let collection = record.kind();
        let entity_id = record.id().to_string();
        let outcome = match self.upsert_with_priority(user_id, &record, source).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(collection = %collection, %entity_id, %err, "entity upsert failed");
                MergeOutcome::Failed
            }
        };
        debug!(collection = %collection, %entity_id, ?outcome, "entity reconciled");
        EntityOutcome {
            collection,
            entity_id,
            outcome,
        }
    }

    async fn upsert_with_priority(
        &self,
        user_id: &str,
        record: &EntityRecord,
        source: Source,
    ) -> Result<MergeOutcome, StoreError> {
        let existing = self
            .store
            .entity(user_id, record.kind(), record.id())
            .await?;

        match &existing {
            // A user-owned record never yields to resume-sourced data.
            Some(current) if source == Source::Resume && current.source() == Source::User => {
                return Ok(MergeOutcome::SkippedPriorityHeld);
            }
            // Identical content: leave the stored timestamp alone.
            Some(current) if current.content_eq(record) => {
                return Ok(MergeOutcome::Applied);
            }
            _ => {}
        }

        self.store.upsert_entity(user_id, record).await?;
        Ok(if existing.is_some() {
            MergeOutcome::Applied
        } else {
            MergeOutcome::Created
        })
    }
}
