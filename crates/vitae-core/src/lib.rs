//! Core domain model and provenance types for Vitae.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod draft;
pub mod identity;

pub use draft::{
    EducationEntry, ExperienceEntry, PersonalInfo, ProfileDraft, ProjectEntry, ValidationError,
};

pub const CRATE_NAME: &str = "vitae-core";

/// Provenance of the last accepted write for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Resume,
    User,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Resume => "resume",
            Source::User => "user",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four per-kind entity collections under a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "skills")]
    Skill,
    #[serde(rename = "projects")]
    Project,
    #[serde(rename = "experience")]
    Experience,
    #[serde(rename = "education")]
    Education,
}

impl EntityKind {
    /// Collection name used as the storage key segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Skill => "skills",
            EntityKind::Project => "projects",
            EntityKind::Experience => "experience",
            EntityKind::Education => "education",
        }
    }

    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "skills" => Some(EntityKind::Skill),
            "projects" => Some(EntityKind::Project),
            "experience" => Some(EntityKind::Experience),
            "education" => Some(EntityKind::Education),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-entity merge decision, reported so the skip branch is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No record existed at the derived id; a new one was written.
    Created,
    /// An existing record was overwritten (or matched byte-for-byte).
    Applied,
    /// The existing record is user-owned and the incoming source is resume.
    SkippedPriorityHeld,
    /// The storage write failed; the rest of the batch still ran.
    Failed,
}

/// Root per-user document. Scalar fields are last-write-wins with no
/// source tracking, unlike the entity collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub professional_summary: Option<String>,
    pub resume_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: None,
            email: None,
            phone: None,
            location: None,
            professional_summary: None,
            resume_url: None,
            updated_at,
        }
    }

    /// Merge-write: fields carried by `fields` overwrite, `None` fields are
    /// left untouched. `updated_at` is stamped unconditionally.
    pub fn apply(&mut self, fields: &RootFields, updated_at: DateTime<Utc>) {
        merge_field(&mut self.full_name, &fields.full_name);
        merge_field(&mut self.email, &fields.email);
        merge_field(&mut self.phone, &fields.phone);
        merge_field(&mut self.location, &fields.location);
        merge_field(&mut self.professional_summary, &fields.professional_summary);
        merge_field(&mut self.resume_url, &fields.resume_url);
        self.updated_at = updated_at;
    }
}

fn merge_field(target: &mut Option<String>, incoming: &Option<String>) {
    if incoming.is_some() {
        *target = incoming.clone();
    }
}

/// Root scalar fields of one incoming draft, ready for a merge-write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFields {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub professional_summary: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub confidence: f64,
    pub active: bool,
    pub source: Source,
    pub last_updated: DateTime<Utc>,
}

impl SkillRecord {
    pub fn from_draft(
        name: &str,
        category: &str,
        source: Source,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id: identity::skill_id(name),
            name: name.to_string(),
            category: category.to_string(),
            confidence: 1.0,
            active: true,
            source,
            last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub tech_stack: Option<String>,
    pub source: Source,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub id: String,
    pub role: String,
    pub company: String,
    pub duration: Option<String>,
    pub responsibilities: Option<String>,
    pub source: Source,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub year: Option<String>,
    pub source: Source,
    pub last_updated: DateTime<Utc>,
}

/// One record in one of the four entity collections. Serialized untagged:
/// the collection name, not a tag, says which shape a stored payload has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRecord {
    Skill(SkillRecord),
    Project(ProjectRecord),
    Experience(ExperienceRecord),
    Education(EducationRecord),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Skill(_) => EntityKind::Skill,
            EntityRecord::Project(_) => EntityKind::Project,
            EntityRecord::Experience(_) => EntityKind::Experience,
            EntityRecord::Education(_) => EntityKind::Education,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRecord::Skill(r) => &r.id,
            EntityRecord::Project(r) => &r.id,
            EntityRecord::Experience(r) => &r.id,
            EntityRecord::Education(r) => &r.id,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            EntityRecord::Skill(r) => r.source,
            EntityRecord::Project(r) => r.source,
            EntityRecord::Experience(r) => r.source,
            EntityRecord::Education(r) => r.source,
        }
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        match self {
            EntityRecord::Skill(r) => r.last_updated,
            EntityRecord::Project(r) => r.last_updated,
            EntityRecord::Experience(r) => r.last_updated,
            EntityRecord::Education(r) => r.last_updated,
        }
    }

    /// Equality over everything except `last_updated`. Used to keep repeat
    /// reconciliations from re-stamping records whose content is unchanged.
    pub fn content_eq(&self, other: &EntityRecord) -> bool {
        match (self, other) {
            (EntityRecord::Skill(a), EntityRecord::Skill(b)) => {
                a.id == b.id
                    && a.name == b.name
                    && a.category == b.category
                    && a.confidence == b.confidence
                    && a.active == b.active
                    && a.source == b.source
            }
            (EntityRecord::Project(a), EntityRecord::Project(b)) => {
                a.id == b.id
                    && a.title == b.title
                    && a.summary == b.summary
                    && a.tech_stack == b.tech_stack
                    && a.source == b.source
            }
            (EntityRecord::Experience(a), EntityRecord::Experience(b)) => {
                a.id == b.id
                    && a.role == b.role
                    && a.company == b.company
                    && a.duration == b.duration
                    && a.responsibilities == b.responsibilities
                    && a.source == b.source
            }
            (EntityRecord::Education(a), EntityRecord::Education(b)) => {
                a.id == b.id
                    && a.institution == b.institution
                    && a.degree == b.degree
                    && a.field_of_study == b.field_of_study
                    && a.year == b.year
                    && a.source == b.source
            }
            _ => false,
        }
    }
}
