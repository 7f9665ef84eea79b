//! Structured-data handoff contract from the external extraction pipeline
//! into the reconciler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::identity;
use crate::{EducationRecord, ExperienceRecord, ProjectRecord, Source};

/// Shape violations at the reconciler boundary. The draft is rejected as a
/// whole; nothing is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("draft root must be a JSON object")]
    RootNotObject,
    #[error("`{section}` must be {expected}")]
    SectionShape {
        section: &'static str,
        expected: &'static str,
    },
    #[error("`{section}[{index}]` must be a key-value object")]
    EntryNotObject {
        section: &'static str,
        index: usize,
    },
    #[error("draft failed to deserialize: {0}")]
    Deserialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl EducationEntry {
    pub fn to_record(&self, source: Source, last_updated: DateTime<Utc>) -> EducationRecord {
        let institution = self
            .institution
            .clone()
            .unwrap_or_else(|| identity::UNKNOWN_KEY.to_string());
        let degree = self
            .degree
            .clone()
            .unwrap_or_else(|| identity::UNKNOWN_KEY.to_string());
        EducationRecord {
            id: identity::education_id(&institution, &degree),
            institution,
            degree,
            field_of_study: self.field_of_study.clone(),
            year: self.year.clone(),
            source,
            last_updated,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub responsibilities: Option<String>,
}

impl ExperienceEntry {
    pub fn to_record(&self, source: Source, last_updated: DateTime<Utc>) -> ExperienceRecord {
        let company = self
            .company
            .clone()
            .unwrap_or_else(|| identity::UNKNOWN_KEY.to_string());
        let role = self
            .role
            .clone()
            .unwrap_or_else(|| identity::UNKNOWN_KEY.to_string());
        ExperienceRecord {
            id: identity::experience_id(&company, &role),
            role,
            company,
            duration: self.duration.clone(),
            responsibilities: self.responsibilities.clone(),
            source,
            last_updated,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tech_stack: Option<String>,
}

impl ProjectEntry {
    pub fn to_record(&self, source: Source, last_updated: DateTime<Utc>) -> ProjectRecord {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| identity::UNTITLED_KEY.to_string());
        ProjectRecord {
            id: identity::project_id(&title),
            title,
            summary: self.summary.clone(),
            tech_stack: self.tech_stack.clone(),
            source,
            last_updated,
        }
    }
}

/// One incoming structured-data object. Absent keys are empty, never an
/// error. `skills` is a `BTreeMap` so iteration order, and therefore
/// last-writer-wins among colliding ids, is deterministic per draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub professional_summary: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub skills: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl ProfileDraft {
    /// Validate a raw JSON value against the draft shape, then deserialize.
    pub fn from_json(value: JsonValue) -> Result<Self, ValidationError> {
        let root = value.as_object().ok_or(ValidationError::RootNotObject)?;

        if let Some(personal) = root.get("personal_info") {
            if !personal.is_null() && !personal.is_object() {
                return Err(ValidationError::SectionShape {
                    section: "personal_info",
                    expected: "a key-value object",
                });
            }
        }

        if let Some(skills) = root.get("skills") {
            if !skills.is_null() && !skills.is_object() {
                return Err(ValidationError::SectionShape {
                    section: "skills",
                    expected: "a map of category to skill-name list",
                });
            }
        }

        for section in ["education", "experience", "projects"] {
            let Some(entries) = root.get(section) else {
                continue;
            };
            if entries.is_null() {
                continue;
            }
            let entries = entries.as_array().ok_or(ValidationError::SectionShape {
                section,
                expected: "a list of key-value objects",
            })?;
            for (index, entry) in entries.iter().enumerate() {
                if !entry.is_object() {
                    return Err(ValidationError::EntryNotObject { section, index });
                }
            }
        }

        Ok(serde_json::from_value(strip_nulls(value))?)
    }

    pub fn is_empty(&self) -> bool {
        self.personal_info == PersonalInfo::default()
            && self.professional_summary.is_none()
            && self.resume_url.is_none()
            && self.skills.is_empty()
            && self.education.is_empty()
            && self.experience.is_empty()
            && self.projects.is_empty()
    }
}

/// LLM extractors emit explicit `null` for fields they could not find;
/// treat those exactly like absent keys.
fn strip_nulls(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(strip_nulls).collect())
        }
        other => other,
    }
}
