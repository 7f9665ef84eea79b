//! Deterministic entity-id derivation from natural key fields.
//!
//! The same natural key must always derive the same id, independent of
//! process, time, or invocation order, so that merge decisions find the
//! right existing record.

/// Derived ids are capped at 50 characters of the normalized key.
pub const MAX_ID_LEN: usize = 50;

pub const UNKNOWN_KEY: &str = "Unknown";
pub const UNTITLED_KEY: &str = "Untitled";

/// Normalize one natural key into a storage-safe id: lower-case, trim,
/// whitespace to `_`, `.` and `/` to `-`, truncated to [`MAX_ID_LEN`].
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase()
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '_',
            '.' | '/' => '-',
            c => c,
        })
        .take(MAX_ID_LEN)
        .collect()
}

pub fn skill_id(name: &str) -> String {
    normalize_key(name)
}

pub fn project_id(title: &str) -> String {
    normalize_key(title)
}

/// Experience ids join company and role with an underscore before
/// normalization.
pub fn experience_id(company: &str, role: &str) -> String {
    normalize_key(&format!("{company}_{role}"))
}

/// Education ids join institution and degree with an underscore before
/// normalization.
pub fn education_id(institution: &str, degree: &str) -> String {
    normalize_key(&format!("{institution}_{degree}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_case_and_padding_insensitive() {
        assert_eq!(skill_id(" Machine Learning "), "machine_learning");
        assert_eq!(skill_id("machine learning"), "machine_learning");
    }

    #[test]
    fn periods_and_slashes_become_hyphens() {
        assert_eq!(skill_id("Node.js"), "node-js");
        assert_eq!(skill_id("CI/CD"), "ci-cd");
        assert_eq!(skill_id("TCP/IP v4.1"), "tcp-ip_v4-1");
    }

    #[test]
    fn two_field_keys_join_with_underscore() {
        assert_eq!(
            experience_id("Acme Corp", "Staff Engineer"),
            "acme_corp_staff_engineer"
        );
        assert_eq!(
            education_id("MIT", "B.Sc"),
            "mit_b-sc"
        );
    }

    #[test]
    fn long_keys_truncate_to_exactly_fifty() {
        let raw = "a".repeat(80);
        let id = project_id(&raw);
        assert_eq!(id.chars().count(), MAX_ID_LEN);
        assert_eq!(id, "a".repeat(50));
    }

    #[test]
    fn derivation_ignores_non_key_fields_by_construction() {
        // Same company + role, any duration: same id.
        let a = experience_id("Globex", "Analyst");
        let b = experience_id("Globex", "Analyst");
        assert_eq!(a, b);
    }

    #[test]
    fn missing_keys_collide_on_the_default_id() {
        // Wholly-unknown records of one kind share an id; last writer wins.
        assert_eq!(
            education_id(UNKNOWN_KEY, UNKNOWN_KEY),
            "unknown_unknown"
        );
        assert_eq!(project_id(UNTITLED_KEY), "untitled");
    }
}
