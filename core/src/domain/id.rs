//! Subtask ID generation and resolution.
//!
//! IDs use the format: `{6-char-hex}-{type}-{slug}`, e.g. `3af9c1-task-add-oauth`.
//! Unlike a UUID-backed scheme, the hex prefix here is a deterministic hash of
//! the subtask's position and title: the same decomposition always produces
//! the same IDs, which the planner's round-trip tests rely on.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Generate a deterministic subtask ID from its index in the decomposition and its title.
pub fn generate_id(domain_type: &str, index: usize, title: &str) -> String {
    let mut hasher = DefaultHasher::new();
    index.hash(&mut hasher);
    title.hash(&mut hasher);
    let hash = hasher.finish();
    let hex_prefix = format!("{:06x}", hash & 0xFF_FFFF);
    let slug = slugify(title);
    format!("{hex_prefix}-{domain_type}-{slug}")
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Type-safe wrapper around a subtask ID string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(String);

impl DomainId {
    pub fn new(domain_type: &str, index: usize, title: &str) -> Self {
        Self(generate_id(domain_type, index, title))
    }

    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn hex_prefix(&self) -> &str {
        &self.0[..6.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn slug(&self) -> Option<&str> {
        let parts: Vec<&str> = self.0.splitn(3, '-').collect();
        parts.get(2).copied()
    }

    pub fn domain_type(&self) -> Option<&str> {
        let parts: Vec<&str> = self.0.splitn(3, '-').collect();
        parts.get(1).copied()
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DomainId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DomainId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DomainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for DomainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DomainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// Resolves a partial reference (hex prefix, full id, or slug substring) to a full subtask id.
pub struct IdResolver<'a> {
    ids: &'a HashMap<String, String>,
}

impl<'a> IdResolver<'a> {
    pub fn new(ids: &'a HashMap<String, String>) -> Self {
        Self { ids }
    }

    /// Returns `Ok(Some(id))` for exactly one match, `Ok(None)` for no matches,
    /// and `Err(candidates)` when the reference is ambiguous.
    pub fn resolve(&self, reference: &str) -> Result<Option<String>, Vec<String>> {
        let matches: Vec<String> = self.ids.keys().filter(|id| Self::matches(id, reference)).cloned().collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches.into_iter().next().unwrap())),
            _ => Err(matches),
        }
    }

    fn matches(id: &str, reference: &str) -> bool {
        if id == reference {
            return true;
        }
        if id.starts_with(reference) {
            return true;
        }
        if let Some(slug_start) = id.find('-') {
            let rest = &id[slug_start + 1..];
            if let Some(type_end) = rest.find('-')
                && rest[type_end + 1..].contains(reference)
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_id_is_deterministic_for_same_index_and_title() {
        let a = generate_id("task", 0, "Add OAuth Authentication");
        let b = generate_id("task", 0, "Add OAuth Authentication");
        assert_eq!(a, b);
    }

    #[test]
    fn generate_id_differs_across_index() {
        let a = generate_id("task", 0, "Add OAuth");
        let b = generate_id("task", 1, "Add OAuth");
        assert_ne!(a, b);
    }

    #[test]
    fn generate_id_contains_type_and_slug() {
        let id = generate_id("task", 3, "Add OAuth!");
        assert!(id.contains("-task-"));
        assert!(id.contains("add-oauth"));
    }

    #[test]
    fn slugify_strips_apostrophes_and_collapses_spaces() {
        assert_eq!(slugify("don't stop"), "dont-stop");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
    }

    #[test]
    fn id_resolver_exact_hex_and_slug_match() {
        let mut ids = HashMap::new();
        ids.insert("3af9c1-task-add-oauth".to_string(), "Add OAuth".to_string());
        ids.insert("7b0021-task-oauth-db".to_string(), "OAuth DB".to_string());

        let resolver = IdResolver::new(&ids);
        assert_eq!(resolver.resolve("3af9c1-task-add-oauth").unwrap(), Some("3af9c1-task-add-oauth".to_string()));
        assert_eq!(resolver.resolve("3af9c1").unwrap(), Some("3af9c1-task-add-oauth".to_string()));
        assert_eq!(resolver.resolve("oauth-db").unwrap(), Some("7b0021-task-oauth-db".to_string()));
    }

    #[test]
    fn id_resolver_ambiguous_reference_lists_all_candidates() {
        let mut ids = HashMap::new();
        ids.insert("3af9c1-task-add-oauth".to_string(), "Add OAuth".to_string());
        ids.insert("7b0021-task-oauth-db".to_string(), "OAuth DB".to_string());

        let resolver = IdResolver::new(&ids);
        let err = resolver.resolve("oauth").unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn id_resolver_no_match_is_ok_none() {
        let mut ids = HashMap::new();
        ids.insert("3af9c1-task-add-oauth".to_string(), "Add OAuth".to_string());
        let resolver = IdResolver::new(&ids);
        assert_eq!(resolver.resolve("nonexistent").unwrap(), None);
    }
}
