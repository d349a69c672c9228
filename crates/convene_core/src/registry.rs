//! Furniture and utility kind registry.
//!
//! # Responsibility
//! - Know which furniture/utility kinds exist and which settings fields each
//!   kind recognizes.
//! - Project opaque field maps onto recognized fields for serialization.
//!
//! # Invariants
//! - Kind ids are non-blank `[a-z0-9_-]+` and unique per family.
//! - The registry is a plain value handed to the engine; there is no
//!   process-wide instance.

use crate::model::FieldMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const BUILTIN_FURNITURE: &[(&str, &[&str])] = &[
    ("markdown_text_block", &["content"]),
    ("video_bridge", &[]),
    ("breakout_tables_by_jitsi", &["names"]),
    ("spotlight", &["image_url"]),
    ("payment_form", &[]),
];

const BUILTIN_UTILITIES: &[(&str, &[&str])] = &[
    ("jitsi", &["meet_domain"]),
    ("plaid", &["client_id", "secret", "environment"]),
];

/// Which plugin family a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFamily {
    Furniture,
    Utility,
}

impl Display for KindFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Furniture => f.write_str("furniture"),
            Self::Utility => f.write_str("utility"),
        }
    }
}

/// Kind registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidKind { family: KindFamily, kind: String },
    DuplicateKind { family: KindFamily, kind: String },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind { family, kind } => {
                write!(f, "{family} kind id is invalid: `{kind}`")
            }
            Self::DuplicateKind { family, kind } => {
                write!(f, "{family} kind already registered: `{kind}`")
            }
        }
    }
}

impl Error for RegistryError {}

/// Read-only lookup from kind tag to recognized field names.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    furniture: BTreeMap<String, Vec<String>>,
    utilities: BTreeMap<String, Vec<String>>,
}

impl KindRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the furniture and utility kinds shipped with
    /// the product.
    pub fn builtin() -> Self {
        Self {
            furniture: builtin_entries(BUILTIN_FURNITURE),
            utilities: builtin_entries(BUILTIN_UTILITIES),
        }
    }

    /// Registers one furniture kind and its recognized settings fields.
    pub fn register_furniture(&mut self, kind: &str, fields: &[&str]) -> Result<(), RegistryError> {
        self.register(KindFamily::Furniture, kind, fields)
    }

    /// Registers one utility kind and its recognized configuration fields.
    pub fn register_utility(&mut self, kind: &str, fields: &[&str]) -> Result<(), RegistryError> {
        self.register(KindFamily::Utility, kind, fields)
    }

    /// Returns recognized field names, or `None` for an unknown kind.
    pub fn fields(&self, family: KindFamily, kind: &str) -> Option<&[String]> {
        self.family(family).get(kind).map(Vec::as_slice)
    }

    pub fn contains(&self, family: KindFamily, kind: &str) -> bool {
        self.family(family).contains_key(kind)
    }

    /// Returns sorted kind ids of one family.
    pub fn kinds(&self, family: KindFamily) -> Vec<&str> {
        self.family(family).keys().map(String::as_str).collect()
    }

    /// Keeps only the fields `kind` recognizes.
    ///
    /// Unknown kinds project to an empty map.
    pub fn project(&self, family: KindFamily, kind: &str, fields: &FieldMap) -> FieldMap {
        let Some(recognized) = self.fields(family, kind) else {
            return FieldMap::new();
        };
        fields
            .iter()
            .filter(|(key, _)| recognized.iter().any(|field| field == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn register(
        &mut self,
        family: KindFamily,
        kind: &str,
        fields: &[&str],
    ) -> Result<(), RegistryError> {
        let kind = kind.trim().to_string();
        if !is_valid_kind_id(&kind) {
            return Err(RegistryError::InvalidKind { family, kind });
        }
        let entries = match family {
            KindFamily::Furniture => &mut self.furniture,
            KindFamily::Utility => &mut self.utilities,
        };
        if entries.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind { family, kind });
        }
        entries.insert(kind, fields.iter().map(|field| (*field).to_string()).collect());
        Ok(())
    }

    fn family(&self, family: KindFamily) -> &BTreeMap<String, Vec<String>> {
        match family {
            KindFamily::Furniture => &self.furniture,
            KindFamily::Utility => &self.utilities,
        }
    }
}

fn builtin_entries(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(kind, fields)| {
            let fields = fields.iter().map(|field| (*field).to_string()).collect();
            ((*kind).to_string(), fields)
        })
        .collect()
}

fn is_valid_kind_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{KindFamily, KindRegistry, RegistryError};
    use crate::model::FieldMap;
    use serde_json::json;

    #[test]
    fn builtin_registry_knows_shipped_kinds() {
        let registry = KindRegistry::builtin();
        assert!(registry.contains(KindFamily::Furniture, "markdown_text_block"));
        assert!(registry.contains(KindFamily::Furniture, "video_bridge"));
        assert!(registry.contains(KindFamily::Utility, "jitsi"));
        assert_eq!(
            registry.fields(KindFamily::Utility, "plaid").map(<[String]>::len),
            Some(3)
        );
        assert!(!registry.contains(KindFamily::Utility, "markdown_text_block"));
    }

    #[test]
    fn rejects_invalid_or_duplicate_kind_ids() {
        let mut registry = KindRegistry::new();
        let invalid = registry.register_furniture("Video Bridge", &[]);
        assert!(matches!(invalid, Err(RegistryError::InvalidKind { .. })));
        let blank = registry.register_utility("   ", &[]);
        assert!(matches!(blank, Err(RegistryError::InvalidKind { .. })));

        registry
            .register_furniture("video", &[])
            .expect("first registration should succeed");
        let duplicate = registry.register_furniture(" video ", &[]);
        assert!(matches!(
            duplicate,
            Err(RegistryError::DuplicateKind { family: KindFamily::Furniture, .. })
        ));
    }

    #[test]
    fn same_id_may_exist_in_both_families() {
        let mut registry = KindRegistry::new();
        registry.register_furniture("jitsi", &["room"]).unwrap();
        registry.register_utility("jitsi", &["meet_domain"]).unwrap();
        assert_eq!(registry.kinds(KindFamily::Furniture), vec!["jitsi"]);
        assert_eq!(registry.kinds(KindFamily::Utility), vec!["jitsi"]);
    }

    #[test]
    fn project_keeps_only_recognized_fields() {
        let registry = KindRegistry::builtin();
        let mut settings = FieldMap::new();
        settings.insert("content".to_string(), json!("# Hi"));
        settings.insert("legacy_flag".to_string(), json!(true));

        let projected = registry.project(KindFamily::Furniture, "markdown_text_block", &settings);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected["content"], json!("# Hi"));

        let unknown = registry.project(KindFamily::Furniture, "hologram", &settings);
        assert!(unknown.is_empty());
    }
}
