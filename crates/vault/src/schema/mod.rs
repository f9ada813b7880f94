//! Sensitivity and relation configuration: which fields of which entity types
//! are encrypted at rest, and how entity types link to each other.
//!
//! # Responsibilities
//!
//! - Load the fields file (YAML, falling back to JSON) at startup, or use the
//!   built-in clinic defaults when none is configured.
//! - Compile it into an immutable [`EntityRegistry`] shared by every request.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** This module must not import anything from
//!   `crate::crypto`.
//! - Field names that do not exist on an entity are never an error; they just
//!   never match anything.

pub mod registry;

pub use registry::{EntityRegistry, EntitySchema, EntityType};

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// On-disk shape of the fields file.
///
/// ```yaml
/// sensitive:
///   users: [username, phone_number]
/// relations:
///   appointments:
///     patient: users
/// relation_fallback: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldsConfig {
    /// Entity type → encrypted field names.
    #[serde(default)]
    pub sensitive: BTreeMap<String, Vec<String>>,

    /// Entity type → relation key → related entity type.
    #[serde(default)]
    pub relations: BTreeMap<String, BTreeMap<String, String>>,

    /// Treat a property named after a sensitive entity as a relation to it
    /// when no explicit relation entry exists.
    #[serde(default)]
    pub relation_fallback: bool,
}

const CLINIC_SENSITIVE: [(&str, &[&str]); 6] = [
    ("users", &["username", "phone_number"]),
    ("notes", &["content", "general_notes", "ailments", "prescription"]),
    ("results", &["interpretation", "path", "recommendation"]),
    ("options", &["description"]),
    ("patient_history", &["answer"]),
    ("questions_history", &["description"]),
];

const CLINIC_RELATIONS: [(&str, &[(&str, &str)]); 8] = [
    ("users", &[("notes", "notes"), ("patient_history", "patient_history")]),
    ("notes", &[("results", "results"), ("patient", "users"), ("doctor", "users")]),
    ("appointments", &[("patient", "users"), ("doctor", "users"), ("notes", "notes")]),
    ("analysis", &[("results", "results"), ("patient", "users")]),
    ("results", &[("analysis", "analysis")]),
    ("questions", &[("options", "options"), ("questions_history", "questions_history")]),
    ("patient_history", &[("question", "questions"), ("patient", "users")]),
    ("forums", &[("author", "users")]),
];

impl FieldsConfig {
    /// The clinic application's field and relation map.
    pub fn clinic_defaults() -> Self {
        let sensitive = CLINIC_SENSITIVE
            .iter()
            .map(|(entity, fields)| {
                let fields = fields.iter().map(|f| (*f).to_owned()).collect();
                ((*entity).to_owned(), fields)
            })
            .collect();

        let relations = CLINIC_RELATIONS
            .iter()
            .map(|(entity, links)| {
                let links = links
                    .iter()
                    .map(|(key, target)| ((*key).to_owned(), (*target).to_owned()))
                    .collect();
                ((*entity).to_owned(), links)
            })
            .collect();

        Self {
            sensitive,
            relations,
            relation_fallback: false,
        }
    }
}

/// Parse a fields document, trying YAML first and JSON second.
///
/// # Errors
///
/// Returns an error if the text is neither.
pub fn parse(text: &str) -> Result<FieldsConfig> {
    if let Ok(parsed) = serde_yaml::from_str(text) {
        Ok(parsed)
    } else if let Ok(parsed) = serde_json::from_str(text) {
        Ok(parsed)
    } else {
        anyhow::bail!("fields file is not valid YAML or JSON for the expected shape");
    }
}

/// Build the registry from the configured fields file, or from
/// [`FieldsConfig::clinic_defaults`] when `path` is `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<EntityRegistry> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read fields file {}", p.display()))?;
            parse(&text).with_context(|| format!("failed to parse fields file {}", p.display()))?
        }
        None => FieldsConfig::clinic_defaults(),
    };
    let registry = EntityRegistry::new(&cfg);
    info!(
        sensitive_entities = ?registry.sensitive_names(),
        relation_fallback = cfg.relation_fallback,
        fields_file = ?path,
        "entity registry loaded"
    );
    Ok(registry)
}
