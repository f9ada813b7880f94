//! Compiled, immutable view of the sensitivity and relation configuration.
//!
//! The decrypt walk asks two questions of every object it visits: "which of my
//! fields are encrypted?" and "which of my properties point at another entity?"
//! [`EntityRegistry`] answers both with typed lookups so the walk never has to
//! guess from property names at runtime.

use std::collections::HashMap;

use super::FieldsConfig;

/// Per-entity encryption metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity-type name as configured.
    pub name: String,
    /// Encrypted field names, in configured order, without duplicates.
    pub fields: Vec<String>,
}

/// How an entity type takes part in field transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType<'a> {
    /// The entity has configured sensitive fields.
    Sensitive(&'a EntitySchema),
    /// No sensitive fields; its relations are still walked.
    PassThrough,
}

/// Lookup table built once at startup from a [`FieldsConfig`].
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    sensitive: HashMap<String, EntitySchema>,
    relations: HashMap<String, HashMap<String, String>>,
    relation_fallback: bool,
}

impl EntityRegistry {
    /// Compile `cfg` into a registry.
    ///
    /// Entities with an empty field list are dropped, so they resolve to
    /// [`EntityType::PassThrough`]. Repeated field names keep their first
    /// position.
    pub fn new(cfg: &FieldsConfig) -> Self {
        let sensitive = cfg
            .sensitive
            .iter()
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(name, fields)| {
                let mut ordered: Vec<String> = Vec::with_capacity(fields.len());
                for f in fields {
                    if !ordered.contains(f) {
                        ordered.push(f.clone());
                    }
                }
                let schema = EntitySchema {
                    name: name.clone(),
                    fields: ordered,
                };
                (name.clone(), schema)
            })
            .collect();

        let relations = cfg
            .relations
            .iter()
            .map(|(entity, map)| {
                let map = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                (entity.clone(), map)
            })
            .collect();

        Self {
            sensitive,
            relations,
            relation_fallback: cfg.relation_fallback,
        }
    }

    /// Classify `entity`.
    pub fn resolve(&self, entity: &str) -> EntityType<'_> {
        match self.sensitive.get(entity) {
            Some(schema) => EntityType::Sensitive(schema),
            None => EntityType::PassThrough,
        }
    }

    /// Entity type that property `key` of `entity` resolves to, if any.
    ///
    /// Explicit relation entries always win. When the name-collision fallback
    /// is enabled, a key equal to a sensitive entity name also counts.
    pub fn related(&self, entity: &str, key: &str) -> Option<&str> {
        if let Some(target) = self.relations.get(entity).and_then(|m| m.get(key)) {
            return Some(target.as_str());
        }
        if self.relation_fallback {
            return self.sensitive.get_key_value(key).map(|(k, _)| k.as_str());
        }
        None
    }

    /// Number of entity types with at least one sensitive field.
    pub fn sensitive_len(&self) -> usize {
        self.sensitive.len()
    }

    /// Sensitive entity names, sorted.
    pub fn sensitive_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sensitive.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(yaml: &str) -> FieldsConfig {
        serde_yaml::from_str(yaml).expect("valid YAML")
    }

    #[test]
    fn resolves_sensitive_and_pass_through() {
        let reg = EntityRegistry::new(&cfg("sensitive:\n  users: [username, phone_number]\n"));
        match reg.resolve("users") {
            EntityType::Sensitive(s) => assert_eq!(s.fields, ["username", "phone_number"]),
            EntityType::PassThrough => panic!("users should be sensitive"),
        }
        assert_eq!(reg.resolve("appointments"), EntityType::PassThrough);
    }

    #[test]
    fn duplicate_fields_keep_first_position() {
        let reg = EntityRegistry::new(&cfg("sensitive:\n  notes: [content, ailments, content]\n"));
        let EntityType::Sensitive(s) = reg.resolve("notes") else {
            panic!("notes should be sensitive");
        };
        assert_eq!(s.fields, ["content", "ailments"]);
    }

    #[test]
    fn empty_field_list_is_pass_through() {
        let reg = EntityRegistry::new(&cfg("sensitive:\n  rooms: []\n"));
        assert_eq!(reg.resolve("rooms"), EntityType::PassThrough);
        assert_eq!(reg.sensitive_len(), 0);
    }

    #[test]
    fn explicit_relation_lookup() {
        let reg = EntityRegistry::new(&cfg(
            "sensitive:\n  users: [phone_number]\nrelations:\n  appointments:\n    patient: users\n",
        ));
        assert_eq!(reg.related("appointments", "patient"), Some("users"));
        assert_eq!(reg.related("appointments", "doctor"), None);
        assert_eq!(reg.related("users", "patient"), None);
    }

    #[test]
    fn name_collision_ignored_without_fallback() {
        let reg = EntityRegistry::new(&cfg("sensitive:\n  notes: [content]\n"));
        assert_eq!(reg.related("users", "notes"), None);
    }

    #[test]
    fn name_collision_used_with_fallback() {
        let reg = EntityRegistry::new(&cfg(
            "relation_fallback: true\nsensitive:\n  notes: [content]\nrelations:\n  users:\n    notes: clinical_notes\n",
        ));
        // Explicit entry beats the heuristic.
        assert_eq!(reg.related("users", "notes"), Some("clinical_notes"));
        assert_eq!(reg.related("doctors", "notes"), Some("notes"));
        assert_eq!(reg.related("doctors", "rooms"), None);
    }

    #[test]
    fn sensitive_names_sorted() {
        let reg = EntityRegistry::new(&cfg("sensitive:\n  users: [a]\n  notes: [b]\n  options: [c]\n"));
        assert_eq!(reg.sensitive_names(), ["notes", "options", "users"]);
    }
}
