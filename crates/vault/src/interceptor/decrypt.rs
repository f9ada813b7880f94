//! Inbound pass: decrypt configured fields across the whole result graph.
//!
//! The walk is driven by the [`EntityRegistry`](crate::schema::EntityRegistry):
//! an object of a sensitive type has its fields decrypted, then every property
//! that resolves to a related entity type is walked as that type. Objects of
//! pass-through types are not decrypted but are still walked.

use serde_json::{Map, Value};

use crate::schema::EntityType;

use super::Interceptor;

impl Interceptor {
    /// Decrypt `result`, which holds data of entity type `entity`: one object,
    /// an array of objects, or `null`.
    pub fn decrypt_result(&self, entity: &str, result: &mut Value) {
        match result {
            Value::Object(map) => self.decrypt_object(entity, map),
            Value::Array(items) => {
                for item in items {
                    self.decrypt_result(entity, item);
                }
            }
            _ => {}
        }
    }

    fn decrypt_object(&self, entity: &str, map: &mut Map<String, Value>) {
        if let EntityType::Sensitive(schema) = self.registry.resolve(entity) {
            for field in &schema.fields {
                if let Some(Value::String(s)) = map.get_mut(field) {
                    if !s.is_empty() {
                        *s = self.cipher.decrypt(s);
                    }
                }
            }
        }

        for (key, child) in map.iter_mut() {
            if let Some(related) = self.registry.related(entity, key) {
                self.decrypt_result(related, child);
            }
        }
    }
}
