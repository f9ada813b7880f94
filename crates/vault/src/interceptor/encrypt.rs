//! Outbound pass: encrypt configured fields in write payloads and filters.
//!
//! Always deterministic, so a filter on a sensitive field's plaintext matches
//! the ciphertext stored by an earlier write.

use serde_json::{Map, Value};

use crate::schema::{EntitySchema, EntityType};
use crate::store::{Operation, StorageRequest};

use super::Interceptor;

impl Interceptor {
    /// Encrypt sensitive fields in `request.args` in place.
    ///
    /// No-op for pass-through entities and for [`Operation::Other`].
    pub fn encrypt_request(&self, request: &mut StorageRequest) {
        let EntityType::Sensitive(schema) = self.registry.resolve(&request.model) else {
            return;
        };
        if matches!(request.operation, Operation::Other(_)) {
            return;
        }
        let Value::Object(args) = &mut request.args else {
            return;
        };

        match request.operation {
            Operation::Create | Operation::Update | Operation::CreateMany => {
                if let Some(data) = args.get_mut("data") {
                    self.encrypt_payload(schema, data);
                }
            }
            Operation::Upsert => {
                for key in ["create", "update"] {
                    if let Some(data) = args.get_mut(key) {
                        self.encrypt_payload(schema, data);
                    }
                }
            }
            _ => {}
        }

        if let Some(filter) = args.get_mut("where") {
            self.encrypt_filter(schema, filter);
        }
    }

    /// A single object, or each object of an array.
    fn encrypt_payload(&self, schema: &EntitySchema, payload: &mut Value) {
        match payload {
            Value::Object(map) => self.encrypt_fields(schema, map),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(map) = item {
                        self.encrypt_fields(schema, map);
                    }
                }
            }
            _ => {}
        }
    }

    fn encrypt_fields(&self, schema: &EntitySchema, map: &mut Map<String, Value>) {
        for field in &schema.fields {
            if let Some(value) = map.get_mut(field) {
                self.encrypt_leaf(value);
            }
        }
    }

    fn encrypt_filter(&self, schema: &EntitySchema, filter: &mut Value) {
        let Value::Object(clauses) = filter else {
            return;
        };
        for (key, cond) in clauses.iter_mut() {
            match key.as_str() {
                "AND" | "OR" | "NOT" => match cond {
                    Value::Array(items) => {
                        for item in items {
                            self.encrypt_filter(schema, item);
                        }
                    }
                    Value::Object(_) => self.encrypt_filter(schema, cond),
                    _ => {}
                },
                field if schema.fields.iter().any(|f| f == field) => self.encrypt_condition(cond),
                _ => {}
            }
        }
    }

    /// A bare value, or an operator object (`equals`, `not`, `in`, `notIn`).
    fn encrypt_condition(&self, cond: &mut Value) {
        let Value::Object(ops) = cond else {
            self.encrypt_leaf(cond);
            return;
        };
        for (op, operand) in ops.iter_mut() {
            match op.as_str() {
                "equals" => self.encrypt_leaf(operand),
                "not" => self.encrypt_condition(operand),
                "in" | "notIn" => {
                    if let Value::Array(items) = operand {
                        items.iter_mut().for_each(|item| self.encrypt_leaf(item));
                    }
                }
                _ => {}
            }
        }
    }

    fn encrypt_leaf(&self, value: &mut Value) {
        if let Value::String(s) = value {
            if !s.is_empty() {
                *s = self.cipher.encrypt_deterministic(s);
            }
        }
    }
}
