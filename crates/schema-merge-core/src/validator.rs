//! Instance validation, consumed by the walker through a narrow interface.
//!
//! The core never validates schemas itself: the `oneOf` descender asks the
//! [`Validator`] which subschemas accept base and head, and strategies ask
//! [`Validator::is_type`] for cheap type dispatch. [`SchemaValidator`] is the
//! default implementation, backed by the `jsonschema` crate; a custom
//! implementation can be supplied via
//! [`MergerBuilder::validator`](crate::MergerBuilder::validator).

use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;

/// A single validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub message: String,
    /// JSON Pointer into the instance where validation failed.
    pub instance_path: String,
}

/// The validation interface consumed by the walker.
pub trait Validator: Send + Sync {
    /// JSON Schema type check: `array`, `object`, `string`, `number`,
    /// `integer`, `boolean`, `null`.
    fn is_type(&self, value: &Value, type_name: &str) -> bool;

    /// Validate `instance` against a subschema of the root schema document.
    ///
    /// The subschema arrives as a [`JsonValue`] so implementations can use
    /// its pointer to resolve in-document `$ref`s against the root.
    fn iter_errors(
        &self,
        instance: &Value,
        schema: &JsonValue,
    ) -> Result<Vec<ValidationIssue>, MergeError>;

    fn is_valid(&self, instance: &Value, schema: &JsonValue) -> Result<bool, MergeError> {
        Ok(self.iter_errors(instance, schema)?.is_empty())
    }
}

/// Draft-4 style type check shared by the default validator and strategies.
///
/// `integer` accepts only integral JSON numbers, not floats with a zero
/// fractional part, matching draft 4.
pub(crate) fn is_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => false,
    }
}

fn contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key("$ref") || map.values().any(contains_ref)
        }
        Value::Array(items) => items.iter().any(contains_ref),
        _ => false,
    }
}

/// Default [`Validator`] over the `jsonschema` crate.
///
/// Subschemas that carry no `$ref` compile standalone. Subschemas addressed
/// by a local pointer compile as `{…root document…, "$ref": "#<pointer>"}`:
/// under draft 4 the `$ref` shadows its siblings, and in-document references
/// inside the subschema resolve against the full root document, matching how
/// a validator rooted at the schema document behaves.
pub struct SchemaValidator {
    root: Value,
    draft: jsonschema::Draft,
}

impl SchemaValidator {
    /// Validator over `root` using draft 4, the draft the merge annotations
    /// were designed against.
    pub fn new(root: Value) -> Self {
        Self::with_draft(root, jsonschema::Draft::Draft4)
    }

    /// Validator with an explicit JSON Schema draft.
    pub fn with_draft(root: Value, draft: jsonschema::Draft) -> Self {
        SchemaValidator { root, draft }
    }

    fn compile(&self, schema: &JsonValue) -> Result<jsonschema::Validator, MergeError> {
        let sub = schema.val().ok_or_else(|| {
            MergeError::Schema(
                ErrorDetail::new("Cannot validate against an undefined schema")
                    .at(schema.reference()),
            )
        })?;

        let reference = schema.reference();
        let target = if !contains_ref(sub) {
            sub.clone()
        } else if reference.starts_with('#') {
            match &self.root {
                Value::Object(map) => {
                    let mut wrapper = map.clone();
                    wrapper.insert("$ref".to_string(), Value::String(reference.to_string()));
                    Value::Object(wrapper)
                }
                _ => sub.clone(),
            }
        } else {
            // Subschema of a cached remote document: best effort, standalone.
            sub.clone()
        };

        jsonschema::options()
            .with_draft(self.draft)
            .build(&target)
            .map_err(|e| {
                MergeError::Schema(
                    ErrorDetail::new(format!("Schema failed to compile: {}", e))
                        .at(schema.reference()),
                )
            })
    }
}

impl Validator for SchemaValidator {
    fn is_type(&self, value: &Value, type_name: &str) -> bool {
        is_type(value, type_name)
    }

    fn iter_errors(
        &self,
        instance: &Value,
        schema: &JsonValue,
    ) -> Result<Vec<ValidationIssue>, MergeError> {
        let validator = self.compile(schema)?;
        Ok(validator
            .iter_errors(instance)
            .map(|e| ValidationIssue {
                message: e.to_string(),
                instance_path: e.instance_path.to_string(),
            })
            .collect())
    }
}
