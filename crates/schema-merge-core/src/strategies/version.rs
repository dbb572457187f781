//! The `version` strategy: accumulate a history of versioned snapshots.

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::strategies::{object_option, usize_option, Strategy};
use crate::walk::{WalkInstance, WalkSchema};

const NAME: &str = "version";

/// Each merge appends `{…metadata…, "value": head}` to the base list.
///
/// Options:
/// - `limit`: keep only the last N entries,
/// - `ignoreDups` (default true; legacy alias `unique`): skip the append
///   when the last entry already holds this head,
/// - `metadata`: extra fields for each history entry,
/// - `metadataSchema` (schema walk): schema of those fields, woven into the
///   result's `items`.
pub struct Version;

impl Strategy for Version {
    fn merge(
        &self,
        _walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        _schema: &JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let limit = usize_option(opts, "limit", NAME)?;
        let ignore_dups = match opts.get("ignoreDups").or_else(|| opts.get("unique")) {
            None => true,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(MergeError::Schema(
                    ErrorDetail::new("'ignoreDups' option is not a boolean").for_strategy(NAME),
                ))
            }
        };
        let metadata = object_option(opts, "metadata", NAME)?;

        let mut history: Vec<Value> = match base.val() {
            None => Vec::new(),
            Some(Value::Array(items))
                if items
                    .iter()
                    .all(|it| it.as_object().is_some_and(|o| o.contains_key("value"))) =>
            {
                items.clone()
            }
            Some(_) => {
                return Err(MergeError::BaseInstance(
                    ErrorDetail::new("Base is not an array of versioned values")
                        .at(base.reference())
                        .for_strategy(NAME),
                ))
            }
        };

        // Structural equality; serde_json cannot represent NaN, so the
        // comparison never fails.
        let head_value = head.val().cloned().unwrap_or(Value::Null);
        if ignore_dups {
            if let Some(last) = history.last().and_then(Value::as_object) {
                if last.get("value") == Some(&head_value) {
                    return Ok(JsonValue::new(Value::Array(history), base.reference()));
                }
            }
        }

        let mut entry = metadata.cloned().unwrap_or_default();
        entry.insert("value".to_string(), head_value);
        history.push(Value::Object(entry));

        if let Some(limit) = limit {
            if history.len() > limit {
                history.drain(..history.len() - limit);
            }
        }
        Ok(JsonValue::new(Value::Array(history), base.reference()))
    }

    fn get_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let limit = usize_option(opts, "limit", NAME)?;

        let mut item = match object_option(opts, "metadataSchema", NAME)? {
            Some(metadata_schema) => {
                match walk.resolve_option_refs(&Value::Object(metadata_schema.clone()))? {
                    Value::Object(resolved) => resolved,
                    _ => Map::new(),
                }
            }
            None => Map::new(),
        };

        let mut properties = match item.get("properties").and_then(Value::as_object) {
            Some(p) => p.clone(),
            None => Map::new(),
        };
        properties.insert(
            "value".to_string(),
            schema.val().cloned().unwrap_or(Value::Null),
        );
        item.insert("properties".to_string(), Value::Object(properties));

        let mut result = Map::new();
        result.insert("type".to_string(), Value::String("array".to_string()));
        result.insert("items".to_string(), Value::Object(item));
        if let Some(limit) = limit {
            result.insert("maxItems".to_string(), Value::from(limit as u64));
        }
        Ok(JsonValue::new(Value::Object(result), schema.reference()))
    }
}
