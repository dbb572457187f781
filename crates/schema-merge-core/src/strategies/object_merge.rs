//! The `objectMerge` strategy: recursive merge of two JSON objects.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::pointer;
use crate::strategies::{str_option, Strategy};
use crate::walk::{WalkInstance, WalkSchema};

const NAME: &str = "objectMerge";

/// Merges head keys into the base object, descending with the subschema
/// selected from `properties`, then `patternProperties` (first matching
/// pattern in schema order), then an object-valued `additionalProperties`.
///
/// Base key order is preserved; new head keys append in head order. A
/// descent yielding the undefined sentinel removes the key. The output map
/// is materialized by the constructor named by the `objClass` option
/// (default `_default`).
///
/// This is the default strategy for object heads.
pub struct ObjectMerge;

fn select_subschema(schema: &JsonValue, key: &str) -> Result<JsonValue, MergeError> {
    let Some(obj) = schema.as_object() else {
        return Ok(JsonValue::undefined(schema.reference()));
    };

    if let Some(Value::Object(properties)) = obj.get("properties") {
        if let Some(sub) = properties.get(key) {
            return Ok(JsonValue::new(
                sub.clone(),
                pointer::build_path(schema.reference(), &["properties", key]),
            ));
        }
    }

    if let Some(Value::Object(patterns)) = obj.get("patternProperties") {
        for (pattern, sub) in patterns {
            let re = Regex::new(pattern).map_err(|e| {
                MergeError::Schema(
                    ErrorDetail::new(format!(
                        "Invalid 'patternProperties' pattern '{}': {}",
                        pattern, e
                    ))
                    .at(schema.reference())
                    .for_strategy(NAME),
                )
            })?;
            if re.is_match(key) {
                return Ok(JsonValue::new(
                    sub.clone(),
                    pointer::build_path(schema.reference(), &["patternProperties", pattern]),
                ));
            }
        }
    }

    // Boolean additionalProperties carries no subschema to descend with.
    if let Some(extra) = obj.get("additionalProperties") {
        if extra.is_object() {
            return Ok(JsonValue::new(
                extra.clone(),
                pointer::build_path(schema.reference(), &["additionalProperties"]),
            ));
        }
    }

    Ok(JsonValue::undefined(pointer::build_path(
        schema.reference(),
        &["properties", key],
    )))
}

impl Strategy for ObjectMerge {
    fn merge(
        &self,
        walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        schema: &JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let Some(head_obj) = head.as_object() else {
            return Err(MergeError::HeadInstance(
                ErrorDetail::new("Head is not an object")
                    .at(head.reference())
                    .for_strategy(NAME),
            ));
        };
        let mut entries: Map<String, Value> = match base.val() {
            None => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => {
                return Err(MergeError::BaseInstance(
                    ErrorDetail::new("Base is not an object")
                        .at(base.reference())
                        .for_strategy(NAME),
                ))
            }
        };

        let class_name = str_option(opts, "objClass", NAME)?.unwrap_or("_default");
        let Some(constructor) = walk.merger().objclass(class_name).cloned() else {
            return Err(MergeError::Schema(
                ErrorDetail::new(format!("Unknown object class '{}'", class_name))
                    .at(schema.reference())
                    .for_strategy(NAME),
            ));
        };

        for (key, value) in head_obj {
            let subschema = select_subschema(schema, key)?;
            let merged = walk.descend(subschema, base.get(key), head.subval(key, value.clone()))?;
            match merged.into_val() {
                Some(v) => {
                    entries.insert(key.clone(), v);
                }
                None => {
                    entries.shift_remove(key);
                }
            }
        }

        let map = (*constructor)(entries.into_iter().collect());
        Ok(JsonValue::new(Value::Object(map), base.reference()))
    }

    fn get_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let mut copy = match schema.as_object() {
            Some(obj) => obj.clone(),
            None => return Ok(schema),
        };

        for keyword in ["properties", "patternProperties"] {
            let Some(Value::Object(subschemas)) = copy.get(keyword).cloned() else {
                continue;
            };
            let mut rewritten = Map::new();
            for (key, sub) in subschemas {
                let sub_jv = JsonValue::new(
                    sub,
                    pointer::build_path(schema.reference(), &[keyword, &key]),
                );
                rewritten.insert(key, walk.descend(sub_jv)?.into_val().unwrap_or(Value::Null));
            }
            copy.insert(keyword.to_string(), Value::Object(rewritten));
        }

        if copy.get("additionalProperties").is_some_and(Value::is_object) {
            let sub_jv = JsonValue::new(
                copy["additionalProperties"].clone(),
                pointer::build_path(schema.reference(), &["additionalProperties"]),
            );
            let rewritten = walk.descend(sub_jv)?.into_val().unwrap_or(Value::Null);
            copy.insert("additionalProperties".to_string(), rewritten);
        }

        Ok(JsonValue::new(Value::Object(copy), schema.reference()))
    }
}
