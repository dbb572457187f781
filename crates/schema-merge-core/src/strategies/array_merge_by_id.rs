//! The `arrayMergeById` strategy: merge two arrays as keyed collections.

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::pointer;
use crate::strategies::Strategy;
use crate::walk::{WalkInstance, WalkSchema};

const NAME: &str = "arrayMergeById";

/// Head elements pair with base elements by the value at `idRef` (a JSON
/// Pointer into each element, default `"id"`; an array of pointers forms a
/// composite key). Matched elements merge in place under the `items`
/// subschema, unmatched head elements append in head order, and base
/// elements without a head counterpart stay put.
///
/// Elements whose key does not resolve are ignored; head elements whose key
/// equals `ignoreId` are dropped.
pub struct ArrayMergeById;

enum IdRef {
    Single(String),
    Composite(Vec<String>),
}

fn parse_id_ref(opts: &Map<String, Value>) -> Result<IdRef, MergeError> {
    let invalid = || {
        MergeError::Schema(
            ErrorDetail::new("'idRef' option is not a JSON Pointer or array of JSON Pointers")
                .for_strategy(NAME),
        )
    };
    match opts.get("idRef") {
        None => Ok(IdRef::Single("id".to_string())),
        Some(Value::String(p)) => Ok(IdRef::Single(p.clone())),
        Some(Value::Array(items)) => {
            let mut pointers = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(p) => pointers.push(p.clone()),
                    _ => return Err(invalid()),
                }
            }
            Ok(IdRef::Composite(pointers))
        }
        Some(_) => Err(invalid()),
    }
}

/// Resolve an element's key. `None` when any component pointer fails.
fn key_of(item: &Value, id_ref: &IdRef) -> Option<Value> {
    match id_ref {
        IdRef::Single(p) => pointer::resolve_fragment(item, p).cloned(),
        IdRef::Composite(pointers) => {
            let mut parts = Vec::with_capacity(pointers.len());
            for p in pointers {
                parts.push(pointer::resolve_fragment(item, p)?.clone());
            }
            Some(Value::Array(parts))
        }
    }
}

/// Normalize `ignoreId` into a list of ignored key values.
///
/// With a single-pointer `idRef` an array is a list of values; with a
/// composite `idRef` an array of arrays is a list of composite keys, while a
/// flat array is one composite key.
fn ignored_keys(opts: &Map<String, Value>, id_ref: &IdRef) -> Vec<Value> {
    match opts.get("ignoreId") {
        None => Vec::new(),
        Some(Value::Array(items)) => match id_ref {
            IdRef::Single(_) => items.clone(),
            IdRef::Composite(_) => {
                if items.iter().all(Value::is_array) {
                    items.clone()
                } else {
                    vec![Value::Array(items.clone())]
                }
            }
        },
        Some(v) => vec![v.clone()],
    }
}

fn items_subschema(schema: &JsonValue) -> Result<JsonValue, MergeError> {
    let reference = pointer::build_path(schema.reference(), &["items"]);
    match schema.as_object().and_then(|o| o.get("items")).cloned() {
        Some(Value::Array(_)) => Err(MergeError::Schema(
            ErrorDetail::new("'items' in array form is not supported")
                .at(reference)
                .for_strategy(NAME),
        )),
        Some(sub @ Value::Object(_)) => Ok(JsonValue::new(sub, reference)),
        _ => Ok(JsonValue::undefined(reference)),
    }
}

impl Strategy for ArrayMergeById {
    fn merge(
        &self,
        walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        schema: &JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let Some(head_items) = head.as_array() else {
            return Err(MergeError::HeadInstance(
                ErrorDetail::new("Head is not an array")
                    .at(head.reference())
                    .for_strategy(NAME),
            ));
        };
        let mut result: Vec<Value> = match base.val() {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(MergeError::BaseInstance(
                    ErrorDetail::new("Base is not an array")
                        .at(base.reference())
                        .for_strategy(NAME),
                ))
            }
        };

        let items = items_subschema(schema)?;
        let id_ref = parse_id_ref(opts)?;
        let ignored = ignored_keys(opts, &id_ref);

        // Keys resolve up front; elements without one are skipped entirely.
        let head_keys: Vec<Option<Value>> =
            head_items.iter().map(|h| key_of(h, &id_ref)).collect();

        for i in 0..head_keys.len() {
            let Some(key) = &head_keys[i] else { continue };
            if head_keys[i + 1..].iter().flatten().any(|other| other == key) {
                return Err(MergeError::HeadInstance(
                    ErrorDetail::new("Several elements of 'head' have the same id")
                        .at(pointer::build_path(head.reference(), &[&i.to_string()]))
                        .for_strategy(NAME),
                ));
            }
        }

        for (i, head_item) in head_items.iter().enumerate() {
            let Some(key) = &head_keys[i] else { continue };
            if ignored.contains(key) {
                continue;
            }
            let head_item = head.subval(&i.to_string(), head_item.clone());

            let matches: Vec<usize> = result
                .iter()
                .enumerate()
                .filter(|(_, b)| key_of(b, &id_ref).as_ref() == Some(key))
                .map(|(j, _)| j)
                .collect();

            match matches.as_slice() {
                [] => {
                    let slot =
                        JsonValue::undefined(base.child_reference(&result.len().to_string()));
                    let merged = walk.descend(items.clone(), slot, head_item)?;
                    if let Some(value) = merged.into_val() {
                        result.push(value);
                    }
                }
                [j] => {
                    let j = *j;
                    let base_item =
                        JsonValue::new(result[j].clone(), base.child_reference(&j.to_string()));
                    let merged = walk.descend(items.clone(), base_item, head_item)?;
                    match merged.into_val() {
                        Some(value) => result[j] = value,
                        None => {
                            return Err(MergeError::Schema(
                                ErrorDetail::new("Merge produced an undefined array element")
                                    .at(base.child_reference(&j.to_string()))
                                    .for_strategy(NAME),
                            ))
                        }
                    }
                }
                _ => {
                    return Err(MergeError::BaseInstance(
                        ErrorDetail::new("Several elements of 'base' match the same id")
                            .at(head_item.reference())
                            .for_strategy(NAME),
                    ))
                }
            }
        }

        Ok(JsonValue::new(Value::Array(result), base.reference()))
    }

    /// Rewrites the `items` subschema and splices it back; a `$ref` inside
    /// `items` stays a `$ref` in the output (the descent rewrites its
    /// target).
    fn get_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let items = items_subschema(&schema)?;
        if items.is_undef() {
            return Ok(schema);
        }
        let rewritten = walk.descend(items)?.into_val().unwrap_or(Value::Null);
        let mut copy = match schema.as_object() {
            Some(obj) => obj.clone(),
            None => return Ok(schema),
        };
        copy.insert("items".to_string(), rewritten);
        Ok(JsonValue::new(Value::Object(copy), schema.reference()))
    }
}
