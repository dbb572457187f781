//! Pre-strategy handlers for JSON Schema composition keywords.
//!
//! Descenders re-route the walk before any strategy is consulted. Each one
//! either handles the node (returns `Some(result)`) or passes (`None`), and
//! the walker offers the node to the chain in fixed order: a `$ref` is
//! followed before `oneOf` is interpreted, and `oneOf` takes precedence over
//! `anyOf`/`allOf`.

use serde_json::Value;

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::pointer;
use crate::walk::{WalkInstance, WalkSchema};

pub(crate) trait Descender: Sync {
    fn descend_instance(
        &self,
        walk: &mut WalkInstance<'_>,
        schema: &JsonValue,
        base: &JsonValue,
        head: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError>;

    fn descend_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError>;
}

/// Fixed descender order.
pub(crate) static CHAIN: [&dyn Descender; 3] = [&Ref, &OneOf, &AnyOfAllOf];

fn ref_of(schema: &JsonValue) -> Option<&str> {
    schema
        .val()
        .and_then(|v| v.get("$ref"))
        .and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// $ref
// ---------------------------------------------------------------------------

/// Follows `$ref` before anything else is interpreted; the referenced schema
/// may itself carry a strategy.
struct Ref;

impl Descender for Ref {
    fn descend_instance(
        &self,
        walk: &mut WalkInstance<'_>,
        schema: &JsonValue,
        base: &JsonValue,
        head: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError> {
        let Some(reference) = ref_of(schema) else {
            return Ok(None);
        };
        let (_, resolved) = walk.resolver().resolve(reference)?;
        let resolved = JsonValue::new(resolved, reference);
        walk.descend(resolved, base.clone(), head.clone()).map(Some)
    }

    /// Rewrite the target once per distinct `$ref` string, in place in the
    /// working document, and leave the `$ref` itself in the output. Remote
    /// references are left untouched.
    fn descend_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError> {
        let Some(reference) = ref_of(schema) else {
            return Ok(None);
        };
        if walk.already_rewritten(reference) || walk.is_remote(reference) {
            return Ok(Some(schema.clone()));
        }
        walk.mark_rewritten(reference);

        let (fragment, target) = walk.resolve_target(reference)?;
        if !target.is_object() {
            return Err(MergeError::Schema(
                ErrorDetail::new("'$ref' does not point to an object").at(schema.reference()),
            ));
        }
        let rewritten = walk.descend(JsonValue::new(target, reference))?;
        tracing::debug!(reference, "rewrote $ref target");
        if let Some(value) = rewritten.into_val() {
            walk.write_back(&fragment, value);
        }
        Ok(Some(schema.clone()))
    }
}

// ---------------------------------------------------------------------------
// oneOf
// ---------------------------------------------------------------------------

/// Dispatches through `oneOf` when the node carries no explicit strategy:
/// exactly one subschema must validate both base and head. An undefined side
/// validates trivially against every subschema.
struct OneOf;

fn one_of_subschemas(schema: &JsonValue) -> Option<Vec<JsonValue>> {
    let obj = schema.as_object()?;
    // An explicit strategy always wins over `oneOf` dispatch.
    if obj.contains_key("mergeStrategy") {
        return None;
    }
    let subs = obj.get("oneOf")?.as_array()?;
    Some(
        subs.iter()
            .enumerate()
            .map(|(i, sub)| {
                JsonValue::new(
                    sub.clone(),
                    pointer::build_path(schema.reference(), &["oneOf", &i.to_string()]),
                )
            })
            .collect(),
    )
}

impl Descender for OneOf {
    fn descend_instance(
        &self,
        walk: &mut WalkInstance<'_>,
        schema: &JsonValue,
        base: &JsonValue,
        head: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError> {
        let Some(subs) = one_of_subschemas(schema) else {
            return Ok(None);
        };

        let validator = walk.merger().validator();
        let mut matching = Vec::new();
        for sub in subs {
            let base_ok = match base.val() {
                None => true,
                Some(v) => validator.is_valid(v, &sub)?,
            };
            let head_ok = match head.val() {
                None => true,
                Some(v) => validator.is_valid(v, &sub)?,
            };
            if base_ok && head_ok {
                matching.push(sub);
            }
        }

        if matching.len() > 1 {
            return Err(MergeError::HeadInstance(
                ErrorDetail::new("Multiple elements of 'oneOf' validate").at(schema.reference()),
            ));
        }
        let Some(sub) = matching.pop() else {
            return Err(MergeError::HeadInstance(
                ErrorDetail::new("No element of 'oneOf' validates both base and head")
                    .at(schema.reference()),
            ));
        };
        tracing::trace!(matched = %sub.reference(), "oneOf dispatch");
        walk.descend(sub, base.clone(), head.clone()).map(Some)
    }

    fn descend_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError> {
        let Some(subs) = one_of_subschemas(schema) else {
            return Ok(None);
        };
        let mut rewritten = Vec::with_capacity(subs.len());
        for sub in subs {
            rewritten.push(walk.descend(sub)?.into_val().unwrap_or(Value::Null));
        }
        let mut copy = schema
            .as_object()
            .expect("one_of_subschemas only matches objects")
            .clone();
        copy.insert("oneOf".to_string(), Value::Array(rewritten));
        Ok(Some(JsonValue::new(Value::Object(copy), schema.reference())))
    }
}

// ---------------------------------------------------------------------------
// anyOf / allOf
// ---------------------------------------------------------------------------

/// The walker cannot choose a branch of `anyOf`/`allOf`. An explicit
/// `mergeStrategy: "overwrite"` passes through; anything else is a schema
/// error.
struct AnyOfAllOf;

fn check_any_all(schema: &JsonValue) -> Result<(), MergeError> {
    let Some(obj) = schema.as_object() else {
        return Ok(());
    };
    if !obj.contains_key("anyOf") && !obj.contains_key("allOf") {
        return Ok(());
    }
    if obj.get("mergeStrategy").and_then(Value::as_str) == Some("overwrite") {
        return Ok(());
    }
    Err(MergeError::Schema(
        ErrorDetail::new("Can't descend to 'allOf' and 'anyOf' keywords").at(schema.reference()),
    ))
}

impl Descender for AnyOfAllOf {
    fn descend_instance(
        &self,
        _walk: &mut WalkInstance<'_>,
        schema: &JsonValue,
        _base: &JsonValue,
        _head: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError> {
        check_any_all(schema)?;
        Ok(None)
    }

    fn descend_schema(
        &self,
        _walk: &mut WalkSchema<'_>,
        schema: &JsonValue,
    ) -> Result<Option<JsonValue>, MergeError> {
        check_any_all(schema)?;
        Ok(None)
    }
}
