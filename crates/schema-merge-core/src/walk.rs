//! The two dual walks.
//!
//! [`WalkInstance`] folds a head document into a base document under the
//! schema's merge annotations; [`WalkSchema`] rewrites the schema into the
//! schema of merged results. Both share the same recursion: enter the schema
//! node's resolution scope, offer the node to the composition descenders
//! (`$ref`, `oneOf`, `anyOf`/`allOf`), and otherwise dispatch to a strategy
//! by `mergeStrategy` name, falling back to a walk-specific default.
//!
//! Walkers are transient: one per top-level
//! [`Merger::merge`](crate::Merger::merge) /
//! [`Merger::get_schema`](crate::Merger::get_schema) call, never shared.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::descend;
use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::merger::Merger;
use crate::pointer;
use crate::resolver::RefResolver;

/// Schema keywords that mark a schema as object-shaped for the schema walk's
/// default-strategy rule.
const OBJECT_KEYWORDS: [&str; 7] = [
    "maxProperties",
    "minProperties",
    "required",
    "additionalProperties",
    "properties",
    "patternProperties",
    "dependencies",
];

/// Extract `mergeStrategy` and `mergeOptions` from a schema node.
///
/// Both are empty when the schema is undefined or not an object.
fn annotations(schema: &JsonValue) -> Result<(Option<String>, Map<String, Value>), MergeError> {
    let Some(obj) = schema.as_object() else {
        return Ok((None, Map::new()));
    };
    let name = match obj.get("mergeStrategy") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(MergeError::Schema(
                ErrorDetail::new("'mergeStrategy' is not a string").at(schema.reference()),
            ))
        }
    };
    let opts = match obj.get("mergeOptions") {
        None => Map::new(),
        Some(Value::Object(m)) => m.clone(),
        Some(_) => {
            return Err(MergeError::Schema(
                ErrorDetail::new("'mergeOptions' is not an object").at(schema.reference()),
            ))
        }
    };
    Ok((name, opts))
}

/// Overlay the per-call options for `name` on top of the schema-level ones.
fn overlay_call_options(opts: &mut Map<String, Value>, call: &Map<String, Value>, name: &str) {
    if let Some(Value::Object(overrides)) = call.get(name) {
        for (k, v) in overrides {
            opts.insert(k.clone(), v.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Instance walk
// ---------------------------------------------------------------------------

/// One instance walk: schema + base + head → merged value.
pub struct WalkInstance<'a> {
    merger: &'a Merger,
    resolver: RefResolver<'a>,
    merge_options: Map<String, Value>,
    depth: usize,
}

impl<'a> WalkInstance<'a> {
    pub(crate) fn new(merger: &'a Merger, merge_options: Map<String, Value>) -> Self {
        WalkInstance {
            merger,
            resolver: RefResolver::new(merger.store()),
            merge_options,
            depth: 0,
        }
    }

    /// The owning [`Merger`] (validator, strategy registry, objclass menu).
    pub fn merger(&self) -> &'a Merger {
        self.merger
    }

    pub(crate) fn resolver(&self) -> &RefResolver<'a> {
        &self.resolver
    }

    /// One step of traversal: merge `head` into `base` under `schema`.
    ///
    /// Strategies call back into this for their sub-nodes.
    pub fn descend(
        &mut self,
        schema: JsonValue,
        base: JsonValue,
        head: JsonValue,
    ) -> Result<JsonValue, MergeError> {
        if schema.is_undef() {
            return self.apply(&schema, base, head);
        }
        self.resolver.push_scope(schema.reference());
        self.depth += 1;
        let result = self.descend_scoped(&schema, base, head);
        self.depth -= 1;
        self.resolver.pop_scope();
        result
    }

    fn descend_scoped(
        &mut self,
        schema: &JsonValue,
        base: JsonValue,
        head: JsonValue,
    ) -> Result<JsonValue, MergeError> {
        tracing::trace!(depth = self.depth, schema = %schema.reference(), "descend");
        for descender in descend::CHAIN {
            if let Some(result) = descender.descend_instance(self, schema, &base, &head)? {
                return Ok(result);
            }
        }
        self.apply(schema, base, head)
    }

    fn apply(
        &mut self,
        schema: &JsonValue,
        base: JsonValue,
        head: JsonValue,
    ) -> Result<JsonValue, MergeError> {
        let (explicit, mut opts) = annotations(schema)?;
        let name = explicit.unwrap_or_else(|| self.default_strategy(&head).to_string());
        overlay_call_options(&mut opts, &self.merge_options, &name);

        let merger = self.merger;
        let Some(strategy) = merger.strategy(&name) else {
            return Err(MergeError::Schema(
                ErrorDetail::new(format!("Unknown merge strategy '{}'", name))
                    .at(schema.reference()),
            ));
        };
        tracing::trace!(strategy = %name, "merge");
        strategy.merge(self, base, head, schema, &opts)
    }

    /// Default strategy when the schema carries no `mergeStrategy`:
    /// `objectMerge` for an object head, `overwrite` otherwise.
    pub fn default_strategy(&self, head: &JsonValue) -> &'static str {
        match head.val() {
            Some(v) if self.merger.validator().is_type(v, "object") => "objectMerge",
            _ => "overwrite",
        }
    }
}

// ---------------------------------------------------------------------------
// Schema walk
// ---------------------------------------------------------------------------

/// One schema walk: schema → schema of merged results.
///
/// Owns a working copy of the root schema document so that the `$ref`
/// descender can write rewritten targets back in place; the touched pointers
/// are spliced into the final result by [`finish`](Self::finish).
pub struct WalkSchema<'a> {
    merger: &'a Merger,
    resolver: RefResolver<'a>,
    doc: Value,
    rewritten_refs: HashSet<String>,
    touched: Vec<String>,
    merge_options: Map<String, Value>,
    depth: usize,
}

impl<'a> WalkSchema<'a> {
    pub(crate) fn new(merger: &'a Merger, merge_options: Map<String, Value>) -> Self {
        // Seeding with "#" terminates on schemas that reference their root.
        let mut rewritten_refs = HashSet::new();
        rewritten_refs.insert("#".to_string());
        WalkSchema {
            merger,
            resolver: RefResolver::new(merger.store()),
            doc: merger.schema().clone(),
            rewritten_refs,
            touched: Vec::new(),
            merge_options,
            depth: 0,
        }
    }

    /// The owning [`Merger`].
    pub fn merger(&self) -> &'a Merger {
        self.merger
    }

    /// One step of traversal: rewrite `schema` into its merged-result form.
    pub fn descend(&mut self, schema: JsonValue) -> Result<JsonValue, MergeError> {
        if schema.is_undef() {
            return Ok(schema);
        }
        self.resolver.push_scope(schema.reference());
        self.depth += 1;
        let result = self.descend_scoped(&schema);
        self.depth -= 1;
        self.resolver.pop_scope();
        result
    }

    fn descend_scoped(&mut self, schema: &JsonValue) -> Result<JsonValue, MergeError> {
        tracing::trace!(depth = self.depth, schema = %schema.reference(), "schema descend");
        for descender in descend::CHAIN {
            if let Some(result) = descender.descend_schema(self, schema)? {
                return Ok(result);
            }
        }
        self.apply(schema)
    }

    fn apply(&mut self, schema: &JsonValue) -> Result<JsonValue, MergeError> {
        let (explicit, mut opts) = annotations(schema)?;
        let name = explicit.unwrap_or_else(|| Self::default_strategy(schema).to_string());
        overlay_call_options(&mut opts, &self.merge_options, &name);

        let merger = self.merger;
        let Some(strategy) = merger.strategy(&name) else {
            return Err(MergeError::Schema(
                ErrorDetail::new(format!("Unknown merge strategy '{}'", name))
                    .at(schema.reference()),
            ));
        };

        // The annotations drove dispatch; they do not describe merged output.
        let stripped = match schema.val() {
            Some(Value::Object(map)) => {
                let mut copy = map.clone();
                copy.shift_remove("mergeStrategy");
                copy.shift_remove("mergeOptions");
                JsonValue::new(Value::Object(copy), schema.reference())
            }
            _ => schema.clone(),
        };
        strategy.get_schema(self, stripped, &opts)
    }

    /// Schema-walk default strategy: `objectMerge` when the node carries any
    /// object keyword or `type: "object"`, `overwrite` otherwise.
    pub fn default_strategy(schema: &JsonValue) -> &'static str {
        let Some(obj) = schema.as_object() else {
            return "overwrite";
        };
        let object_like = OBJECT_KEYWORDS.iter().any(|k| obj.contains_key(*k))
            || obj.get("type").and_then(Value::as_str) == Some("object");
        if object_like {
            "objectMerge"
        } else {
            "overwrite"
        }
    }

    /// Deep-resolve `$ref`s inside an option subschema (`metadataSchema`)
    /// against the root schema's resolver.
    pub fn resolve_option_refs(&self, value: &Value) -> Result<Value, MergeError> {
        let mut visiting = HashSet::new();
        self.resolve_option_refs_inner(value, &mut visiting)
    }

    fn resolve_option_refs_inner(
        &self,
        value: &Value,
        visiting: &mut HashSet<String>,
    ) -> Result<Value, MergeError> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    if !visiting.insert(reference.clone()) {
                        return Err(MergeError::Schema(ErrorDetail::new(format!(
                            "Circular reference '{}' in option subschema",
                            reference
                        ))));
                    }
                    let (_, node) = self.resolver.resolve(reference)?;
                    let resolved = self.resolve_option_refs_inner(&node, visiting)?;
                    visiting.remove(reference);
                    return Ok(resolved);
                }
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_option_refs_inner(v, visiting)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.resolve_option_refs_inner(v, visiting))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    // --- $ref rewriting support (used by the Ref descender) ---

    pub(crate) fn already_rewritten(&self, reference: &str) -> bool {
        self.rewritten_refs.contains(reference)
    }

    pub(crate) fn mark_rewritten(&mut self, reference: &str) {
        self.rewritten_refs.insert(reference.to_string());
    }

    pub(crate) fn is_remote(&self, reference: &str) -> bool {
        self.resolver.is_remote(reference)
    }

    /// Resolve a local reference against the *working* document, returning
    /// the target's fragment pointer and a copy of the node.
    pub(crate) fn resolve_target(&self, reference: &str) -> Result<(String, Value), MergeError> {
        let url = self.resolver.scope().join(reference).map_err(|e| {
            MergeError::Schema(
                ErrorDetail::new(format!("Invalid reference '{}': {}", reference, e)),
            )
        })?;
        let fragment = format!("#{}", url.fragment().unwrap_or(""));
        let node = pointer::resolve_fragment(&self.doc, &fragment)
            .cloned()
            .ok_or_else(|| {
                MergeError::Schema(
                    ErrorDetail::new(format!("Unresolvable reference '{}'", reference)),
                )
            })?;
        Ok((fragment, node))
    }

    /// Write a rewritten target back into the working document so that every
    /// reference site resolves to the rewritten content.
    pub(crate) fn write_back(&mut self, fragment: &str, value: Value) {
        if let Some(slot) = self.doc.pointer_mut(native_pointer(fragment)) {
            *slot = value;
            self.touched.push(fragment.to_string());
        }
    }

    /// Splice the rewritten `$ref` targets into the walked result.
    pub(crate) fn finish(self, result: JsonValue) -> Value {
        let mut out = result.into_val().unwrap_or(Value::Null);
        for fragment in &self.touched {
            let native = native_pointer(fragment);
            let Some(node) = self.doc.pointer(native).cloned() else {
                continue;
            };
            if let Some(slot) = out.pointer_mut(native) {
                *slot = node;
            }
        }
        out
    }
}

/// `#/a/b` → `/a/b`, the form `serde_json::Value::pointer` expects.
fn native_pointer(fragment: &str) -> &str {
    fragment.strip_prefix('#').unwrap_or(fragment)
}
