//! Local `$ref` resolution.
//!
//! [`SchemaStore`] maps schema URIs to documents: the root schema is seeded
//! under its `id`/`$id` (or a default base URI), and further documents can be
//! deposited via [`Merger::cache_schema`](crate::Merger::cache_schema).
//!
//! [`RefResolver`] is the per-walk view of the store. It keeps a stack of
//! base-URI scopes so that relative references resolve against the schema
//! node currently being walked, and classifies references as *local* (same
//! document as the root schema) or *remote*. No network fetching: a remote
//! reference resolves only if its document was cached beforehand.

use std::collections::HashMap;

use serde_json::Value;
use url::Url;

use crate::error::{ErrorDetail, MergeError};
use crate::pointer;

/// Default base URI for documents with no explicit `id`/`$id`.
///
/// A `file:` scheme so that `Url::join` works for fragment-only references.
const DEFAULT_BASE: &str = "file:///schema.json";

pub(crate) fn default_base_uri() -> Url {
    Url::parse(DEFAULT_BASE).expect("DEFAULT_BASE is a valid URL")
}

/// The document identity declared by a schema: `$id`, or draft-4 `id`.
pub(crate) fn schema_id(schema: &Value) -> Option<&str> {
    schema
        .get("$id")
        .or_else(|| schema.get("id"))
        .and_then(Value::as_str)
}

fn without_fragment(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_fragment(None);
    stripped
}

/// Cache of schema documents keyed by absolute URI (fragment stripped).
#[derive(Debug)]
pub struct SchemaStore {
    docs: HashMap<String, Value>,
    root_uri: Url,
}

impl SchemaStore {
    /// Build a store seeded with the root schema under its `id`/`$id`,
    /// falling back to the default base URI.
    pub fn new(root_schema: &Value) -> Self {
        let base = default_base_uri();
        let root_uri = schema_id(root_schema)
            .and_then(|id| base.join(id).ok())
            .unwrap_or(base);
        let mut docs = HashMap::new();
        docs.insert(
            without_fragment(&root_uri).to_string(),
            root_schema.clone(),
        );
        SchemaStore { docs, root_uri }
    }

    /// Deposit a schema document. `uri` defaults to the schema's `id`/`$id`.
    pub fn insert(&mut self, schema: Value, uri: Option<&str>) -> Result<Url, MergeError> {
        let id = match uri.or_else(|| schema_id(&schema)) {
            Some(id) => id.to_string(),
            None => {
                return Err(MergeError::Schema(ErrorDetail::new(
                    "Cached schema has no 'id' or '$id' and no URI was given",
                )))
            }
        };
        let url = default_base_uri().join(&id).map_err(|e| {
            MergeError::Schema(ErrorDetail::new(format!("Invalid schema URI '{}': {}", id, e)))
        })?;
        self.docs.insert(without_fragment(&url).to_string(), schema);
        Ok(url)
    }

    /// URI of the root schema document.
    pub fn root_uri(&self) -> &Url {
        &self.root_uri
    }

    fn get(&self, url: &Url) -> Option<&Value> {
        self.docs.get(without_fragment(url).as_str())
    }
}

/// Per-walk reference resolver with a base-URI scope stack.
///
/// Every walker descent pushes the scope of the schema node being entered and
/// pops it on the way out, so relative `$ref`s resolve in the correct base
/// URI. A resolver belongs to exactly one walk; it is not shared.
#[derive(Debug)]
pub struct RefResolver<'a> {
    store: &'a SchemaStore,
    scopes: Vec<Url>,
}

impl<'a> RefResolver<'a> {
    pub(crate) fn new(store: &'a SchemaStore) -> Self {
        RefResolver {
            store,
            scopes: vec![store.root_uri().clone()],
        }
    }

    /// Push the scope reached by joining `reference` onto the current scope.
    ///
    /// An unparseable reference re-pushes the current scope so that the stack
    /// stays balanced with the matching [`pop_scope`](Self::pop_scope).
    pub(crate) fn push_scope(&mut self, reference: &str) {
        let top = self.scope().clone();
        self.scopes.push(top.join(reference).unwrap_or(top));
    }

    pub(crate) fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "scope stack underflow");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// The innermost resolution scope.
    pub(crate) fn scope(&self) -> &Url {
        self.scopes.last().expect("scope stack is never empty")
    }

    /// Whether `reference` points outside the root schema document.
    pub(crate) fn is_remote(&self, reference: &str) -> bool {
        match self.scope().join(reference) {
            Ok(url) => without_fragment(&url) != without_fragment(self.store.root_uri()),
            // Unparseable references are not resolvable locally either way.
            Err(_) => true,
        }
    }

    /// Resolve `reference` against the current scope.
    ///
    /// Returns the absolute URL it resolved to and a copy of the node found
    /// there. Fails when the target document is not in the store or the
    /// fragment does not resolve within it.
    pub(crate) fn resolve(&self, reference: &str) -> Result<(Url, Value), MergeError> {
        let url = self.scope().join(reference).map_err(|e| {
            MergeError::Schema(
                ErrorDetail::new(format!("Invalid reference '{}': {}", reference, e)),
            )
        })?;
        let unresolvable = || {
            MergeError::Schema(
                ErrorDetail::new(format!("Unresolvable reference '{}'", reference)),
            )
        };
        let doc = self.store.get(&url).ok_or_else(unresolvable)?;
        let node = pointer::resolve_fragment(doc, url.fragment().unwrap_or(""))
            .ok_or_else(unresolvable)?;
        Ok((url, node.clone()))
    }
}
