//! The merge façade.
//!
//! A [`Merger`] is built once per schema and owns everything a walk needs:
//! the schema itself, the validator, the schema store, the strategy registry
//! and the object-class menu. It is immutable during walks (only
//! [`cache_schema`](Merger::cache_schema) mutates it, between calls), so
//! concurrent `merge`/`get_schema` calls through a shared reference are safe
//! as long as the supplied [`Validator`] is.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::jsonvalue::JsonValue;
use crate::objclass::{ObjClassMenu, ObjectConstructor};
use crate::resolver::SchemaStore;
use crate::strategies::{self, Strategy};
use crate::validator::{SchemaValidator, Validator};
use crate::walk::{WalkInstance, WalkSchema};

/// Merges JSON documents under one annotated schema.
pub struct Merger {
    schema: Value,
    store: SchemaStore,
    validator: Box<dyn Validator>,
    strategies: HashMap<String, Box<dyn Strategy>>,
    objclass_menu: ObjClassMenu,
}

impl Merger {
    /// A merger for `schema` with default strategies, validator and classes.
    pub fn new(schema: Value) -> Result<Self, MergeError> {
        Self::builder(schema).build()
    }

    pub fn builder(schema: Value) -> MergerBuilder {
        MergerBuilder {
            schema,
            strategies: HashMap::new(),
            objclass_def: None,
            objclasses: HashMap::new(),
            validator: None,
        }
    }

    /// The root schema this merger was built with.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Merge `head` into `base`. A `None` or `null` base starts fresh.
    pub fn merge(&self, base: Option<&Value>, head: &Value) -> Result<Value, MergeError> {
        self.merge_with_options(base, head, &Map::new())
    }

    /// Merge with per-call options, keyed by strategy name. Entries overlay
    /// the schema-level `mergeOptions` of every node that strategy handles,
    /// e.g. `{"version": {"metadata": {"updatedBy": "import"}}}`.
    pub fn merge_with_options(
        &self,
        base: Option<&Value>,
        head: &Value,
        merge_options: &Map<String, Value>,
    ) -> Result<Value, MergeError> {
        let base = match base {
            Some(v) if !v.is_null() => JsonValue::new(v.clone(), "#"),
            _ => JsonValue::undefined("#"),
        };
        let head = JsonValue::new(head.clone(), "#");
        let schema = JsonValue::new(self.schema.clone(), "#");

        let mut walk = WalkInstance::new(self, merge_options.clone());
        let merged = walk.descend(schema, base, head)?;
        // An undefined result (e.g. a root `discard` with no base) is null.
        Ok(merged.into_val().unwrap_or(Value::Null))
    }

    /// The JSON Schema describing the shape of merged results.
    pub fn get_schema(&self) -> Result<Value, MergeError> {
        self.get_schema_with_options(&Map::new())
    }

    /// Like [`get_schema`](Self::get_schema), with per-call options keyed by
    /// strategy name (e.g. a `metadataSchema` for `version`). `$ref`s inside
    /// option subschemas resolve against this merger's schema.
    pub fn get_schema_with_options(
        &self,
        merge_options: &Map<String, Value>,
    ) -> Result<Value, MergeError> {
        let mut walk = WalkSchema::new(self, merge_options.clone());
        let root = JsonValue::new(self.schema.clone(), "#");
        let result = walk.descend(root)?;
        Ok(walk.finish(result))
    }

    /// Deposit a schema document for `$ref` resolution. `uri` defaults to
    /// the schema's `id`/`$id`.
    pub fn cache_schema(&mut self, schema: Value, uri: Option<&str>) -> Result<(), MergeError> {
        let url = self.store.insert(schema, uri)?;
        tracing::debug!(uri = %url, "cached schema");
        Ok(())
    }

    /// The validator the walks consult.
    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    /// Look up an object-class constructor (`_default` resolves through the
    /// configured default).
    pub fn objclass(&self, name: &str) -> Option<&ObjectConstructor> {
        self.objclass_menu.constructor(name)
    }

    pub(crate) fn strategy(&self, name: &str) -> Option<&dyn Strategy> {
        self.strategies.get(name).map(Box::as_ref)
    }

    pub(crate) fn store(&self) -> &SchemaStore {
        &self.store
    }
}

/// Construction options for [`Merger`].
pub struct MergerBuilder {
    schema: Value,
    strategies: HashMap<String, Box<dyn Strategy>>,
    objclass_def: Option<String>,
    objclasses: HashMap<String, ObjectConstructor>,
    validator: Option<Box<dyn Validator>>,
}

impl MergerBuilder {
    /// Register a strategy under `name`, overriding a built-in of the same
    /// name.
    pub fn strategy(mut self, name: impl Into<String>, strategy: Box<dyn Strategy>) -> Self {
        self.strategies.insert(name.into(), strategy);
        self
    }

    /// The object class `_default` resolves to (initially `dict`).
    pub fn objclass_def(mut self, name: impl Into<String>) -> Self {
        self.objclass_def = Some(name.into());
        self
    }

    /// Register an object-class constructor under `name`.
    pub fn objclass(mut self, name: impl Into<String>, constructor: ObjectConstructor) -> Self {
        self.objclasses.insert(name.into(), constructor);
        self
    }

    /// Replace the default draft-4 [`SchemaValidator`], e.g. to select a
    /// different JSON Schema draft.
    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<Merger, MergeError> {
        let store = SchemaStore::new(&self.schema);
        let validator: Box<dyn Validator> = match self.validator {
            Some(v) => v,
            None => Box::new(SchemaValidator::new(self.schema.clone())),
        };
        let mut registry = strategies::builtins();
        registry.extend(self.strategies);
        let objclass_menu = ObjClassMenu::build(self.objclass_def.as_deref(), self.objclasses)?;
        Ok(Merger {
            schema: self.schema,
            store,
            validator,
            strategies: registry,
            objclass_menu,
        })
    }
}
