//! Merge a sequence of JSON documents, driven by annotations in a JSON
//! Schema.
//!
//! A schema node may carry `mergeStrategy` (and `mergeOptions`) describing
//! how values at that node combine when a *head* document is folded into the
//! evolving *base*. A [`Merger`] walks schema, base and head in lock-step
//! (following `$ref` and dispatching through `oneOf` on the way) and applies
//! the selected strategy at every node. The same annotations also determine
//! the schema of merged results, via [`Merger::get_schema`].
//!
//! Built-in strategies: `overwrite`, `discard`, `version`, `append`,
//! `arrayMergeById`, `objectMerge`. Nodes without an annotation default to
//! `objectMerge` for objects and `overwrite` for everything else.
//!
//! ```
//! use serde_json::json;
//! use schema_merge_core::Merger;
//!
//! let schema = json!({
//!     "properties": {
//!         "name": { "mergeStrategy": "version" },
//!         "tags": { "mergeStrategy": "append" }
//!     }
//! });
//! let merger = Merger::new(schema)?;
//!
//! let base = merger.merge(None, &json!({"name": "alice", "tags": ["a"]}))?;
//! let base = merger.merge(Some(&base), &json!({"name": "bob", "tags": ["b"]}))?;
//!
//! assert_eq!(base, json!({
//!     "name": [{"value": "alice"}, {"value": "bob"}],
//!     "tags": ["a", "b"]
//! }));
//! # Ok::<(), schema_merge_core::MergeError>(())
//! ```
//!
//! Custom strategies implement [`Strategy`] and register through
//! [`Merger::builder`]; instance validation (used by `oneOf` dispatch) goes
//! through the [`Validator`] trait, with a draft-4 [`SchemaValidator`]
//! supplied by default.

mod descend;
mod error;
mod jsonvalue;
mod merger;
mod objclass;
pub mod pointer;
mod resolver;
pub mod strategies;
mod validator;
mod walk;

pub use error::{ErrorDetail, MergeError};
pub use jsonvalue::JsonValue;
pub use merger::{Merger, MergerBuilder};
pub use objclass::{ObjClassMenu, ObjectConstructor};
pub use strategies::Strategy;
pub use validator::{SchemaValidator, ValidationIssue, Validator};
pub use walk::{WalkInstance, WalkSchema};

use serde_json::Value;

/// One-shot merge of `head` into `base` under `schema`.
///
/// Builds a throwaway [`Merger`]; prefer constructing one explicitly when
/// merging a sequence of documents against the same schema.
pub fn merge(base: Option<&Value>, head: &Value, schema: &Value) -> Result<Value, MergeError> {
    Merger::new(schema.clone())?.merge(base, head)
}
