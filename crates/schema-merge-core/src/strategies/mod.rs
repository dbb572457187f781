//! Merge strategies.
//!
//! A strategy is a named pair of operations selected per schema node:
//! [`Strategy::merge`] combines base and head during the instance walk, and
//! [`Strategy::get_schema`] transforms the node during the schema walk into
//! the schema of merged results.
//!
//! Six built-ins are registered by default; user strategies are added (and
//! built-ins overridden) via
//! [`MergerBuilder::strategy`](crate::MergerBuilder::strategy).

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::walk::{WalkInstance, WalkSchema};

mod append;
mod array_merge_by_id;
mod discard;
mod object_merge;
mod overwrite;
mod version;

pub use append::Append;
pub use array_merge_by_id::ArrayMergeById;
pub use discard::Discard;
pub use object_merge::ObjectMerge;
pub use overwrite::Overwrite;
pub use version::Version;

/// A merge strategy: one direction for values, one for schemas.
pub trait Strategy: Send + Sync {
    /// Merge `head` into `base` under `schema`.
    ///
    /// `opts` is the node's `mergeOptions` with any per-call options for this
    /// strategy overlaid. Returning the undefined sentinel removes the entry
    /// from the enclosing object.
    fn merge(
        &self,
        walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        schema: &JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError>;

    /// Transform `schema` into the schema describing merged results.
    ///
    /// `schema` arrives as a shallow copy with `mergeStrategy` and
    /// `mergeOptions` already stripped.
    fn get_schema(
        &self,
        walk: &mut WalkSchema<'_>,
        schema: JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError>;
}

pub(crate) fn builtins() -> HashMap<String, Box<dyn Strategy>> {
    let mut registry: HashMap<String, Box<dyn Strategy>> = HashMap::new();
    registry.insert("overwrite".to_string(), Box::new(Overwrite));
    registry.insert("discard".to_string(), Box::new(Discard));
    registry.insert("version".to_string(), Box::new(Version));
    registry.insert("append".to_string(), Box::new(Append));
    registry.insert("arrayMergeById".to_string(), Box::new(ArrayMergeById));
    registry.insert("objectMerge".to_string(), Box::new(ObjectMerge));
    registry
}

// ---------------------------------------------------------------------------
// Option accessors
// ---------------------------------------------------------------------------

fn option_error(key: &str, expected: &str, strategy: &str) -> MergeError {
    MergeError::Schema(
        ErrorDetail::new(format!("'{}' option is not {}", key, expected)).for_strategy(strategy),
    )
}

pub(crate) fn bool_option(
    opts: &Map<String, Value>,
    key: &str,
    default: bool,
    strategy: &str,
) -> Result<bool, MergeError> {
    match opts.get(key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(option_error(key, "a boolean", strategy)),
    }
}

pub(crate) fn usize_option(
    opts: &Map<String, Value>,
    key: &str,
    strategy: &str,
) -> Result<Option<usize>, MergeError> {
    match opts.get(key) {
        None => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) => Ok(Some(n as usize)),
            None => Err(option_error(key, "a non-negative integer", strategy)),
        },
    }
}

pub(crate) fn str_option<'o>(
    opts: &'o Map<String, Value>,
    key: &str,
    strategy: &str,
) -> Result<Option<&'o str>, MergeError> {
    match opts.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(option_error(key, "a string", strategy)),
    }
}

pub(crate) fn object_option<'o>(
    opts: &'o Map<String, Value>,
    key: &str,
    strategy: &str,
) -> Result<Option<&'o Map<String, Value>>, MergeError> {
    match opts.get(key) {
        None => Ok(None),
        Some(Value::Object(m)) => Ok(Some(m)),
        Some(_) => Err(option_error(key, "an object", strategy)),
    }
}
