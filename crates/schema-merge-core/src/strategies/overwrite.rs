//! The `overwrite` strategy: the head replaces the base.

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::jsonvalue::JsonValue;
use crate::strategies::Strategy;
use crate::walk::{WalkInstance, WalkSchema};

/// Returns head unconditionally; the schema is returned unchanged.
///
/// This is the default strategy for non-object heads.
pub struct Overwrite;

impl Strategy for Overwrite {
    fn merge(
        &self,
        _walk: &mut WalkInstance<'_>,
        _base: JsonValue,
        head: JsonValue,
        _schema: &JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        Ok(head)
    }

    fn get_schema(
        &self,
        _walk: &mut WalkSchema<'_>,
        schema: JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        Ok(schema)
    }
}
