//! The `discard` strategy: the head is ignored once a base value exists.

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::jsonvalue::JsonValue;
use crate::strategies::{bool_option, Strategy};
use crate::walk::{WalkInstance, WalkSchema};

const NAME: &str = "discard";

/// Keeps the base. With no base the result is undefined (the key is dropped
/// from the enclosing object), unless the `keepIfUndef` option admits the
/// first head as the permanent value.
pub struct Discard;

impl Strategy for Discard {
    fn merge(
        &self,
        _walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        _schema: &JsonValue,
        opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        if !base.is_undef() {
            return Ok(base);
        }
        if bool_option(opts, "keepIfUndef", false, NAME)? {
            Ok(head)
        } else {
            Ok(JsonValue::undefined(base.reference()))
        }
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
