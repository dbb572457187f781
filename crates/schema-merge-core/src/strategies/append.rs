//! The `append` strategy: array concatenation.

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, MergeError};
use crate::jsonvalue::JsonValue;
use crate::strategies::Strategy;
use crate::walk::{WalkInstance, WalkSchema};

const NAME: &str = "append";

/// The result is a fresh array of base's items followed by head's items.
pub struct Append;

impl Strategy for Append {
    fn merge(
        &self,
        _walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        _schema: &JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let Some(head_items) = head.as_array() else {
            return Err(MergeError::HeadInstance(
                ErrorDetail::new("Head is not an array")
                    .at(head.reference())
                    .for_strategy(NAME),
            ));
        };
        let mut result = match base.val() {
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
        result.extend(head_items.iter().cloned());
        Ok(JsonValue::new(Value::Array(result), base.reference()))
    }

    /// Appending can exceed `maxItems` and duplicate entries, so both bounds
    /// are removed from the result schema.
    fn get_schema(
        &self,
        _walk: &mut WalkSchema<'_>,
        schema: JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let mut copy = match schema.as_object() {
            Some(obj) => obj.clone(),
            None => return Ok(schema),
        };
        copy.shift_remove("maxItems");
        copy.shift_remove("uniqueItems");
        Ok(JsonValue::new(Value::Object(copy), schema.reference()))
    }
}
