//! Addressable JSON nodes.
//!
//! [`JsonValue`] pairs a JSON node with the RFC 6901 pointer at which it was
//! found, and adds an *undefined* state distinct from JSON `null`: a missing
//! object key is undefined, a key explicitly set to `null` is not. Merge
//! strategies use the distinction to tell "no base yet" from "base is null",
//! and the pointer to report where in the document an error occurred.

use serde_json::{Map, Value};

use crate::pointer;

/// A JSON node addressed by a JSON Pointer rooted at `#`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue {
    val: Option<Value>,
    reference: String,
}

impl JsonValue {
    /// Wrap a value found at `reference`.
    pub fn new(val: Value, reference: impl Into<String>) -> Self {
        JsonValue {
            val: Some(val),
            reference: reference.into(),
        }
    }

    /// The undefined sentinel at `reference`.
    pub fn undefined(reference: impl Into<String>) -> Self {
        JsonValue {
            val: None,
            reference: reference.into(),
        }
    }

    pub fn is_undef(&self) -> bool {
        self.val.is_none()
    }

    /// The wrapped value, or `None` when undefined.
    pub fn val(&self) -> Option<&Value> {
        self.val.as_ref()
    }

    pub fn into_val(self) -> Option<Value> {
        self.val
    }

    /// The JSON Pointer this node was found at.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.val.as_ref().and_then(Value::as_object)
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        self.val.as_ref().and_then(Value::as_array)
    }

    /// Pointer of the child at `key`, with RFC 6901 escaping applied.
    pub fn child_reference(&self, key: &str) -> String {
        pointer::build_path(&self.reference, &[key])
    }

    /// Wrap `val` as the child of this node at `key`.
    pub fn subval(&self, key: &str, val: Value) -> JsonValue {
        JsonValue::new(val, self.child_reference(key))
    }

    /// Look up an object key.
    ///
    /// Returns the undefined sentinel (still carrying the child pointer) when
    /// this node is undefined, not an object, or has no such key.
    pub fn get(&self, key: &str) -> JsonValue {
        match self.as_object().and_then(|map| map.get(key)) {
            Some(v) => self.subval(key, v.clone()),
            None => JsonValue::undefined(self.child_reference(key)),
        }
    }
}
