//! Output object construction for `objectMerge`.
//!
//! A merged object is materialized through a named constructor chosen by the
//! `objClass` merge option. The menu ships with:
//!
//! - `dict` / `ordered`: insertion-ordered maps (base order, then new head
//!   keys in head order); the crate default,
//! - `sorted`: keys sorted lexicographically, independent of insertion,
//!
//! and accepts user registrations via
//! [`MergerBuilder::objclass`](crate::MergerBuilder::objclass). `_default`
//! resolves to the class named by
//! [`MergerBuilder::objclass_def`](crate::MergerBuilder::objclass_def).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, MergeError};

/// Builds the output map for one merged object from its final entry list.
pub type ObjectConstructor = Arc<dyn Fn(Vec<(String, Value)>) -> Map<String, Value> + Send + Sync>;

const DEFAULT_CLASS: &str = "dict";

fn insertion_ordered(entries: Vec<(String, Value)>) -> Map<String, Value> {
    entries.into_iter().collect()
}

fn key_sorted(mut entries: Vec<(String, Value)>) -> Map<String, Value> {
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries.into_iter().collect()
}

/// Named registry of [`ObjectConstructor`]s.
pub struct ObjClassMenu {
    classes: HashMap<String, ObjectConstructor>,
    default_class: String,
}

impl ObjClassMenu {
    /// Build the menu from built-ins plus user entries (user wins on name
    /// collision). Fails if `default_class` names an unknown class.
    pub(crate) fn build(
        default_class: Option<&str>,
        extra: HashMap<String, ObjectConstructor>,
    ) -> Result<Self, MergeError> {
        let mut classes: HashMap<String, ObjectConstructor> = HashMap::new();
        classes.insert("dict".to_string(), Arc::new(insertion_ordered));
        classes.insert("ordered".to_string(), Arc::new(insertion_ordered));
        classes.insert("sorted".to_string(), Arc::new(key_sorted));
        classes.extend(extra);

        let default_class = default_class.unwrap_or(DEFAULT_CLASS).to_string();
        if !classes.contains_key(&default_class) {
            return Err(MergeError::Schema(ErrorDetail::new(format!(
                "Unknown object class '{}' for '_default'",
                default_class
            ))));
        }
        Ok(ObjClassMenu {
            classes,
            default_class,
        })
    }

    /// Look up a constructor; `_default` resolves through the configured
    /// default class.
    pub fn constructor(&self, name: &str) -> Option<&ObjectConstructor> {
        let name = if name == "_default" {
            &self.default_class
        } else {
            name
        };
        self.classes.get(name)
    }
}
