//! Integration tests for the instance walk, merging documents through the
//! public API only.

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use schema_merge_core::{merge, JsonValue, MergeError, Merger, Strategy, WalkInstance, WalkSchema};

fn merge_all(schema: Value, heads: &[Value]) -> Value {
    let merger = Merger::new(schema).expect("merger should build");
    let mut base: Option<Value> = None;
    for head in heads {
        base = Some(
            merger
                .merge(base.as_ref(), head)
                .expect("merge should succeed"),
        );
    }
    base.expect("at least one head")
}

fn merge_err(schema: Value, base: Option<Value>, head: Value) -> MergeError {
    Merger::new(schema)
        .expect("merger should build")
        .merge(base.as_ref(), &head)
        .expect_err("merge should fail")
}

// ── Defaults ────────────────────────────────────────────────────────────────

#[test]
fn test_default_overwrites_scalars() {
    assert_eq!(merge_all(json!({}), &[json!("a"), json!("b")]), json!("b"));
}

#[test]
fn test_default_merges_objects() {
    assert_eq!(
        merge_all(json!({}), &[json!({"a": "a"}), json!({"b": "b"})]),
        json!({"a": "a", "b": "b"})
    );
}

#[test]
fn test_default_merges_nested_objects() {
    assert_eq!(
        merge_all(
            json!({}),
            &[json!({"a": {"x": 1}}), json!({"a": {"y": 2}, "b": 3})]
        ),
        json!({"a": {"x": 1, "y": 2}, "b": 3})
    );
}

#[test]
fn test_merge_identity_from_null_base() {
    let value = json!({"a": {"b": [1, 2]}, "c": null});
    assert_eq!(merge(None, &value, &json!({})).unwrap(), value);
}

#[test]
fn test_null_base_is_undefined() {
    let merger = Merger::new(json!({})).unwrap();
    assert_eq!(
        merger.merge(Some(&Value::Null), &json!({"a": 1})).unwrap(),
        json!({"a": 1})
    );
}

// ── overwrite ───────────────────────────────────────────────────────────────

#[test]
fn test_overwrite() {
    let schema = json!({"mergeStrategy": "overwrite"});
    assert_eq!(merge_all(schema, &[json!("a"), json!("b")]), json!("b"));
}

#[test]
fn test_overwrite_is_idempotent() {
    let schema = json!({"mergeStrategy": "overwrite"});
    let merger = Merger::new(schema).unwrap();
    let b = json!({"x": [1]});
    let once = merger.merge(Some(&json!("a")), &b).unwrap();
    let twice = merger.merge(Some(&once), &b).unwrap();
    assert_eq!(twice, b);
}

// ── discard ─────────────────────────────────────────────────────────────────

#[test]
fn test_discard_drops_new_keys() {
    let schema = json!({"properties": {"a": {"mergeStrategy": "discard"}}});
    assert_eq!(merge_all(schema, &[json!({}), json!({"a": 1})]), json!({}));
}

#[test]
fn test_discard_keeps_base() {
    let schema = json!({"properties": {"a": {"mergeStrategy": "discard"}}});
    assert_eq!(
        merge_all(schema, &[json!({"a": 1}), json!({"a": 2})]),
        json!({"a": 1})
    );
}

#[test]
fn test_discard_keep_if_undef() {
    let schema = json!({
        "properties": {
            "a": {"mergeStrategy": "discard", "mergeOptions": {"keepIfUndef": true}}
        }
    });
    assert_eq!(
        merge_all(schema, &[json!({}), json!({"a": 1}), json!({"a": 2})]),
        json!({"a": 1})
    );
}

#[test]
fn test_discard_at_root_yields_null() {
    let merger = Merger::new(json!({"mergeStrategy": "discard"})).unwrap();
    assert_eq!(merger.merge(None, &json!("x")).unwrap(), Value::Null);
}

// ── version ─────────────────────────────────────────────────────────────────

#[test]
fn test_version_accumulates_history() {
    let schema = json!({"mergeStrategy": "version"});
    assert_eq!(
        merge_all(schema, &[json!("a"), json!("b")]),
        json!([{"value": "a"}, {"value": "b"}])
    );
}

#[test]
fn test_version_ignores_consecutive_duplicates() {
    let schema = json!({"mergeStrategy": "version"});
    assert_eq!(
        merge_all(schema, &[json!("a"), json!("b"), json!("b")]),
        json!([{"value": "a"}, {"value": "b"}])
    );
}

#[test]
fn test_version_ignore_dups_disabled() {
    let schema = json!({
        "mergeStrategy": "version",
        "mergeOptions": {"ignoreDups": false}
    });
    assert_eq!(
        merge_all(schema, &[json!("a"), json!("a")]),
        json!([{"value": "a"}, {"value": "a"}])
    );
}

#[test]
fn test_version_legacy_unique_alias() {
    let schema = json!({
        "mergeStrategy": "version",
        "mergeOptions": {"unique": false}
    });
    assert_eq!(
        merge_all(schema, &[json!("a"), json!("a")]),
        json!([{"value": "a"}, {"value": "a"}])
    );
}

#[test]
fn test_version_limit_truncates() {
    let schema = json!({
        "mergeStrategy": "version",
        "mergeOptions": {"limit": 2}
    });
    assert_eq!(
        merge_all(schema, &[json!("a"), json!("b"), json!("c")]),
        json!([{"value": "b"}, {"value": "c"}])
    );
}

#[test]
fn test_version_metadata_from_call_options() {
    let merger = Merger::new(json!({"mergeStrategy": "version"})).unwrap();
    let mut options = Map::new();
    options.insert("version".to_string(), json!({"metadata": {"by": "import"}}));
    let merged = merger
        .merge_with_options(None, &json!("a"), &options)
        .unwrap();
    assert_eq!(merged, json!([{"by": "import", "value": "a"}]));
}

#[test]
fn test_version_rejects_malformed_base() {
    let schema = json!({"mergeStrategy": "version"});
    let err = merge_err(schema.clone(), Some(json!("not-history")), json!("a"));
    assert!(matches!(err, MergeError::BaseInstance(_)));

    let err = merge_err(schema, Some(json!([{"novalue": 1}])), json!("a"));
    assert!(matches!(err, MergeError::BaseInstance(_)));
}

// ── append ──────────────────────────────────────────────────────────────────

#[test]
fn test_append() {
    let schema = json!({"mergeStrategy": "append"});
    assert_eq!(
        merge_all(schema, &[json!(["a"]), json!(["b"])]),
        json!(["a", "b"])
    );
}

#[test]
fn test_append_concatenation_is_associative() {
    let schema = json!({"mergeStrategy": "append"});
    let merger = Merger::new(schema).unwrap();
    let a = json!([1, 2]);
    let b = json!([3]);
    let first = merger.merge(Some(&json!([])), &a).unwrap();
    let second = merger.merge(Some(&first), &b).unwrap();
    assert_eq!(second, json!([1, 2, 3]));
}

#[test]
fn test_append_rejects_non_array_head() {
    let err = merge_err(json!({"mergeStrategy": "append"}), None, json!("x"));
    assert!(matches!(err, MergeError::HeadInstance(_)));
    assert_eq!(err.strategy(), Some("append"));
}

#[test]
fn test_append_rejects_non_array_base() {
    let err = merge_err(
        json!({"mergeStrategy": "append"}),
        Some(json!("x")),
        json!(["a"]),
    );
    assert!(matches!(err, MergeError::BaseInstance(_)));
}

// ── objectMerge ─────────────────────────────────────────────────────────────

#[test]
fn test_object_merge_per_property_strategies() {
    let schema = json!({
        "mergeStrategy": "objectMerge",
        "properties": {
            "a": {"mergeStrategy": "append"}
        }
    });
    assert_eq!(
        merge_all(
            schema,
            &[json!({"a": ["a"]}), json!({"a": ["b"], "b": "c"})]
        ),
        json!({"a": ["a", "b"], "b": "c"})
    );
}

#[test]
fn test_object_merge_preserves_base_key_order() {
    let merged = merge_all(
        json!({}),
        &[json!({"b": 1, "a": 2}), json!({"a": 3, "c": 4})],
    );
    let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
    assert_eq!(merged, json!({"b": 1, "a": 3, "c": 4}));
}

#[test]
fn test_object_merge_pattern_properties() {
    let schema = json!({
        "patternProperties": {
            "^v_": {"mergeStrategy": "version"}
        }
    });
    assert_eq!(
        merge_all(schema, &[json!({"v_x": 1, "plain": 1}), json!({"v_x": 2, "plain": 2})]),
        json!({"v_x": [{"value": 1}, {"value": 2}], "plain": 2})
    );
}

#[test]
fn test_object_merge_additional_properties_subschema() {
    let schema = json!({
        "properties": {"named": {"mergeStrategy": "overwrite"}},
        "additionalProperties": {"mergeStrategy": "version"}
    });
    assert_eq!(
        merge_all(schema, &[json!({"named": 1, "other": 1}), json!({"named": 2, "other": 2})]),
        json!({"named": 2, "other": [{"value": 1}, {"value": 2}]})
    );
}

#[test]
fn test_object_merge_boolean_additional_properties_ignored() {
    let schema = json!({"additionalProperties": true});
    assert_eq!(
        merge_all(schema, &[json!({"a": 1}), json!({"a": 2})]),
        json!({"a": 2})
    );
}

#[test]
fn test_object_merge_rejects_non_object_head() {
    let err = merge_err(json!({"mergeStrategy": "objectMerge"}), None, json!([1]));
    assert!(matches!(err, MergeError::HeadInstance(_)));
}

#[test]
fn test_object_merge_sorted_class() {
    let schema = json!({
        "mergeStrategy": "objectMerge",
        "mergeOptions": {"objClass": "sorted"}
    });
    let merged = merge_all(schema, &[json!({"b": 1}), json!({"a": 2})]);
    let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn test_object_merge_objclass_def_builder_default() {
    let merger = Merger::builder(json!({}))
        .objclass_def("sorted")
        .build()
        .unwrap();
    let merged = merger.merge(Some(&json!({"b": 1})), &json!({"a": 2})).unwrap();
    let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn test_object_merge_unknown_objclass() {
    let schema = json!({
        "mergeStrategy": "objectMerge",
        "mergeOptions": {"objClass": "nope"}
    });
    let err = merge_err(schema, None, json!({}));
    assert!(matches!(err, MergeError::Schema(_)));
}

#[test]
fn test_escaped_key_in_error_reference() {
    let schema = json!({"properties": {"a/b": {"mergeStrategy": "append"}}});
    let err = merge_err(schema, None, json!({"a/b": 5}));
    assert_eq!(err.reference(), Some("#/a~1b"));
}

// ── The worked example ──────────────────────────────────────────────────────

#[test]
fn test_nested_object_with_version_and_overwrite() {
    let schema = json!({
        "mergeStrategy": "objectMerge",
        "properties": {
            "buyer": {
                "properties": {
                    "id": {
                        "properties": {
                            "name": {"mergeStrategy": "version"}
                        }
                    },
                    "uri": {"mergeStrategy": "overwrite"}
                }
            },
            "award": {"mergeStrategy": "overwrite"}
        }
    });

    let head1 = json!({
        "buyer": {"id": {"name": "Test old"}, "uri": "old"}
    });
    let head2 = json!({
        "buyer": {"id": {"name": "Test new"}, "uri": "new"},
        "award": "Award"
    });

    assert_eq!(
        merge_all(schema, &[head1, head2]),
        json!({
            "buyer": {
                "id": {
                    "name": [{"value": "Test old"}, {"value": "Test new"}]
                },
                "uri": "new"
            },
            "award": "Award"
        })
    );
}

// ── arrayMergeById ──────────────────────────────────────────────────────────

#[test]
fn test_array_merge_by_id() {
    let schema = json!({
        "properties": {
            "awards": {"mergeStrategy": "arrayMergeById"}
        }
    });
    let base = json!({"awards": [{"id": "A", "field": 1}, {"id": "B", "field": 2}]});
    let head = json!({"awards": [{"id": "B", "field": 3}, {"id": "C", "field": 4}]});
    let merger = Merger::new(schema).unwrap();
    assert_eq!(
        merger.merge(Some(&base), &head).unwrap(),
        json!({"awards": [
            {"id": "A", "field": 1},
            {"id": "B", "field": 3},
            {"id": "C", "field": 4}
        ]})
    );
}

#[test]
fn test_array_merge_by_id_descends_with_items_schema() {
    let schema = json!({
        "mergeStrategy": "arrayMergeById",
        "items": {
            "properties": {
                "name": {"mergeStrategy": "version"}
            }
        }
    });
    let merged = merge_all(
        schema,
        &[
            json!([{"id": 1, "name": "a"}]),
            json!([{"id": 1, "name": "b"}]),
        ],
    );
    assert_eq!(
        merged,
        json!([{"id": 1, "name": [{"value": "a"}, {"value": "b"}]}])
    );
}

#[test]
fn test_array_merge_by_id_custom_id_ref() {
    let schema = json!({
        "mergeStrategy": "arrayMergeById",
        "mergeOptions": {"idRef": "/key/id"}
    });
    let merged = merge_all(
        schema,
        &[
            json!([{"key": {"id": 1}, "v": "old"}]),
            json!([{"key": {"id": 1}, "v": "new"}]),
        ],
    );
    assert_eq!(merged, json!([{"key": {"id": 1}, "v": "new"}]));
}

#[test]
fn test_array_merge_by_id_composite_key() {
    let schema = json!({
        "mergeStrategy": "arrayMergeById",
        "mergeOptions": {"idRef": ["/a", "/b"]}
    });
    let merged = merge_all(
        schema,
        &[
            json!([{"a": 1, "b": 1, "v": "x"}, {"a": 1, "b": 2, "v": "y"}]),
            json!([{"a": 1, "b": 2, "v": "z"}]),
        ],
    );
    assert_eq!(
        merged,
        json!([{"a": 1, "b": 1, "v": "x"}, {"a": 1, "b": 2, "v": "z"}])
    );
}

#[test]
fn test_array_merge_by_id_skips_unkeyed_elements() {
    let schema = json!({"mergeStrategy": "arrayMergeById"});
    let merged = merge_all(
        schema,
        &[
            json!([{"id": 1, "v": "base"}]),
            json!([{"no_id": true}, {"id": 1, "v": "head"}]),
        ],
    );
    assert_eq!(merged, json!([{"id": 1, "v": "head"}]));
}

#[test]
fn test_array_merge_by_id_ignore_id() {
    let schema = json!({
        "mergeStrategy": "arrayMergeById",
        "mergeOptions": {"ignoreId": "skip-me"}
    });
    let merged = merge_all(
        schema,
        &[
            json!([]),
            json!([{"id": "skip-me"}, {"id": "keep"}]),
        ],
    );
    assert_eq!(merged, json!([{"id": "keep"}]));
}

#[test]
fn test_array_merge_by_id_duplicate_head_ids() {
    let schema = json!({"mergeStrategy": "arrayMergeById"});
    let err = merge_err(schema, None, json!([{"id": 1}, {"id": 1}]));
    assert!(matches!(err, MergeError::HeadInstance(_)));
}

#[test]
fn test_array_merge_by_id_multiple_base_matches() {
    let schema = json!({"mergeStrategy": "arrayMergeById"});
    let err = merge_err(
        schema,
        Some(json!([{"id": 1}, {"id": 1}])),
        json!([{"id": 1}]),
    );
    assert!(matches!(err, MergeError::BaseInstance(_)));
}

#[test]
fn test_array_merge_by_id_rejects_array_items_schema() {
    let schema = json!({
        "mergeStrategy": "arrayMergeById",
        "items": [{"type": "object"}]
    });
    let err = merge_err(schema, None, json!([{"id": 1}]));
    assert!(matches!(err, MergeError::Schema(_)));
}

// ── oneOf dispatch ──────────────────────────────────────────────────────────

fn one_of_schema() -> Value {
    json!({
        "oneOf": [
            {"type": "array", "mergeStrategy": "append"},
            {"type": "object"}
        ]
    })
}

#[test]
fn test_one_of_selects_array_branch() {
    let merger = Merger::new(one_of_schema()).unwrap();
    let merged = merger.merge(Some(&json!([1])), &json!([2])).unwrap();
    assert_eq!(merged, json!([1, 2]));
}

#[test]
fn test_one_of_selects_object_branch() {
    let merger = Merger::new(one_of_schema()).unwrap();
    let merged = merger.merge(Some(&json!({"a": 1})), &json!({"b": 2})).unwrap();
    assert_eq!(merged, json!({"a": 1, "b": 2}));
}

#[test]
fn test_one_of_mismatched_sides_fail() {
    let merger = Merger::new(one_of_schema()).unwrap();
    let err = merger.merge(Some(&json!([1])), &json!({"b": 2})).unwrap_err();
    assert!(matches!(err, MergeError::HeadInstance(_)));
}

#[test]
fn test_one_of_undefined_base_follows_head() {
    let merger = Merger::new(one_of_schema()).unwrap();
    assert_eq!(merger.merge(None, &json!([2])).unwrap(), json!([2]));
}

#[test]
fn test_one_of_ambiguous_match_fails() {
    let schema = json!({
        "oneOf": [
            {"type": "array"},
            {"maxItems": 5}
        ]
    });
    let merger = Merger::new(schema).unwrap();
    let err = merger.merge(None, &json!([1])).unwrap_err();
    assert!(matches!(err, MergeError::HeadInstance(_)));
}

#[test]
fn test_one_of_explicit_strategy_wins() {
    let schema = json!({
        "mergeStrategy": "overwrite",
        "oneOf": [
            {"type": "array", "mergeStrategy": "append"},
            {"type": "object"}
        ]
    });
    let merger = Merger::new(schema).unwrap();
    assert_eq!(merger.merge(Some(&json!([1])), &json!([2])).unwrap(), json!([2]));
}

#[test]
fn test_one_of_dispatch_through_ref() {
    let schema = json!({
        "oneOf": [
            {"$ref": "#/definitions/list"},
            {"type": "object"}
        ],
        "definitions": {
            "list": {"type": "array", "mergeStrategy": "append"}
        }
    });
    let merger = Merger::new(schema).unwrap();
    assert_eq!(merger.merge(Some(&json!([1])), &json!([2])).unwrap(), json!([1, 2]));
}

// ── anyOf / allOf ───────────────────────────────────────────────────────────

#[test]
fn test_any_of_without_strategy_fails() {
    let schema = json!({"anyOf": [{"type": "array"}]});
    let err = merge_err(schema, None, json!([1]));
    assert!(matches!(err, MergeError::Schema(_)));
}

#[test]
fn test_all_of_with_overwrite_passes_through() {
    let schema = json!({
        "mergeStrategy": "overwrite",
        "allOf": [{"type": "array"}]
    });
    let merger = Merger::new(schema).unwrap();
    assert_eq!(merger.merge(Some(&json!([1])), &json!([2])).unwrap(), json!([2]));
}

#[test]
fn test_all_of_with_other_strategy_fails() {
    let schema = json!({
        "mergeStrategy": "append",
        "allOf": [{"type": "array"}]
    });
    let err = merge_err(schema, None, json!([1]));
    assert!(matches!(err, MergeError::Schema(_)));
}

// ── $ref resolution ─────────────────────────────────────────────────────────

#[test]
fn test_ref_resolves_to_annotated_schema() {
    let schema = json!({
        "properties": {
            "name": {"$ref": "#/definitions/versioned"}
        },
        "definitions": {
            "versioned": {"mergeStrategy": "version"}
        }
    });
    assert_eq!(
        merge_all(schema, &[json!({"name": "a"}), json!({"name": "b"})]),
        json!({"name": [{"value": "a"}, {"value": "b"}]})
    );
}

#[test]
fn test_chained_refs() {
    let schema = json!({
        "properties": {
            "x": {"$ref": "#/definitions/first"}
        },
        "definitions": {
            "first": {"$ref": "#/definitions/second"},
            "second": {"mergeStrategy": "append"}
        }
    });
    assert_eq!(
        merge_all(schema, &[json!({"x": [1]}), json!({"x": [2]})]),
        json!({"x": [1, 2]})
    );
}

#[test]
fn test_ref_into_cached_schema() {
    let schema = json!({
        "properties": {
            "log": {"$ref": "other.json#/definitions/history"}
        }
    });
    let mut merger = Merger::new(schema).unwrap();
    merger
        .cache_schema(
            json!({"definitions": {"history": {"mergeStrategy": "version"}}}),
            Some("other.json"),
        )
        .unwrap();
    let merged = merger.merge(None, &json!({"log": "x"})).unwrap();
    assert_eq!(merged, json!({"log": [{"value": "x"}]}));
}

#[test]
fn test_unresolvable_ref_fails() {
    let schema = json!({"properties": {"a": {"$ref": "#/definitions/missing"}}});
    let err = merge_err(schema, None, json!({"a": 1}));
    assert!(matches!(err, MergeError::Schema(_)));
}

// ── Extension points ────────────────────────────────────────────────────────

/// Keeps whichever side is larger; schemas pass through untouched.
struct TakeGreater;

impl Strategy for TakeGreater {
    fn merge(
        &self,
        _walk: &mut WalkInstance<'_>,
        base: JsonValue,
        head: JsonValue,
        _schema: &JsonValue,
        _opts: &Map<String, Value>,
    ) -> Result<JsonValue, MergeError> {
        let base_n = base.val().and_then(Value::as_f64);
        let head_n = head.val().and_then(Value::as_f64);
        Ok(match (base_n, head_n) {
            (Some(b), Some(h)) if b > h => base,
            _ => head,
        })
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

#[test]
fn test_custom_strategy_registration() {
    let schema = json!({"properties": {"peak": {"mergeStrategy": "takeGreater"}}});
    let merger = Merger::builder(schema)
        .strategy("takeGreater", Box::new(TakeGreater))
        .build()
        .unwrap();
    let base = merger.merge(None, &json!({"peak": 5})).unwrap();
    let base = merger.merge(Some(&base), &json!({"peak": 3})).unwrap();
    assert_eq!(base, json!({"peak": 5}));
}

#[test]
fn test_unknown_strategy_is_schema_error() {
    let err = merge_err(json!({"mergeStrategy": "nope"}), None, json!(1));
    assert!(matches!(err, MergeError::Schema(_)));
    assert!(err.to_string().contains("Unknown merge strategy 'nope'"));
}
