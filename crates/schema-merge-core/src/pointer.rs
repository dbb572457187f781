//! JSON Pointer (RFC 6901) conventions used throughout the crate.
//!
//! Every [`JsonValue`](crate::JsonValue) carries a pointer string rooted at
//! `#`; children extend it with `/`. Property keys containing `/` or `~` are
//! escaped (`~` → `~0`, `/` → `~1`) when extending, so a pointer can always
//! be resolved back against the original document.

use std::borrow::Cow;

use serde_json::Value;

/// Escape a single path segment per RFC 6901.
///
/// - `~` → `~0`
/// - `/` → `~1`
///
/// Returns `Cow::Borrowed` when no escaping is needed (the common case).
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Unescape a single path segment per RFC 6901.
///
/// - `~1` → `/`
/// - `~0` → `~`
///
/// Order matters: unescape `~1` first to avoid double-unescaping.
pub fn unescape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains("~0") || segment.contains("~1") {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Build a JSON Pointer by appending segments to a parent pointer.
///
/// Each segment is escaped per RFC 6901 before joining.
///
/// # Example
/// ```
/// use schema_merge_core::pointer::build_path;
/// assert_eq!(build_path("#", &["properties", "a/b"]), "#/properties/a~1b");
/// ```
pub fn build_path(parent: &str, segments: &[&str]) -> String {
    let mut path = parent.to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&escape_segment(segment));
    }
    path
}

/// Split a JSON Pointer into decoded segments.
///
/// Strips the leading `#` fragment identifier (if present), splits on `/`,
/// and unescapes each segment per RFC 6901.
///
/// # Example
/// ```
/// use schema_merge_core::pointer::split_path;
/// assert_eq!(split_path("#/properties/a~1b"), vec!["properties", "a/b"]);
/// assert_eq!(split_path("#"), Vec::<String>::new());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    let stripped = path.strip_prefix('#').unwrap_or(path);

    // An empty fragment ("#" or "") refers to the whole document.
    if stripped.is_empty() {
        return Vec::new();
    }

    let mut segments = stripped.split('/');

    // A leading "/" produces an initial empty segment from split('/') that
    // represents the root, so skip it. Subsequent empty segments are
    // significant per RFC 6901 ("#/" → [""] is the empty-string key).
    if stripped.starts_with('/') {
        segments.next();
    }

    segments.map(|s| unescape_segment(s).into_owned()).collect()
}

/// Resolve a pointer fragment against a document node.
///
/// Accepts `#/a/b`, `/a/b` and the relaxed `a/b` form used by
/// `arrayMergeById`'s `idRef` option. Array segments must parse as indices.
/// Returns `None` when any segment fails to resolve.
pub fn resolve_fragment<'a>(doc: &'a Value, fragment: &str) -> Option<&'a Value> {
    let mut node = doc;
    for segment in split_path(fragment) {
        node = match node {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

// ===========================================================================
// Tests
// ===========================================================================
