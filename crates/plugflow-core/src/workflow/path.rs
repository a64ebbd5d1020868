//! Dot-path addressing into JSON values (`variables.user.name`, `items.0`).

use serde_json::Value;

use crate::models::JsonMap;

/// Walk `path` through objects (by key) and arrays (by numeric index).
///
/// An empty path returns the root.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Store `value` at `path` inside `target`, creating intermediate objects.
///
/// A non-object value sitting on an intermediate segment is replaced.
pub fn assign(target: &mut JsonMap, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        if !slot.is_object() {
            *slot = Value::Object(JsonMap::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
}
