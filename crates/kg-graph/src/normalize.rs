//! Canonical attribute shapes shared by every backend.
//!
//! Nodes: a non-empty bag without `sources` becomes `{sources: [bag]}`.
//! Edges: `relation` is always present (falling back to the legacy `edge` key),
//! `sources` is always a list, and each entry mirrors `relation` and `edge`.

use kg_types::{Attrs, LEGACY_RELATION_KEY, RELATION_KEY, SOURCES_KEY};
use serde_json::Value;

/// Shallow merge: keys present in `patch` overwrite those in `base`.
pub fn merge_attrs(base: &mut Attrs, patch: Attrs) {
    for (key, value) in patch {
        base.insert(key, value);
    }
}

/// Update patch for an existing edge: a legacy `edge` label moves to
/// `relation` so it overwrites the stored label. An explicit `relation` wins.
pub fn edge_patch(mut patch: Attrs) -> Attrs {
    if let Some(legacy) = patch
        .remove(LEGACY_RELATION_KEY)
        .filter(|value| !value.is_null())
    {
        patch.entry(RELATION_KEY.to_string()).or_insert(legacy);
    }
    patch
}

pub fn canonical_node_attrs(attrs: Attrs) -> Attrs {
    if attrs.is_empty() || attrs.contains_key(SOURCES_KEY) {
        return attrs;
    }
    let mut canonical = Attrs::new();
    canonical.insert(
        SOURCES_KEY.to_string(),
        Value::Array(vec![Value::Object(attrs)]),
    );
    canonical
}

pub fn canonical_edge_attrs(mut attrs: Attrs) -> Attrs {
    let legacy = attrs.remove(LEGACY_RELATION_KEY).and_then(label);
    let relation = attrs
        .remove(RELATION_KEY)
        .and_then(label)
        .or(legacy)
        .unwrap_or_default();

    let sources = match attrs.remove(SOURCES_KEY) {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| mirror_relation(item, &relation))
            .collect(),
        Some(other) => vec![mirror_relation(other, &relation)],
        None if attrs.is_empty() && relation.is_empty() => Vec::new(),
        None => {
            let mut entry = std::mem::take(&mut attrs);
            entry.insert(RELATION_KEY.to_string(), Value::String(relation.clone()));
            entry.insert(
                LEGACY_RELATION_KEY.to_string(),
                Value::String(relation.clone()),
            );
            vec![Value::Object(entry)]
        }
    };

    attrs.insert(RELATION_KEY.to_string(), Value::String(relation));
    attrs.insert(SOURCES_KEY.to_string(), Value::Array(sources));
    attrs
}

fn label(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn mirror_relation(item: Value, relation: &str) -> Value {
    let mut entry = match item {
        Value::Object(entry) => entry,
        other => return other,
    };
    let own = entry
        .get(RELATION_KEY)
        .or_else(|| entry.get(LEGACY_RELATION_KEY))
        .cloned()
        .unwrap_or_else(|| Value::String(relation.to_string()));
    entry
        .entry(RELATION_KEY.to_string())
        .or_insert_with(|| own.clone());
    entry.entry(LEGACY_RELATION_KEY.to_string()).or_insert(own);
    Value::Object(entry)
}
