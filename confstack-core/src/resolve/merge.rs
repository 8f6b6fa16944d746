//! Deep merge of loader output.
//!
//! Later trees take precedence over earlier ones. Objects merge recursively,
//! arrays concatenate, and `null` means "not specified": it never erases a
//! value an earlier tree supplied.

use serde_json::Value;

use crate::tree::RawTree;

/// Folds `trees` left to right into one tree.
pub fn merge(trees: impl IntoIterator<Item = RawTree>) -> RawTree {
    trees.into_iter().fold(RawTree::new(), |mut merged, tree| {
        merge_into(&mut merged, tree);
        merged
    })
}

/// Merges `overlay` into `base` in place, `overlay` winning on conflicts.
pub fn merge_into(base: &mut RawTree, overlay: RawTree) {
    for (key, incoming) in overlay {
        if incoming.is_null() {
            continue;
        }

        let incoming = match (base.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
                continue;
            }
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                existing.extend(incoming);
                continue;
            }
            (_, incoming) => incoming,
        };
        base.insert(key, prune_nulls(incoming));
    }
}

fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, prune_nulls(value)))
                .collect(),
        ),
        other => other,
    }
}
