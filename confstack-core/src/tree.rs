//! Raw value trees produced by loaders.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::resolve::merge::merge_into;

pub type RawTree = Map<String, Value>;

/// Value stored at `path`, treating `null` as absent.
pub fn value_at_path<'a>(tree: &'a RawTree, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = tree.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

/// Places `value` at `path`, creating intermediate objects and merging with
/// whatever an earlier insert left there.
pub fn insert_at_path(tree: &mut RawTree, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(RawTree::new()));
        if !entry.is_object() {
            *entry = Value::Object(RawTree::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }

    let mut overlay = RawTree::new();
    overlay.insert(last.clone(), value);
    merge_into(current, overlay);
}

/// Parses JSON, falling back to JSON5 (comments, trailing commas, unquoted
/// keys). When both fail the strict JSON error is reported.
pub fn parse_text(text: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(strict_error) => {
            json5::from_str::<Value>(text).map_err(|_| Error::Json(strict_error))
        }
    }
}
