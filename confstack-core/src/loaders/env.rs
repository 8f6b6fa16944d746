use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::loaders::{LoadMode, Loader};
use crate::schema::LogicalKey;
use crate::tree::{insert_at_path, parse_text, RawTree};

pub const IDENTIFIER: &str = "env";

/// Reads variables named after each key (`DB_URL` for `db.url`).
///
/// Container keys (`DB`) accept a JSON object holding the whole subtree;
/// leaf keys are stored as raw strings and left to the schema to coerce.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    identifier: String,
    vars: HashMap<String, String>,
}

impl EnvLoader {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self {
            identifier: IDENTIFIER.to_owned(),
            vars,
        }
    }

    /// Snapshot of the process environment; non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self::new(vars)
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn read(&self, keys: &[LogicalKey]) -> Result<Option<RawTree>> {
        let mut tree = RawTree::new();

        for key in keys {
            let Some(raw) = self.vars.get(&key.key) else {
                continue;
            };

            let value = if key.is_container {
                match parse_text(raw) {
                    Ok(Value::Object(subtree)) => Value::Object(subtree),
                    Ok(_) | Err(_) => {
                        return Err(Error::Source(format!(
                            "environment variable {} must hold a JSON object for '{}'",
                            key.key,
                            key.dotted_path()
                        )))
                    }
                }
            } else {
                Value::String(raw.clone())
            };

            insert_at_path(&mut tree, &key.path, value);
        }

        tracing::debug!(loader = %self.identifier, matched = tree.len(), "read environment");
        Ok((!tree.is_empty()).then_some(tree))
    }
}

#[async_trait]
impl Loader for EnvLoader {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mode(&self) -> LoadMode {
        LoadMode::Immediate
    }

    async fn load(&self, keys: &[LogicalKey]) -> Result<Option<RawTree>> {
        self.read(keys)
    }
}
