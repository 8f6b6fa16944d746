pub mod env;
pub mod json_file;
pub mod orchestrator;
pub mod secrets;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::LogicalKey;
use crate::tree::RawTree;

pub use env::EnvLoader;
pub use json_file::JsonFileLoader;
pub use orchestrator::{LoadOutcome, LoaderFailure};
pub use secrets::{SecretStore, SecretStoreLoader, StaticSecretStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// `load` completes without ever suspending. Any I/O it does (small
    /// config files, the environment) blocks the calling task, including when
    /// it runs alongside deferred loaders.
    Immediate,
    /// `load` may suspend (network, timers, blocking pools).
    Deferred,
}

#[async_trait]
pub trait Loader: Send + Sync {
    /// Stable name used for provenance and error attribution.
    fn identifier(&self) -> &str;

    fn mode(&self) -> LoadMode {
        LoadMode::Deferred
    }

    /// `Ok(None)` means the source has nothing to contribute; it is not an
    /// error. Keys the source does not know are simply left out of the tree.
    async fn load(&self, keys: &[LogicalKey]) -> Result<Option<RawTree>>;
}

/// Fixed tree, typically a defaults layer.
#[derive(Debug, Clone)]
pub struct StaticLoader {
    identifier: String,
    tree: RawTree,
    mode: LoadMode,
}

impl StaticLoader {
    pub fn new(identifier: impl Into<String>, tree: RawTree) -> Self {
        Self {
            identifier: identifier.into(),
            tree,
            mode: LoadMode::Immediate,
        }
    }

    pub fn from_value(identifier: impl Into<String>, value: Value) -> Result<Self> {
        let identifier = identifier.into();
        match value {
            Value::Object(tree) => Ok(Self::new(identifier, tree)),
            other => Err(Error::Config(format!(
                "static source '{identifier}' must be an object, got {}",
                crate::schema::value_kind(&other)
            ))),
        }
    }

    /// Reports the loader as deferred so it is scheduled concurrently.
    pub fn deferred(mut self) -> Self {
        self.mode = LoadMode::Deferred;
        self
    }
}

#[async_trait]
impl Loader for StaticLoader {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mode(&self) -> LoadMode {
        self.mode
    }

    async fn load(&self, _keys: &[LogicalKey]) -> Result<Option<RawTree>> {
        Ok(Some(self.tree.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{LoadMode, Loader, StaticLoader};

    #[tokio::test]
    async fn static_loader_returns_its_tree() {
        let loader = StaticLoader::from_value("defaults", json!({"port": 8080}))
            .expect("object is accepted");

        assert_eq!(loader.mode(), LoadMode::Immediate);
        assert_eq!(loader.deferred().mode(), LoadMode::Deferred);

        let loader = StaticLoader::from_value("defaults", json!({"port": 8080}))
            .expect("object is accepted");
        let tree = loader.load(&[]).await.expect("load succeeds");
        assert_eq!(tree, json!({"port": 8080}).as_object().cloned());
    }

    #[test]
    fn static_loader_rejects_non_objects() {
        let error = StaticLoader::from_value("defaults", json!([1, 2]))
            .expect_err("array must be rejected");
        assert!(error.to_string().contains("must be an object, got array"));
    }
}
