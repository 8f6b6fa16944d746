//! Remote secret stores addressed by logical key name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::loaders::{LoadMode, Loader};
use crate::schema::LogicalKey;
use crate::tree::{insert_at_path, RawTree};

pub const DEFAULT_IDENTIFIER: &str = "secret-store";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    Text(String),
    /// Base64 text as delivered by the store.
    Binary(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub name: String,
    pub value: SecretValue,
}

/// A secret the store could not return; it does not fail the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFetchError {
    pub name: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct SecretBatch {
    pub secrets: Vec<SecretEntry>,
    pub errors: Vec<SecretFetchError>,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// One page of a batch lookup. Names the store does not know are simply
    /// absent from the page.
    async fn batch_get(&self, names: &[String], next_token: Option<String>) -> Result<SecretBatch>;
}

pub type SecretErrorsHook = Arc<dyn Fn(&[SecretFetchError]) + Send + Sync>;

pub struct SecretStoreLoader<S> {
    identifier: String,
    store: S,
    on_errors: Option<SecretErrorsHook>,
}

impl<S: SecretStore> SecretStoreLoader<S> {
    pub fn new(store: S) -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_owned(),
            store,
            on_errors: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn on_errors(mut self, hook: SecretErrorsHook) -> Self {
        self.on_errors = Some(hook);
        self
    }

    async fn fetch_all(&self, names: &[String]) -> Result<(HashMap<String, SecretValue>, Vec<SecretFetchError>)> {
        let mut secrets = HashMap::new();
        let mut errors = Vec::new();
        let mut next_token = None;

        loop {
            let batch = self.store.batch_get(names, next_token.take()).await?;
            errors.extend(batch.errors);
            for secret in batch.secrets {
                secrets.insert(secret.name, secret.value);
            }
            match batch.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok((secrets, errors))
    }
}

#[async_trait]
impl<S: SecretStore> Loader for SecretStoreLoader<S> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mode(&self) -> LoadMode {
        LoadMode::Deferred
    }

    async fn load(&self, keys: &[LogicalKey]) -> Result<Option<RawTree>> {
        let names = keys.iter().map(|key| key.key.clone()).collect::<Vec<_>>();
        let (secrets, errors) = self.fetch_all(&names).await?;

        if !errors.is_empty() {
            tracing::warn!(loader = %self.identifier, count = errors.len(), "secret store reported per-secret errors");
            if let Some(hook) = &self.on_errors {
                hook(&errors);
            }
        }

        let mut tree = RawTree::new();
        for key in keys {
            let Some(secret) = secrets.get(&key.key) else {
                continue;
            };
            let text = decode_secret(secret).map_err(|message| {
                Error::Source(format!("secret '{}' could not be decoded: {message}", key.key))
            })?;
            insert_at_path(&mut tree, &key.path, parse_secret_text(text));
        }

        Ok(Some(tree))
    }
}

fn decode_secret(value: &SecretValue) -> std::result::Result<String, String> {
    match value {
        SecretValue::Text(text) => Ok(text.clone()),
        SecretValue::Binary(encoded) => base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|err| err.to_string()),
        SecretValue::Empty => Ok(String::new()),
    }
}

/// Secrets that look like JSON documents become subtrees; anything else,
/// including malformed JSON, stays a string.
fn parse_secret_text(text: String) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            return parsed;
        }
    }
    Value::String(text)
}

/// In-memory store that pages its answers, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, SecretValue>,
    failures: HashMap<String, SecretFetchError>,
    page_size: Option<usize>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), SecretValue::Text(value.into()));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: SecretValue) -> Self {
        self.secrets.insert(name.into(), value);
        self
    }

    pub fn with_failure(mut self, name: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        self.failures.insert(
            name.clone(),
            SecretFetchError {
                name,
                code: code.into(),
                message: message.into(),
            },
        );
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn batch_get(&self, names: &[String], next_token: Option<String>) -> Result<SecretBatch> {
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::Source(format!("invalid page token '{token}'")))?,
            None => 0,
        };
        let end = match self.page_size {
            Some(size) => (start + size).min(names.len()),
            None => names.len(),
        };

        let mut batch = SecretBatch::default();
        for name in names.get(start..end).unwrap_or_default() {
            if let Some(value) = self.secrets.get(name) {
                batch.secrets.push(SecretEntry {
                    name: name.clone(),
                    value: value.clone(),
                });
            } else if let Some(failure) = self.failures.get(name) {
                batch.errors.push(failure.clone());
            }
        }
        if end < names.len() {
            batch.next_token = Some(end.to_string());
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{
        SecretBatch, SecretFetchError, SecretStore, SecretStoreLoader, SecretValue, StaticSecretStore,
    };
    use crate::error::{Error, Result};
    use crate::loaders::{LoadMode, Loader};
    use crate::schema::LogicalKey;

    fn keys() -> Vec<LogicalKey> {
        vec![
            LogicalKey::container("DB", &["db"]),
            LogicalKey::leaf("DB_URL", &["db", "url"]),
            LogicalKey::leaf("DB_PASSWORD", &["db", "password"]),
            LogicalKey::leaf("PORT", &["port"]),
            LogicalKey::leaf("API_TOKEN", &["api", "token"]),
        ]
    }

    async fn load(loader: &SecretStoreLoader<StaticSecretStore>) -> Value {
        Value::Object(
            loader
                .load(&keys())
                .await
                .expect("load succeeds")
                .expect("secret loaders always return a tree"),
        )
    }

    #[tokio::test]
    async fn follows_pages_until_exhausted() {
        let store = StaticSecretStore::new()
            .with_text("DB_URL", "postgres://secret")
            .with_text("PORT", "5432")
            .with_text("API_TOKEN", "t0ken")
            .with_page_size(2);
        let loader = SecretStoreLoader::new(store);

        assert_eq!(loader.mode(), LoadMode::Deferred);
        assert_eq!(loader.identifier(), "secret-store");
        assert_eq!(
            load(&loader).await,
            json!({
                "db": {"url": "postgres://secret"},
                "port": "5432",
                "api": {"token": "t0ken"}
            })
        );
    }

    #[tokio::test]
    async fn decodes_binary_and_json_secrets() {
        let store = StaticSecretStore::new()
            .with_text("DB", r#"{"url": "postgres://blob", "pool": 4}"#)
            .with_value("DB_PASSWORD", SecretValue::Binary("aHVudGVyMg==".to_owned()))
            .with_text("PORT", "[not json");
        let loader = SecretStoreLoader::new(store).with_identifier("vault");

        assert_eq!(loader.identifier(), "vault");
        assert_eq!(
            load(&loader).await,
            json!({
                "db": {"url": "postgres://blob", "pool": 4, "password": "hunter2"},
                "port": "[not json"
            })
        );
    }

    #[tokio::test]
    async fn per_secret_errors_go_to_the_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let store = StaticSecretStore::new()
            .with_text("PORT", "1")
            .with_failure("DB_URL", "AccessDenied", "not allowed");
        let loader = SecretStoreLoader::new(store).on_errors(Arc::new(move |errors: &[SecretFetchError]| {
            sink.lock()
                .expect("lock")
                .extend(errors.iter().map(|error| error.code.clone()));
        }));

        assert_eq!(load(&loader).await, json!({"port": "1"}));
        assert_eq!(*seen.lock().expect("lock"), vec!["AccessDenied".to_owned()]);
    }

    #[tokio::test]
    async fn invalid_binary_secret_fails_the_load() {
        let store = StaticSecretStore::new().with_value("PORT", SecretValue::Binary("***".to_owned()));
        let loader = SecretStoreLoader::new(store);

        let error = loader.load(&keys()).await.expect_err("bad base64 must fail");
        assert!(error.to_string().contains("secret 'PORT' could not be decoded"));
    }

    struct Unreachable;

    #[async_trait]
    impl SecretStore for Unreachable {
        async fn batch_get(&self, _names: &[String], _next_token: Option<String>) -> Result<SecretBatch> {
            Err(Error::Source("connection refused".to_owned()))
        }
    }

    #[tokio::test]
    async fn store_failure_fails_the_load() {
        let loader = SecretStoreLoader::new(Unreachable);
        let error = loader.load(&keys()).await.expect_err("store error must surface");
        assert!(error.to_string().contains("connection refused"));
    }
}
