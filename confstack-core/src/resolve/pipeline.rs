use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::loaders::orchestrator::{self, LoadOutcome, LoaderFailure};
use crate::loaders::{LoadMode, Loader};
use crate::resolve::merge::merge;
use crate::schema::registry::{self, SchemaProviderRegistry};
use crate::schema::{derive_keys_for, LogicalKey, SchemaProvider, ValidationError, ValidationOutcome};

pub type LoaderErrorHook = Arc<dyn Fn(&LoaderFailure) -> Result<()> + Send + Sync>;
pub type ValidationErrorHook = Arc<dyn Fn(&ValidationError, &Value) -> Result<()> + Send + Sync>;

/// Callbacks invoked when loading or validation fails.
///
/// A hook that returns `Err` halts resolution with that error.
#[derive(Clone, Default)]
pub struct ResolveHooks {
    on_data_loader_error: Option<LoaderErrorHook>,
    on_validation_error: Option<ValidationErrorHook>,
}

impl ResolveHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_data_loader_error(
        mut self,
        hook: impl Fn(&LoaderFailure) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_data_loader_error = Some(Arc::new(hook));
        self
    }

    /// Receives the provider's error and the merged tree that failed.
    pub fn on_validation_error(
        mut self,
        hook: impl Fn(&ValidationError, &Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_validation_error = Some(Arc::new(hook));
        self
    }

    pub fn has_loader_hook(&self) -> bool {
        self.on_data_loader_error.is_some()
    }

    pub(crate) fn report_loader_failure(&self, failure: &LoaderFailure) -> Result<()> {
        match &self.on_data_loader_error {
            Some(hook) => hook(failure),
            None => Ok(()),
        }
    }
}

/// Validated configuration. Clones share one immutable snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    provider: String,
    data: Arc<Value>,
}

impl ResolvedConfig {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(self.data.as_ref())?)
    }
}

#[derive(Clone)]
pub struct Resolver {
    registry: Arc<SchemaProviderRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<SchemaProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn with_global_registry() -> Self {
        Self::new(registry::global())
    }

    pub fn registry(&self) -> &Arc<SchemaProviderRegistry> {
        &self.registry
    }

    pub fn derive_keys(&self, provider_id: &str, schema: &Value) -> Result<Vec<LogicalKey>> {
        let provider = self.registry.get(provider_id)?;
        derive_keys_for(provider.as_ref(), schema)
    }

    /// Derives keys, loads, merges and validates.
    ///
    /// Any loader failure aborts after `on_data_loader_error` has seen every
    /// failure. A validation failure handled by `on_validation_error` yields
    /// `Ok(None)`.
    pub async fn resolve(
        &self,
        provider_id: &str,
        schema: &Value,
        loaders: &[Arc<dyn Loader>],
        hooks: &ResolveHooks,
    ) -> Result<Option<ResolvedConfig>> {
        let provider = self.registry.get(provider_id)?;
        let keys = derive_keys_for(provider.as_ref(), schema)?;
        tracing::debug!(provider = provider_id, keys = keys.len(), loaders = loaders.len(), "resolving configuration");

        let outcome = orchestrator::run(loaders, &keys).await;
        let LoadOutcome { values, errors } = outcome;

        if !errors.is_empty() {
            for failure in &errors {
                hooks.report_loader_failure(failure)?;
            }
            if let Some(first) = errors.into_iter().next() {
                return Err(first.into_error());
            }
        }

        let merged = Value::Object(merge(values));
        validate_merged(provider.as_ref(), provider_id, schema, merged, hooks)
    }

    /// Synchronous [`Resolver::resolve`]; every loader must be immediate.
    pub fn resolve_immediate(
        &self,
        provider_id: &str,
        schema: &Value,
        loaders: &[Arc<dyn Loader>],
        hooks: &ResolveHooks,
    ) -> Result<Option<ResolvedConfig>> {
        ensure_immediate(loaders)?;
        drive_immediate(self.resolve(provider_id, schema, loaders, hooks))?
    }
}

pub(crate) fn validate_merged(
    provider: &dyn SchemaProvider,
    provider_id: &str,
    schema: &Value,
    merged: Value,
    hooks: &ResolveHooks,
) -> Result<Option<ResolvedConfig>> {
    match provider.validate(schema, &merged)? {
        ValidationOutcome::Valid(data) => Ok(Some(ResolvedConfig {
            provider: provider_id.to_owned(),
            data: Arc::new(data),
        })),
        ValidationOutcome::Invalid(error) => match &hooks.on_validation_error {
            Some(hook) => {
                tracing::warn!(provider = provider_id, %error, "validation failed; handing off to hook");
                hook(&error, &merged)?;
                Ok(None)
            }
            None => Err(Error::Validation(error)),
        },
    }
}

pub(crate) fn ensure_immediate(loaders: &[Arc<dyn Loader>]) -> Result<()> {
    match loaders
        .iter()
        .find(|loader| loader.mode() != LoadMode::Immediate)
    {
        Some(loader) => Err(Error::Config(format!(
            "loader '{}' is deferred; use the async entry point",
            loader.identifier()
        ))),
        None => Ok(()),
    }
}

/// Polls once without an executor. Immediate loaders never suspend, so the
/// whole pipeline completes on the first poll.
pub(crate) fn drive_immediate<F: Future>(future: F) -> Result<F::Output> {
    future.now_or_never().ok_or_else(|| {
        Error::Config("an immediate loader suspended while loading".to_owned())
    })
}
