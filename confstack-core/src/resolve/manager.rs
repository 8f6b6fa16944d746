use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::loaders::{orchestrator, Loader};
use crate::resolve::merge::merge;
use crate::resolve::pipeline::{validate_merged, ResolveHooks, ResolvedConfig, Resolver};
use crate::schema::derive_keys_for;

/// Holds the last successfully resolved configuration for one schema.
///
/// Unlike [`Resolver::resolve`], a loader hook that returns `Ok` here skips
/// the failed source and resolution continues with the remaining ones.
pub struct ConfigManager {
    resolver: Resolver,
    provider_id: String,
    schema: Value,
    loaders: Vec<Arc<dyn Loader>>,
    hooks: ResolveHooks,
    current: RwLock<Option<ResolvedConfig>>,
}

impl ConfigManager {
    pub fn new(
        resolver: Resolver,
        provider_id: impl Into<String>,
        schema: Value,
        loaders: Vec<Arc<dyn Loader>>,
    ) -> Self {
        Self {
            resolver,
            provider_id: provider_id.into(),
            schema,
            loaders,
            hooks: ResolveHooks::default(),
            current: RwLock::new(None),
        }
    }

    pub fn with_hooks(mut self, hooks: ResolveHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub async fn init(&self) -> Result<()> {
        let provider = self.resolver.registry().get(&self.provider_id)?;
        let keys = derive_keys_for(provider.as_ref(), &self.schema)?;
        let outcome = orchestrator::run(&self.loaders, &keys).await;

        for failure in outcome.errors {
            if !self.hooks.has_loader_hook() {
                return Err(failure.into_error());
            }
            self.hooks.report_loader_failure(&failure)?;
            tracing::warn!(loader = %failure.loader, "continuing without failed source");
        }

        let merged = Value::Object(merge(outcome.values));
        let resolved = validate_merged(
            provider.as_ref(),
            &self.provider_id,
            &self.schema,
            merged,
            &self.hooks,
        )?;

        if let Some(config) = resolved {
            *self.current.write().await = Some(config);
        }
        Ok(())
    }

    pub async fn values(&self) -> Result<ResolvedConfig> {
        self.current.read().await.clone().ok_or_else(|| {
            Error::Config("config manager is not initialized or holds no valid config".to_owned())
        })
    }
}
