use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::error::{Error, Result};
use crate::loaders::{LoadMode, Loader};
use crate::schema::LogicalKey;
use crate::tree::RawTree;

#[derive(Debug)]
pub struct LoaderFailure {
    pub loader: String,
    pub error: Error,
}

impl LoaderFailure {
    pub fn into_error(self) -> Error {
        Error::Loader {
            loader: self.loader,
            source: Box::new(self.error),
        }
    }
}

/// Trees and failures, both in loader declaration order.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub values: Vec<RawTree>,
    pub errors: Vec<LoaderFailure>,
}

pub fn all_immediate(loaders: &[Arc<dyn Loader>]) -> bool {
    loaders
        .iter()
        .all(|loader| loader.mode() == LoadMode::Immediate)
}

/// Runs every loader and collects what each produced.
///
/// An all-immediate batch runs strictly one after another. As soon as one
/// loader is deferred, all of them are polled concurrently and the results are
/// put back into declaration order before they are returned. A failing loader
/// never stops the others.
pub async fn run(loaders: &[Arc<dyn Loader>], keys: &[LogicalKey]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    if all_immediate(loaders) {
        for loader in loaders {
            let result = loader.load(keys).await;
            record(&mut outcome, loader.as_ref(), result);
        }
        return outcome;
    }

    tracing::debug!(loaders = loaders.len(), "running loaders concurrently");
    let mut settled = stream::iter(loaders.iter().enumerate().map(|(index, loader)| async move {
        (index, loader.load(keys).await)
    }))
    .buffer_unordered(loaders.len().max(1))
    .collect::<Vec<_>>()
    .await;

    settled.sort_by_key(|(index, _)| *index);
    for (index, result) in settled {
        record(&mut outcome, loaders[index].as_ref(), result);
    }
    outcome
}

fn record(outcome: &mut LoadOutcome, loader: &dyn Loader, result: Result<Option<RawTree>>) {
    match result {
        Ok(Some(tree)) => {
            tracing::debug!(loader = %loader.identifier(), fields = tree.len(), "loader produced data");
            outcome.values.push(tree);
        }
        Ok(None) => {
            tracing::debug!(loader = %loader.identifier(), "loader had nothing to contribute");
        }
        Err(error) => {
            tracing::warn!(loader = %loader.identifier(), %error, "loader failed");
            outcome.errors.push(LoaderFailure {
                loader: loader.identifier().to_owned(),
                error,
            });
        }
    }
}
