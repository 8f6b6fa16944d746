use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::loaders::orchestrator::LoaderFailure;
use crate::loaders::Loader;
use crate::resolve::pipeline::{drive_immediate, ensure_immediate, Resolver};
use crate::schema::{derive_keys_for, LogicalKey};
use crate::tree::{value_at_path, RawTree};

/// Which loader supplied the final value of a leaf key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyProvenance {
    pub key: LogicalKey,
    /// `None` when no loader had a value at the key's path.
    pub supplied_by: Option<String>,
}

impl Resolver {
    /// Runs the loaders one by one, without validating, and records the
    /// last loader that had a value at each leaf key.
    pub async fn explain(
        &self,
        provider_id: &str,
        schema: &Value,
        loaders: &[Arc<dyn Loader>],
    ) -> Result<Vec<KeyProvenance>> {
        let provider = self.registry().get(provider_id)?;
        let keys = derive_keys_for(provider.as_ref(), schema)?;
        let mut supplied_by: Vec<Option<String>> = vec![None; keys.len()];

        for loader in loaders {
            match loader.load(&keys).await {
                Ok(Some(tree)) => attribute(&keys, &mut supplied_by, loader.identifier(), &tree),
                Ok(None) => {}
                Err(error) => {
                    return Err(LoaderFailure {
                        loader: loader.identifier().to_owned(),
                        error,
                    }
                    .into_error())
                }
            }
        }

        Ok(keys
            .into_iter()
            .zip(supplied_by)
            .filter(|(key, _)| !key.is_container)
            .map(|(key, supplied_by)| KeyProvenance { key, supplied_by })
            .collect())
    }

    pub fn explain_immediate(
        &self,
        provider_id: &str,
        schema: &Value,
        loaders: &[Arc<dyn Loader>],
    ) -> Result<Vec<KeyProvenance>> {
        ensure_immediate(loaders)?;
        drive_immediate(self.explain(provider_id, schema, loaders))?
    }
}

fn attribute(keys: &[LogicalKey], supplied_by: &mut [Option<String>], loader: &str, tree: &RawTree) {
    for (key, slot) in keys.iter().zip(supplied_by.iter_mut()) {
        if value_at_path(tree, &key.path).is_some() {
            *slot = Some(loader.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use serde_json::json;

    use super::KeyProvenance;
    use crate::error::Error;
    use crate::loaders::{EnvLoader, JsonFileLoader, Loader, StaticLoader};
    use crate::resolve::Resolver;
    use crate::schema::{LogicalKey, SchemaProviderRegistry};

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(SchemaProviderRegistry::with_builtin_providers()))
    }

    fn env(vars: &[(&str, &str)]) -> Arc<dyn Loader> {
        Arc::new(EnvLoader::new(
            vars.iter()
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
                .collect::<HashMap<_, _>>(),
        ))
    }

    fn supplied(report: &[KeyProvenance]) -> Vec<(&str, Option<&str>)> {
        report
            .iter()
            .map(|entry| (entry.key.key.as_str(), entry.supplied_by.as_deref()))
            .collect()
    }

    #[tokio::test]
    async fn later_sources_take_credit_for_overridden_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("default.json"),
            r#"{"port": 3000, "nested": {"foo": {"bar": "baz"}}}"#,
        )
        .expect("fixture written");
        let file = JsonFileLoader::new(Some(dir.path().to_path_buf()), Some("default".to_owned()));
        let file_id = file.identifier().to_owned();
        let loaders: Vec<Arc<dyn Loader>> = vec![Arc::new(file), env(&[("DB_URL", "postgres://env")])];
        let schema = json!({
            "db": {"url": "string"},
            "port": "number",
            "nested": {"foo": {"bar": "string"}}
        });

        let report = resolver()
            .explain("shorthand", &schema, &loaders)
            .await
            .expect("audit succeeds");

        assert_eq!(
            supplied(&report),
            vec![
                ("DB_URL", Some("env")),
                ("PORT", Some(file_id.as_str())),
                ("NESTED_FOO_BAR", Some(file_id.as_str())),
            ]
        );
    }

    #[test]
    fn unsupplied_and_null_values_stay_unattributed() {
        let defaults = StaticLoader::from_value("defaults", json!({"port": 80, "host": null}))
            .expect("object fixture");
        let loaders: Vec<Arc<dyn Loader>> = vec![Arc::new(defaults), env(&[("PORT", "8080")])];
        let schema = json!({"host?": "string", "port": "number"});

        let report = resolver()
            .explain_immediate("shorthand", &schema, &loaders)
            .expect("audit succeeds");

        assert_eq!(
            report,
            vec![
                KeyProvenance {
                    key: LogicalKey::leaf("HOST", &["host"]),
                    supplied_by: None,
                },
                KeyProvenance {
                    key: LogicalKey::leaf("PORT", &["port"]),
                    supplied_by: Some("env".to_owned()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn container_blob_credits_its_leaves() {
        let loaders = vec![env(&[("DB", r#"{"url": "postgres://blob"}"#)])];
        let report = resolver()
            .explain("shorthand", &json!({"db": {"url": "string"}}), &loaders)
            .await
            .expect("audit succeeds");

        assert_eq!(supplied(&report), vec![("DB_URL", Some("env"))]);
    }

    #[tokio::test]
    async fn deferred_loaders_are_audited_in_order() {
        let remote = StaticLoader::from_value("remote", json!({"port": 1}))
            .expect("object fixture")
            .deferred();
        let loaders: Vec<Arc<dyn Loader>> = vec![env(&[("PORT", "2")]), Arc::new(remote)];

        let report = resolver()
            .explain("shorthand", &json!({"port": "number"}), &loaders)
            .await
            .expect("audit succeeds");
        assert_eq!(supplied(&report), vec![("PORT", Some("remote"))]);

        let error = resolver()
            .explain_immediate("shorthand", &json!({"port": "number"}), &loaders)
            .expect_err("immediate audit must reject deferred loaders");
        assert!(matches!(error, Error::Config(_)));
    }

    #[tokio::test]
    async fn loader_failure_aborts_the_audit() {
        let loaders: Vec<Arc<dyn Loader>> = vec![Arc::new(JsonFileLoader::new(
            Some("/definitely/missing".into()),
            Some("default".to_owned()),
        ))];

        let error = resolver()
            .explain("shorthand", &json!({"port": "number"}), &loaders)
            .await
            .expect_err("missing directory must fail");
        assert!(matches!(error, Error::Loader { .. }));
    }
}
