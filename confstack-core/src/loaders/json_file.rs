use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::loaders::{LoadMode, Loader};
use crate::schema::{value_kind, LogicalKey};
use crate::tree::{parse_text, RawTree};

/// Selects `<env>.json` / `<env>.local.json` when no base name is given.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_DIR: &str = "config";

const EXTENSIONS: [&str; 2] = ["json", "json5"];

#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    identifier: String,
    dir: PathBuf,
    base_names: Vec<String>,
}

impl JsonFileLoader {
    /// An explicit `base_name` is the only file considered; otherwise the
    /// environment named by `APP_ENV` picks `<env>` then `<env>.local`.
    pub fn new(dir: Option<PathBuf>, base_name: Option<String>) -> Self {
        let base_names = match base_name {
            Some(base_name) => vec![base_name],
            None => {
                let environment = std::env::var(ENVIRONMENT_VAR)
                    .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_owned());
                environment_base_names(&environment)
            }
        };
        Self::with_base_names(dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DIR)), base_names)
    }

    pub fn for_environment(dir: impl Into<PathBuf>, environment: &str) -> Self {
        Self::with_base_names(dir.into(), environment_base_names(environment))
    }

    fn with_base_names(dir: PathBuf, base_names: Vec<String>) -> Self {
        let identifier = format!("json_file({}, [{}])", dir.display(), base_names.join(", "));
        Self {
            identifier,
            dir,
            base_names,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names searched, in priority order.
    pub fn candidate_files(&self) -> Vec<String> {
        self.base_names
            .iter()
            .flat_map(|base| EXTENSIONS.iter().map(move |ext| format!("{base}.{ext}")))
            .collect()
    }

    pub fn read(&self) -> Result<RawTree> {
        let candidates = self.candidate_files();
        let Some(path) = self.locate(&candidates)? else {
            return Err(Error::Source(format!(
                "config file not found in '{}'; searched for {}",
                self.dir.display(),
                candidates.join(", ")
            )));
        };

        let content = std::fs::read_to_string(&path).map_err(|err| {
            Error::Source(format!(
                "failed to read config file '{}': {err}",
                path.display()
            ))
        })?;
        let parsed = parse_text(&content).map_err(|err| {
            Error::Source(format!(
                "failed to parse config file '{}': {err}",
                path.display()
            ))
        })?;

        match parsed {
            Value::Object(tree) => {
                tracing::debug!(loader = %self.identifier, file = %path.display(), "loaded config file");
                Ok(tree)
            }
            other => Err(Error::Source(format!(
                "config file '{}' must contain a JSON object, got {}",
                path.display(),
                value_kind(&other)
            ))),
        }
    }

    fn locate(&self, candidates: &[String]) -> Result<Option<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::Source(format!("config directory '{}' not found", self.dir.display()))
            } else {
                Error::Source(format!(
                    "failed to read config directory '{}': {err}",
                    self.dir.display()
                ))
            }
        })?;

        let present = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect::<HashSet<_>>();

        Ok(candidates
            .iter()
            .find(|candidate| present.contains(candidate.as_str()))
            .map(|found| self.dir.join(found)))
    }
}

fn environment_base_names(environment: &str) -> Vec<String> {
    vec![environment.to_owned(), format!("{environment}.local")]
}

#[async_trait]
impl Loader for JsonFileLoader {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mode(&self) -> LoadMode {
        LoadMode::Immediate
    }

    async fn load(&self, _keys: &[LogicalKey]) -> Result<Option<RawTree>> {
        self.read().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::JsonFileLoader;
    use crate::loaders::Loader;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).expect("fixture written");
    }

    #[test]
    fn explicit_base_name_is_the_only_candidate() {
        let loader = JsonFileLoader::new(Some("cfg".into()), Some("default".to_owned()));
        assert_eq!(loader.candidate_files(), vec!["default.json", "default.json5"]);
        assert_eq!(loader.identifier(), "json_file(cfg, [default])");
    }

    #[test]
    fn environment_selects_env_and_local_files() {
        let loader = JsonFileLoader::for_environment("cfg", "production");
        assert_eq!(
            loader.candidate_files(),
            vec![
                "production.json",
                "production.json5",
                "production.local.json",
                "production.local.json5"
            ]
        );
    }

    #[test]
    fn reads_json_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(&dir, "default.json", r#"{"port": 3000, "nested": {"foo": {"bar": "baz"}}}"#);

        let loader = JsonFileLoader::new(Some(dir.path().to_path_buf()), Some("default".to_owned()));
        let tree = loader.read().expect("file loads");

        assert_eq!(
            Value::Object(tree),
            json!({"port": 3000, "nested": {"foo": {"bar": "baz"}}})
        );
    }

    #[test]
    fn falls_back_to_json5_and_local_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(&dir, "test.local.json5", "{\n  // local override\n  port: 4000,\n}\n");

        let loader = JsonFileLoader::for_environment(dir.path(), "test");
        let tree = loader.read().expect("json5 file loads");
        assert_eq!(Value::Object(tree), json!({"port": 4000}));
    }

    #[test]
    fn first_candidate_wins() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(&dir, "test.json", r#"{"from": "env"}"#);
        write(&dir, "test.local.json", r#"{"from": "local"}"#);

        let loader = JsonFileLoader::for_environment(dir.path(), "test");
        assert_eq!(Value::Object(loader.read().expect("loads")), json!({"from": "env"}));
    }

    #[test]
    fn missing_file_lists_searched_names() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loader = JsonFileLoader::new(Some(dir.path().to_path_buf()), Some("default".to_owned()));

        let error = loader.read().expect_err("missing file must fail");
        assert!(error
            .to_string()
            .contains("searched for default.json, default.json5"));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope");
        let loader = JsonFileLoader::new(Some(missing), Some("default".to_owned()));

        let error = loader.read().expect_err("missing dir must fail");
        assert!(error.to_string().contains("not found"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(&dir, "default.json", "[1, 2, 3]");
        let loader = JsonFileLoader::new(Some(dir.path().to_path_buf()), Some("default".to_owned()));

        let error = loader.read().expect_err("array root must fail");
        assert!(error.to_string().contains("must contain a JSON object, got array"));
    }

    #[test]
    fn unparsable_file_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(&dir, "default.json", "{ port: ");
        let loader = JsonFileLoader::new(Some(dir.path().to_path_buf()), Some("default".to_owned()));

        let error = loader.read().expect_err("garbage must fail");
        assert!(error.to_string().contains("failed to parse config file"));
    }
}
