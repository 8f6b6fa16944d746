use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::loaders::{EnvLoader, JsonFileLoader, Loader, StaticLoader};
use crate::manifest::schema::{Manifest, SourceSpec, DEFAULTS_IDENTIFIER};
use crate::tree::parse_text;

pub fn load_from_file(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read manifest '{}': {err}", path.display()))
    })?;

    let mut manifest: Manifest = toml::from_str(&content).map_err(|err| {
        Error::Config(format!(
            "failed to parse manifest '{}': {err}",
            path.display()
        ))
    })?;
    manifest.root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(manifest)
}

impl Manifest {
    /// Relative paths are taken from the manifest's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn load_schema(&self) -> Result<Value> {
        let path = self.resolve_path(&self.schema);
        let content = std::fs::read_to_string(&path).map_err(|err| {
            Error::Config(format!("failed to read schema '{}': {err}", path.display()))
        })?;
        parse_text(&content).map_err(|err| {
            Error::Config(format!("failed to parse schema '{}': {err}", path.display()))
        })
    }

    /// Loaders in declaration order, lowest precedence first.
    pub fn build_loaders(&self) -> Result<Vec<Arc<dyn Loader>>> {
        self.sources
            .iter()
            .map(|source| self.build_loader(source))
            .collect()
    }

    fn build_loader(&self, source: &SourceSpec) -> Result<Arc<dyn Loader>> {
        let loader: Arc<dyn Loader> = match source {
            SourceSpec::Defaults { identifier, values } => Arc::new(StaticLoader::new(
                identifier.as_deref().unwrap_or(DEFAULTS_IDENTIFIER),
                values.clone(),
            )),
            SourceSpec::JsonFile { dir, base_name } => Arc::new(JsonFileLoader::new(
                Some(self.resolve_path(dir)),
                base_name.clone(),
            )),
            SourceSpec::Env { identifier } => {
                let loader = EnvLoader::from_process();
                match identifier {
                    Some(identifier) => Arc::new(loader.with_identifier(identifier.clone())),
                    None => Arc::new(loader),
                }
            }
        };
        tracing::debug!(kind = source.kind(), loader = %loader.identifier(), "built loader from manifest");
        Ok(loader)
    }
}
