use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::manifest::schema::{Manifest, SourceSpec};

pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    if manifest.provider.trim().is_empty() {
        return Err(Error::Config("manifest provider cannot be empty".to_owned()));
    }

    if manifest.schema.as_os_str().is_empty() {
        return Err(Error::Config("manifest schema path cannot be empty".to_owned()));
    }

    if manifest.sources.is_empty() {
        return Err(Error::Config(
            "at least one source must be configured".to_owned(),
        ));
    }

    let mut identifiers = HashSet::new();
    for (index, source) in manifest.sources.iter().enumerate() {
        if let Some(identifier) = source.identifier() {
            let identifier = identifier.trim();
            if identifier.is_empty() {
                return Err(Error::Config(format!(
                    "source #{index} has an empty identifier"
                )));
            }
            if !identifiers.insert(identifier.to_owned()) {
                return Err(Error::Config(format!(
                    "duplicate source identifier '{identifier}'"
                )));
            }
        }

        match source {
            SourceSpec::JsonFile { dir, base_name } => {
                if dir.as_os_str().is_empty() {
                    return Err(Error::Config(format!(
                        "json_file source #{index} requires a directory"
                    )));
                }
                if base_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
                    return Err(Error::Config(format!(
                        "json_file source #{index} has an empty base_name"
                    )));
                }
            }
            SourceSpec::Defaults { .. } | SourceSpec::Env { .. } => {}
        }
    }

    Ok(())
}
