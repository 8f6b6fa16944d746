use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::loaders::env;

pub const DEFAULT_MANIFEST: &str = "confstack.toml";
pub const DEFAULTS_IDENTIFIER: &str = "defaults";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Registry name of the schema provider.
    pub provider: String,
    /// Schema document, relative to the manifest's directory.
    pub schema: PathBuf,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(skip)]
    pub root: PathBuf,
}

/// One entry of `[[sources]]`, lowest precedence first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Defaults {
        #[serde(default)]
        identifier: Option<String>,
        #[serde(default)]
        values: Map<String, Value>,
    },
    JsonFile {
        dir: PathBuf,
        #[serde(default)]
        base_name: Option<String>,
    },
    Env {
        #[serde(default)]
        identifier: Option<String>,
    },
}

impl SourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Defaults { .. } => "defaults",
            Self::JsonFile { .. } => "json_file",
            Self::Env { .. } => "env",
        }
    }

    /// Identifier the built loader reports, for sources that name themselves.
    /// File sources derive theirs from the directory and environment.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Defaults { identifier, .. } => {
                Some(identifier.as_deref().unwrap_or(DEFAULTS_IDENTIFIER))
            }
            Self::Env { identifier } => Some(identifier.as_deref().unwrap_or(env::IDENTIFIER)),
            Self::JsonFile { .. } => None,
        }
    }
}
