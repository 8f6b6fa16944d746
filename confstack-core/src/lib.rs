pub mod error;
pub mod loaders;
pub mod logging;
pub mod manifest;
pub mod resolve;
pub mod schema;
pub mod tree;

pub use error::{Error, Result};
pub use loaders::{
    EnvLoader, JsonFileLoader, LoadMode, Loader, LoaderFailure, SecretStore, SecretStoreLoader,
    StaticLoader, StaticSecretStore,
};
pub use manifest::{Manifest, SourceSpec};
pub use resolve::{ConfigManager, KeyProvenance, ResolveHooks, ResolvedConfig, Resolver};
pub use schema::{
    LogicalKey, SchemaProvider, SchemaProviderRegistry, ValidationError, ValidationIssue,
};
pub use tree::RawTree;
