//! TOML manifest describing which schema to use and where values come from.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_from_file;
pub use schema::{Manifest, SourceSpec, DEFAULT_MANIFEST};
pub use validation::validate_manifest;
