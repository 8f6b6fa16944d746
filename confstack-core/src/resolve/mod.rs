//! Key derivation, loading, merging and validation in one pass.

pub mod manager;
pub mod merge;
pub mod pipeline;
pub mod provenance;

pub use manager::ConfigManager;
pub use merge::{merge, merge_into};
pub use pipeline::{LoaderErrorHook, ResolveHooks, ResolvedConfig, Resolver, ValidationErrorHook};
pub use provenance::KeyProvenance;
