use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use confstack_core::manifest::DEFAULT_MANIFEST;

#[derive(Debug, Parser)]
#[command(name = "confstack", about = "Resolve layered configuration against a schema")]
pub struct Cli {
    #[arg(long, global = true, env = "CONFSTACK_MANIFEST", default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Load, merge and validate every source, then print the result.
    Resolve,
    /// Show which source supplied each key.
    Explain,
    /// List the logical keys derived from the schema.
    Keys,
    /// List registered schema providers.
    Providers,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Explain => "explain",
            Self::Keys => "keys",
            Self::Providers => "providers",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
