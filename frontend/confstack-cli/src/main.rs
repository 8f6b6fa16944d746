mod cli;
mod renderer;

use anyhow::Context;
use confstack_core::manifest::{self, Manifest};
use confstack_core::{Error, ResolveHooks, Resolver};

use crate::cli::{Cli, Command, OutputFormat};
use crate::renderer::Renderer;

fn main() {
    if let Err(error) = run() {
        eprintln!("confstack failed: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Cli::parse_args();
    confstack_core::logging::init_tracing(&args.log_level);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let renderer = Renderer::new(args.output);

    if let Err(error) = runtime.block_on(execute(&args, &renderer)) {
        match args.output {
            OutputFormat::Text => return Err(error.into()),
            OutputFormat::Json => {
                renderer.render_error(args.command.name(), &error)?;
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

async fn execute(args: &Cli, renderer: &Renderer) -> confstack_core::Result<()> {
    let resolver = Resolver::with_global_registry();

    if args.command == Command::Providers {
        return renderer.render_providers(&resolver.registry().list());
    }

    let manifest = load_manifest(args)?;
    let schema = manifest.load_schema()?;

    match args.command {
        Command::Resolve => {
            let loaders = manifest.build_loaders()?;
            let config = resolver
                .resolve(&manifest.provider, &schema, &loaders, &ResolveHooks::new())
                .await?
                .ok_or_else(|| Error::Config("no valid configuration was produced".to_owned()))?;
            renderer.render_config(&config)
        }
        Command::Explain => {
            let loaders = manifest.build_loaders()?;
            let report = resolver.explain(&manifest.provider, &schema, &loaders).await?;
            renderer.render_provenance(&report)
        }
        Command::Keys => {
            let keys = resolver.derive_keys(&manifest.provider, &schema)?;
            renderer.render_keys(&keys)
        }
        Command::Providers => renderer.render_providers(&resolver.registry().list()),
    }
}

fn load_manifest(args: &Cli) -> confstack_core::Result<Manifest> {
    let manifest = manifest::load_from_file(&args.manifest)?;
    manifest::validate_manifest(&manifest)?;
    tracing::debug!(
        manifest = %args.manifest.display(),
        provider = %manifest.provider,
        sources = manifest.sources.len(),
        "loaded manifest"
    );
    Ok(manifest)
}
