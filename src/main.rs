//! gantry CLI: run the bootstrap sequence against a local game archive.
//!
//! This is the manual/test entry point: it wires the default collaborators,
//! registers the explicit-archive provider, runs the orchestrator, and
//! launches the game. It fails fast when the side cannot be inferred from
//! either `--side` or `GANTRY_SIDE`.

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use gantry::args::Args;
use gantry::bootstrap::{BootstrapConfig, Orchestrator};
use gantry::env::{env_var, Environment, GAME_ARCHIVE_VAR};
use gantry::provider::ExplicitArchiveProvider;
use gantry::services::{DefaultModRuntime, NoopDeobfuscator, NoopTransformerBootstrap};

fn main() -> Result<()> {
    let args = Args::parse();

    let mut orchestrator = Orchestrator::new(
        Box::new(NoopDeobfuscator),
        Box::new(DefaultModRuntime::new()),
        Box::new(NoopTransformerBootstrap),
    );

    let archive = args
        .game_archive
        .or_else(|| env_var(GAME_ARCHIVE_VAR).map(Into::into));
    match archive {
        Some(path) => {
            orchestrator.register_provider(Box::new(ExplicitArchiveProvider::new(path)));
        }
        None => {
            warn!("no game archive configured, discovery will try no providers");
        }
    }

    let config = BootstrapConfig {
        environment: args.side.map(Environment::from),
        development: args.dev,
        force_compatibility: args.compat_loader,
        inherited_classpath: args.classpath.or_else(|| env_var("CLASSPATH")),
        platform_source: None,
        args: args.game_args,
    };

    let handle = orchestrator.run(config)?;
    for failure in &handle.hook_failures {
        warn!(hook = %failure.hook, error = %failure.error, "pre-launch hook failed");
    }
    handle.launch()
}
