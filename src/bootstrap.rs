//! The bootstrap orchestrator: the fixed startup sequence that takes the
//! process from raw arguments to a live loading context.
//!
//! The sequence is a correctness requirement, not an optimization choice:
//! deobfuscation must fully precede the first load from an archive,
//! entrypoint location must precede the context switch, and the transformer
//! chain must be locked before any class resolves through it. Steps 1-11
//! abort on first failure; pre-launch hooks are isolated from each other and
//! their failures are collected, not fatal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, error, info};

use crate::classpath::load_time_dependencies;
use crate::delegate::LoadingDelegate;
use crate::env::{
    env_flag, env_var, Environment, Namespace, COMPAT_LOADER_VAR, DEVELOPMENT_VAR, SIDE_VAR,
};
use crate::namespace::NamespaceMapper;
use crate::provider::{discover, GameProvider};
use crate::services::{DeobfuscationService, ModRuntime, TransformerBootstrap};
use crate::source::ClassSource;
use crate::strategy::{select_strategy, LoadingContext};
use crate::transform::TransformerChain;

/// Inputs resolved before the sequence starts. Explicit fields win over the
/// corresponding environment variables.
#[derive(Default)]
pub struct BootstrapConfig {
    pub environment: Option<Environment>,
    pub development: Option<bool>,
    pub force_compatibility: Option<bool>,
    /// Inherited classpath string for load-time dependency introspection.
    pub inherited_classpath: Option<String>,
    /// Platform source for the compatibility strategy.
    pub platform_source: Option<ClassSource>,
    /// Arguments passed through to providers and the game.
    pub args: Vec<String>,
}

/// One pre-launch hook: `(name, callback)`, invoked in registration order.
pub type PreLaunchHook = Box<dyn Fn(&LoadingContext) -> Result<()> + Send>;

/// A hook failure surfaced to the caller without aborting sibling hooks.
#[derive(Debug)]
pub struct HookFailure {
    pub hook: String,
    pub error: String,
}

/// Live result of a completed bootstrap.
pub struct LaunchHandle {
    context: LoadingContext,
    provider: Box<dyn GameProvider>,
    pub development: bool,
    pub target_namespace: &'static str,
    pub entrypoints: Vec<String>,
    pub load_time_dependencies: Vec<PathBuf>,
    pub hook_failures: Vec<HookFailure>,
    properties: HashMap<String, String>,
}

impl LaunchHandle {
    pub fn context(&self) -> &LoadingContext {
        &self.context
    }

    /// Launcher properties fixed at bootstrap, for collaborator inspection.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn game_name(&self) -> &str {
        self.provider
            .candidate()
            .map(|c| c.game_name.as_str())
            .unwrap_or("unknown")
    }

    /// Invoke the game's own entry function through the live context.
    pub fn launch(&self) -> Result<()> {
        self.provider.launch(&self.context)
    }
}

/// The top-level bootstrap sequence. Providers, collaborators, transformer
/// stages, and hooks are all registered before [`Orchestrator::run`];
/// afterward the configuration is immutable.
pub struct Orchestrator {
    providers: Vec<Box<dyn GameProvider>>,
    deobfuscator: Box<dyn DeobfuscationService>,
    mods: Box<dyn ModRuntime>,
    transformer_bootstrap: Box<dyn TransformerBootstrap>,
    chain: TransformerChain,
    hooks: Vec<(String, PreLaunchHook)>,
}

impl Orchestrator {
    pub fn new(
        deobfuscator: Box<dyn DeobfuscationService>,
        mods: Box<dyn ModRuntime>,
        transformer_bootstrap: Box<dyn TransformerBootstrap>,
    ) -> Self {
        Self {
            providers: Vec::new(),
            deobfuscator,
            mods,
            transformer_bootstrap,
            chain: TransformerChain::new(),
            hooks: Vec::new(),
        }
    }

    /// Append a provider; registration order is discovery priority order.
    pub fn register_provider(&mut self, provider: Box<dyn GameProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// Register a transformer stage. Fails once the chain is locked.
    pub fn register_transformer<F>(&mut self, name: impl Into<String>, stage: F) -> Result<()>
    where
        F: Fn(&str, Vec<u8>) -> Vec<u8> + Send + Sync + 'static,
    {
        self.chain.register(name, stage)
    }

    /// Register a pre-launch hook, invoked in registration order.
    pub fn register_pre_launch_hook(
        &mut self,
        name: impl Into<String>,
        hook: PreLaunchHook,
    ) -> &mut Self {
        self.hooks.push((name.into(), hook));
        self
    }

    /// Run the full bootstrap sequence and return the live handle.
    pub fn run(mut self, config: BootstrapConfig) -> Result<LaunchHandle> {
        // Launcher properties are fixed exactly once, at the start of the
        // sequence, and never mutated afterward.
        let mut properties = HashMap::new();

        // Step 1: resolve the environment; explicit parameter wins.
        let environment = match config.environment {
            Some(environment) => environment,
            None => env_var(SIDE_VAR)
                .ok_or_else(|| anyhow!("please specify a side: set {} to client or server", SIDE_VAR))?
                .parse()
                .context("resolving side from environment")?,
        };
        properties.insert("side".to_string(), environment.as_str().to_string());
        debug!(side = environment.as_str(), "environment resolved");

        // Step 2: discovery, fixed priority order, first success wins.
        let selected = discover(&mut self.providers, environment, &config.args)?;
        let provider = self.providers.remove(selected);
        let candidate = provider
            .candidate()
            .ok_or_else(|| anyhow!("selected provider lost its candidate"))?
            .clone();

        // Step 3: development mode, default false.
        let development = config
            .development
            .unwrap_or_else(|| env_flag(DEVELOPMENT_VAR));
        properties.insert("development".to_string(), development.to_string());

        // Step 4: pick the strategy and build the single delegate.
        let use_compatibility = candidate.requires_platform_loader
            || config
                .force_compatibility
                .unwrap_or_else(|| env_flag(COMPAT_LOADER_VAR));
        let delegate = Arc::new(LoadingDelegate::new(environment, candidate.obfuscated));
        let context = select_strategy(delegate.clone(), use_compatibility, config.platform_source);
        properties.insert(
            "strategy".to_string(),
            context.strategy_name().to_string(),
        );

        // Step 5: deobfuscate every context archive before anything loads
        // from it, then make the archives visible as class sources.
        let namespace = Namespace::for_development(development);
        if candidate.obfuscated {
            let mut table = HashMap::new();
            for archive in &candidate.context_archives {
                let contribution = self.deobfuscator.remap_archive(
                    &candidate.game_id,
                    &candidate.raw_version,
                    archive,
                    namespace.id(),
                )?;
                table.extend(contribution);
            }
            let mapper = match namespace {
                Namespace::Named => NamespaceMapper::identity(),
                Namespace::Intermediary => NamespaceMapper::with_table(table),
            };
            delegate.set_mapper(mapper);
        }
        for (index, archive) in candidate.context_archives.iter().enumerate() {
            let label = format!("game:{}", archive.display());
            let source = ClassSource::directory(label, archive);
            if index == 0 {
                delegate.add_game_archive(source)?;
            } else {
                delegate.add_classpath_entry(source)?;
            }
        }

        // Step 6: locate entrypoints before the loading context switches;
        // the locator may inspect archives under the original loader.
        let entrypoints = provider
            .entrypoint_locator()
            .locate_entrypoints(&candidate)?;
        debug!(entrypoints = ?entrypoints, "entrypoints located");

        // Step 7: switch the current thread's loading context.
        context.install();

        // Step 8: initialize and freeze the mod runtime.
        self.mods.load(&candidate)?;
        self.mods.freeze();

        // Step 9: access wideners.
        let widener_count = self.mods.load_access_wideners(&delegate)?;
        if widener_count > 0 {
            info!(count = widener_count, "access wideners loaded");
        }

        // Step 10: transformation engine bootstrap may register more stages.
        self.transformer_bootstrap
            .init(environment, self.mods.as_ref(), &mut self.chain)?;

        // Step 11: lock the chain and materialize it into the delegate.
        let locked = self.chain.lock();
        delegate.install_chain(locked);

        // Step 12: pre-launch hooks, report-and-continue.
        let mut hook_failures = Vec::new();
        for (name, hook) in &self.hooks {
            if let Err(err) = hook(&context) {
                error!(hook = %name, error = %err, "pre-launch hook failed");
                hook_failures.push(HookFailure {
                    hook: name.clone(),
                    error: format!("{:#}", err),
                });
            }
        }

        // Step 13: the candidate gate in step 2 makes this unreachable, but
        // failing loudly beats launching without a game.
        if provider.candidate().is_none() {
            bail!("game provider was not initialized before launch");
        }

        let game_archive = candidate.context_archives.first().map(PathBuf::as_path);
        let deps = config
            .inherited_classpath
            .as_deref()
            .map(|cp| load_time_dependencies(cp, game_archive))
            .unwrap_or_default();

        info!(
            game = %candidate.game_name,
            version = %candidate.raw_version,
            strategy = context.strategy_name(),
            namespace = namespace.id(),
            "bootstrap complete"
        );

        Ok(LaunchHandle {
            context,
            provider,
            development,
            target_namespace: namespace.id(),
            entrypoints,
            load_time_dependencies: deps,
            hook_failures,
            properties,
        })
    }
}
