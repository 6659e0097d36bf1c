//! Contracts for the external collaborators the orchestrator calls into.
//!
//! Game discovery layout, mod metadata, the remapping table source, and the
//! concrete bytecode transformation engine are all external services; this
//! module pins down only the interfaces the core needs, plus inert defaults
//! used by the CLI and by tests.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::delegate::LoadingDelegate;
use crate::env::Environment;
use crate::provider::GameCandidate;
use crate::transform::TransformerChain;

/// Remaps one context archive into the target namespace.
///
/// Must fully complete for an archive before that archive is used as a class
/// source. Returns the class-name table contribution (named -> intermediary)
/// for the namespace mapper.
pub trait DeobfuscationService: Send {
    fn remap_archive(
        &self,
        game_id: &str,
        version: &str,
        archive: &Path,
        target_namespace: &str,
    ) -> Result<HashMap<String, String>>;
}

/// Deobfuscator that remaps nothing; for games shipping readable names.
pub struct NoopDeobfuscator;

impl DeobfuscationService for NoopDeobfuscator {
    fn remap_archive(
        &self,
        game_id: &str,
        _version: &str,
        archive: &Path,
        target_namespace: &str,
    ) -> Result<HashMap<String, String>> {
        debug!(
            game = %game_id,
            archive = %archive.display(),
            namespace = %target_namespace,
            "no-op deobfuscation"
        );
        Ok(HashMap::new())
    }
}

/// One access-control relaxation rule loaded from widener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessWidenerRule {
    pub class: String,
    pub member: String,
    pub access: String,
}

/// The mod/loader subsystem: registered state mutates during load and is
/// frozen once initialization completes.
pub trait ModRuntime: Send {
    /// Bind to the selected candidate and load mod state.
    fn load(&mut self, candidate: &GameCandidate) -> Result<()>;

    /// Freeze registered state; further mutation is an error.
    fn freeze(&mut self);

    fn is_frozen(&self) -> bool;

    /// Load access-control/widener configuration from the classpath.
    fn load_access_wideners(&mut self, delegate: &LoadingDelegate) -> Result<usize>;
}

/// Minimal mod runtime tracking frozen state and widener rules.
#[derive(Default)]
pub struct DefaultModRuntime {
    game_id: Option<String>,
    wideners: Vec<AccessWidenerRule>,
    frozen: bool,
}

impl DefaultModRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn widener_rules(&self) -> &[AccessWidenerRule] {
        &self.wideners
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }
}

impl ModRuntime for DefaultModRuntime {
    fn load(&mut self, candidate: &GameCandidate) -> Result<()> {
        if self.frozen {
            bail!("mod runtime is frozen, cannot load again");
        }
        self.game_id = Some(candidate.game_id.clone());
        info!(game = %candidate.game_id, "mod runtime bound to game");
        Ok(())
    }

    fn freeze(&mut self) {
        self.frozen = true;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn load_access_wideners(&mut self, delegate: &LoadingDelegate) -> Result<usize> {
        let Some(bytes) = delegate.open_resource("access_wideners.json")? else {
            return Ok(0);
        };
        let rules: Vec<AccessWidenerRule> =
            serde_json::from_slice(&bytes).context("malformed access widener configuration")?;
        let count = rules.len();
        self.wideners.extend(rules);
        Ok(count)
    }
}

/// The mixin-style bytecode transformation engine's bootstrap hook: bound to
/// the environment and the frozen mod runtime, it registers its stages into
/// the transformer chain before the chain is locked.
pub trait TransformerBootstrap: Send {
    fn init(
        &self,
        environment: Environment,
        mods: &dyn ModRuntime,
        chain: &mut TransformerChain,
    ) -> Result<()>;
}

/// Bootstrap that registers no stages.
pub struct NoopTransformerBootstrap;

impl TransformerBootstrap for NoopTransformerBootstrap {
    fn init(
        &self,
        environment: Environment,
        _mods: &dyn ModRuntime,
        _chain: &mut TransformerChain,
    ) -> Result<()> {
        debug!(side = environment.as_str(), "no-op transformer bootstrap");
        Ok(())
    }
}

/// Locates declared entrypoints. Runs before the loading context switch,
/// because it may need to inspect archives under the original loader.
pub trait EntrypointLocator: Send + Sync {
    fn locate_entrypoints(&self, candidate: &GameCandidate) -> Result<Vec<String>>;
}

/// Locator reading entrypoints from each context archive's manifest.
pub struct ManifestEntrypointLocator;

impl EntrypointLocator for ManifestEntrypointLocator {
    fn locate_entrypoints(&self, candidate: &GameCandidate) -> Result<Vec<String>> {
        let mut entrypoints = vec![candidate.entrypoint.clone()];
        for archive in &candidate.context_archives {
            let source = crate::source::ClassSource::directory("probe", archive);
            if let Some(manifest) = source.manifest()? {
                for (key, value) in &manifest.attributes {
                    if key.starts_with("entrypoint-") && !entrypoints.contains(value) {
                        entrypoints.push(value.clone());
                    }
                }
            }
        }
        Ok(entrypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ClassSource;
    use std::path::PathBuf;

    fn candidate() -> GameCandidate {
        GameCandidate {
            game_id: "demo".to_string(),
            game_name: "Demo".to_string(),
            raw_version: "1.0".to_string(),
            obfuscated: false,
            requires_platform_loader: false,
            context_archives: vec![],
            launch_directory: PathBuf::from("."),
            entrypoint: "demo.Main".to_string(),
        }
    }

    #[test]
    fn mod_runtime_freezes() {
        let mut mods = DefaultModRuntime::new();
        mods.load(&candidate()).unwrap();
        mods.freeze();
        assert!(mods.is_frozen());
        let err = mods.load(&candidate()).unwrap_err();
        assert!(err.to_string().contains("frozen"));
    }

    #[test]
    fn wideners_load_from_classpath() {
        let delegate = LoadingDelegate::new(Environment::Server, false);
        let mut entries = std::collections::HashMap::new();
        entries.insert(
            "access_wideners.json".to_string(),
            br#"[{"class":"a.B","member":"run","access":"public"}]"#.to_vec(),
        );
        delegate
            .add_classpath_entry(ClassSource::memory("mods/widener", entries))
            .unwrap();

        let mut mods = DefaultModRuntime::new();
        let count = mods.load_access_wideners(&delegate).unwrap();
        assert_eq!(count, 1);
        assert_eq!(mods.widener_rules()[0].class, "a.B");
    }

    #[test]
    fn missing_wideners_are_not_an_error() {
        let delegate = LoadingDelegate::new(Environment::Server, false);
        let mut mods = DefaultModRuntime::new();
        assert_eq!(mods.load_access_wideners(&delegate).unwrap(), 0);
    }
}
