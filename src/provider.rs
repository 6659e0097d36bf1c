//! Game providers and candidate discovery.
//!
//! Providers know how to recognize one game/platform variant. Discovery
//! queries every registered provider in a fixed priority order and selects
//! the first that locates its game; when none succeed the whole bootstrap
//! fails, reporting the full list of providers that were tried.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::{error, info};

use crate::env::Environment;
use crate::services::EntrypointLocator;
use crate::strategy::LoadingContext;

/// A discovered, loadable instance of the host game.
#[derive(Debug, Clone)]
pub struct GameCandidate {
    pub game_id: String,
    pub game_name: String,
    pub raw_version: String,
    pub obfuscated: bool,
    /// Whether the host environment forces the compatibility strategy.
    pub requires_platform_loader: bool,
    /// Ordered context archives (extracted directories).
    pub context_archives: Vec<PathBuf>,
    pub launch_directory: PathBuf,
    /// Entry class invoked by the game's own launch.
    pub entrypoint: String,
}

/// Contract for one game variant.
pub trait GameProvider: Send {
    /// Provider name, used in discovery diagnostics.
    fn name(&self) -> &str;

    /// Probe for the game. Returns whether a candidate was produced; probing
    /// failures are a "no", not an abort, so later providers still run.
    fn locate_game(&mut self, environment: Environment, args: &[String]) -> bool;

    /// The located candidate; `None` until `locate_game` succeeded.
    fn candidate(&self) -> Option<&GameCandidate>;

    /// Locator run before the loading context switch.
    fn entrypoint_locator(&self) -> &dyn EntrypointLocator;

    /// Hand control to the game through the live loading context.
    fn launch(&self, context: &LoadingContext) -> Result<()>;
}

/// Query providers in priority order and return the index of the first that
/// locates its game.
pub fn discover(
    providers: &mut [Box<dyn GameProvider>],
    environment: Environment,
    args: &[String],
) -> Result<usize> {
    for (index, provider) in providers.iter_mut().enumerate() {
        if provider.locate_game(environment, args) {
            let candidate = provider
                .candidate()
                .ok_or_else(|| anyhow!("provider {:?} located a game but produced no candidate", provider.name()))?;
            info!(
                game = %candidate.game_name,
                version = %candidate.raw_version,
                provider = %provider.name(),
                "loading for game"
            );
            return Ok(index);
        }
    }

    error!("could not find a valid game provider");
    for provider in providers.iter() {
        error!(provider = %provider.name(), "- tried");
    }
    let tried: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    Err(anyhow!(
        "could not find a valid game provider (tried: {})",
        tried.join(", ")
    ))
}

/// Provider honoring the explicit game-archive-path override: the archive is
/// an extracted directory whose `manifest.json` names the game.
pub struct ExplicitArchiveProvider {
    archive: PathBuf,
    locator: crate::services::ManifestEntrypointLocator,
    candidate: Option<GameCandidate>,
}

impl ExplicitArchiveProvider {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            locator: crate::services::ManifestEntrypointLocator,
            candidate: None,
        }
    }
}

impl GameProvider for ExplicitArchiveProvider {
    fn name(&self) -> &str {
        "explicit-archive"
    }

    fn locate_game(&mut self, environment: Environment, _args: &[String]) -> bool {
        if !self.archive.is_dir() {
            return false;
        }
        let source = crate::source::ClassSource::directory("game", &self.archive);
        let manifest = match source.manifest() {
            Ok(Some(manifest)) => manifest,
            _ => return false,
        };

        let game_name = manifest.title.clone().unwrap_or_else(|| "unknown".to_string());
        let entrypoint = manifest
            .attributes
            .get(match environment {
                Environment::Client => "entrypoint-client",
                Environment::Server => "entrypoint-server",
            })
            .or_else(|| manifest.attributes.get("entrypoint"))
            .cloned()
            .unwrap_or_default();
        if entrypoint.is_empty() {
            return false;
        }

        self.candidate = Some(GameCandidate {
            game_id: game_name.to_ascii_lowercase().replace(' ', "-"),
            game_name,
            raw_version: manifest.version.clone().unwrap_or_else(|| "0.0.0".to_string()),
            obfuscated: manifest
                .attributes
                .get("obfuscated")
                .map(|v| v == "true")
                .unwrap_or(false),
            requires_platform_loader: manifest
                .attributes
                .get("requires-platform-loader")
                .map(|v| v == "true")
                .unwrap_or(false),
            context_archives: vec![self.archive.clone()],
            launch_directory: self
                .archive
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            entrypoint,
        });
        true
    }

    fn candidate(&self) -> Option<&GameCandidate> {
        self.candidate.as_ref()
    }

    fn entrypoint_locator(&self) -> &dyn EntrypointLocator {
        &self.locator
    }

    fn launch(&self, context: &LoadingContext) -> Result<()> {
        let candidate = self
            .candidate
            .as_ref()
            .ok_or_else(|| anyhow!("launch before locate_game"))?;
        // Resolving the entry class through the live context is the whole
        // point: it proves the game boots through the delegate.
        let bytes = context.class_bytes(&candidate.entrypoint, true)?;
        info!(
            entrypoint = %candidate.entrypoint,
            size = bytes.len(),
            "game entrypoint resolved, handing over control"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        name: &'static str,
        locates: bool,
        locator: crate::services::ManifestEntrypointLocator,
        candidate: Option<GameCandidate>,
    }

    impl StubProvider {
        fn new(name: &'static str, locates: bool) -> Self {
            Self {
                name,
                locates,
                locator: crate::services::ManifestEntrypointLocator,
                candidate: None,
            }
        }
    }

    impl GameProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn locate_game(&mut self, _environment: Environment, _args: &[String]) -> bool {
            if self.locates {
                self.candidate = Some(GameCandidate {
                    game_id: self.name.to_string(),
                    game_name: self.name.to_string(),
                    raw_version: "1.0".to_string(),
                    obfuscated: false,
                    requires_platform_loader: false,
                    context_archives: vec![],
                    launch_directory: PathBuf::from("."),
                    entrypoint: "a.B".to_string(),
                });
            }
            self.locates
        }

        fn candidate(&self) -> Option<&GameCandidate> {
            self.candidate.as_ref()
        }

        fn entrypoint_locator(&self) -> &dyn EntrypointLocator {
            &self.locator
        }

        fn launch(&self, _context: &LoadingContext) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn discovery_stops_at_first_success() {
        let mut providers: Vec<Box<dyn GameProvider>> = vec![
            Box::new(StubProvider::new("first-fails", false)),
            Box::new(StubProvider::new("second-succeeds", true)),
            Box::new(StubProvider::new("third-would-succeed", true)),
        ];
        let selected = discover(&mut providers, Environment::Server, &[]).unwrap();
        assert_eq!(selected, 1);
        assert_eq!(
            providers[selected].candidate().unwrap().game_id,
            "second-succeeds"
        );
        // The third provider was never probed.
        assert!(providers[2].candidate().is_none());
    }

    #[test]
    fn discovery_failure_lists_every_provider() {
        let mut providers: Vec<Box<dyn GameProvider>> = vec![
            Box::new(StubProvider::new("alpha", false)),
            Box::new(StubProvider::new("beta", false)),
        ];
        let err = discover(&mut providers, Environment::Client, &[]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("alpha"));
        assert!(message.contains("beta"));
    }
}
