//! The code loading delegate: name resolution, transformation, and caching.
//!
//! Given a class name the delegate decides whether to load it from the game
//! archive or an added classpath entry, applies namespace mapping and the
//! locked transformer chain, and caches the result so repeated loads are
//! idempotent. Names belonging to the bootstrap layer itself are refused
//! outright: letting game or mod code observe (or replace) the orchestrator's
//! own classes would break the isolation the loader exists to provide.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{ClassRecord, TransformCache};
use crate::classpath::ClasspathSet;
use crate::env::Environment;
use crate::namespace::NamespaceMapper;
use crate::source::{class_resource_path, ArchiveManifest, ClassSource};
use crate::transform::LockedChain;

/// Class-name prefixes reserved for the bootstrap/orchestration layer.
const LOADER_INTERNAL_PREFIXES: &[&str] = &["gantry.loader.", "gantry.launch."];

/// Whether a class name is reserved for the loader itself.
pub fn is_loader_internal(class_name: &str) -> bool {
    LOADER_INTERNAL_PREFIXES
        .iter()
        .any(|prefix| class_name.starts_with(prefix))
}

/// Resolution core shared by both loading strategies.
///
/// Owns the classpath set, the transform cache, and the materialized
/// transformer chain. Constructed once per process during bootstrap.
pub struct LoadingDelegate {
    environment: Environment,
    obfuscated: bool,
    mapper: RwLock<NamespaceMapper>,
    classpath: RwLock<ClasspathSet>,
    cache: TransformCache,
    chain: RwLock<LockedChain>,
}

impl LoadingDelegate {
    pub fn new(environment: Environment, obfuscated: bool) -> Self {
        Self {
            environment,
            obfuscated,
            mapper: RwLock::new(NamespaceMapper::identity()),
            classpath: RwLock::new(ClasspathSet::new()),
            cache: TransformCache::new(),
            chain: RwLock::new(LockedChain::empty()),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Install the namespace mapper produced by deobfuscation.
    ///
    /// Must happen before the first class is resolved from an obfuscated
    /// archive; already-cached records keep the mapping they resolved under.
    pub fn set_mapper(&self, mapper: NamespaceMapper) {
        *self.mapper.write() = mapper;
    }

    /// Materialize the locked transformer chain into the resolution path.
    pub fn install_chain(&self, chain: LockedChain) {
        debug!(stages = ?chain.stage_names(), "installing transformer chain");
        *self.chain.write() = chain;
    }

    /// Append a classpath entry. Idempotent for duplicate labels; a
    /// directory entry whose root does not exist is a configuration error.
    pub fn add_classpath_entry(&self, source: ClassSource) -> Result<bool> {
        self.validate_source(&source)?;
        Ok(self.classpath.write().add(source))
    }

    /// Append the game archive entry itself.
    pub fn add_game_archive(&self, source: ClassSource) -> Result<bool> {
        self.validate_source(&source)?;
        Ok(self.classpath.write().add_game_archive(source))
    }

    fn validate_source(&self, source: &ClassSource) -> Result<()> {
        if let Some(root) = source.root() {
            if !root.is_dir() {
                bail!(
                    "malformed classpath entry {:?}: {} is not a directory",
                    source.label(),
                    root.display()
                );
            }
        }
        Ok(())
    }

    pub fn classpath_len(&self) -> usize {
        self.classpath.read().len()
    }

    pub fn game_archive_label(&self) -> Option<String> {
        self.classpath
            .read()
            .game_archive_label()
            .map(str::to_string)
    }

    /// Whether `name` has been resolved through this delegate.
    pub fn is_class_loaded(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    /// Resolve a class to its cached record, loading and transforming it on
    /// first access. A name, once resolved, is pinned to its original origin
    /// for the process lifetime.
    pub fn resolve(&self, name: &str) -> Result<Arc<ClassRecord>> {
        if is_loader_internal(name) {
            bail!(
                "isolation violation: {:?} is loader-internal and must not be resolved \
                 through the game loading context",
                name
            );
        }

        self.cache.get_or_load(name, || self.load_record(name))
    }

    fn load_record(&self, name: &str) -> Result<ClassRecord> {
        let mapper = self.mapper.read();
        let mapped_name = if self.obfuscated {
            mapper.map_class(name).to_string()
        } else {
            name.to_string()
        };
        drop(mapper);

        let resource = class_resource_path(&mapped_name);
        let classpath = self.classpath.read();
        let source = classpath
            .find(&resource)
            .ok_or_else(|| anyhow!("class {:?} not found on any classpath entry", name))?;

        let raw = source
            .read(&resource)?
            .ok_or_else(|| anyhow!("class {:?} vanished from source {:?}", name, source.label()))?;
        let manifest = source.manifest()?;
        let origin = source.label().to_string();
        drop(classpath);

        let transformed = self.chain.read().apply(name, raw.clone());

        Ok(ClassRecord {
            name: name.to_string(),
            mapped_name,
            origin,
            raw,
            transformed,
            manifest,
        })
    }

    /// Class bytes with or without the transformer chain applied.
    ///
    /// `run_transformers = false` reads straight from the classpath without
    /// touching the cache; the transformation bootstrap itself uses this to
    /// get untransformed input without re-entering the chain.
    pub fn class_bytes(&self, name: &str, run_transformers: bool) -> Result<Vec<u8>> {
        if run_transformers {
            return Ok(self.resolve(name)?.transformed.clone());
        }

        if is_loader_internal(name) {
            bail!(
                "isolation violation: {:?} is loader-internal and must not be resolved \
                 through the game loading context",
                name
            );
        }

        let mapper = self.mapper.read();
        let mapped_name = if self.obfuscated {
            mapper.map_class(name).to_string()
        } else {
            name.to_string()
        };
        drop(mapper);

        let resource = class_resource_path(&mapped_name);
        let classpath = self.classpath.read();
        let source = classpath
            .find(&resource)
            .ok_or_else(|| anyhow!("class {:?} not found on any classpath entry", name))?;
        source
            .read(&resource)?
            .ok_or_else(|| anyhow!("class {:?} vanished from source {:?}", name, source.label()))
    }

    /// Read a non-class resource by path, first match wins. Absence is an
    /// explicit `Ok(None)`.
    pub fn open_resource(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let classpath = self.classpath.read();
        match classpath.find(name) {
            Some(source) => source.read(name),
            None => Ok(None),
        }
    }

    /// Manifest of a classpath entry by label, if that entry carries one.
    pub fn manifest(&self, origin: &str) -> Result<Option<ArchiveManifest>> {
        let classpath = self.classpath.read();
        let found = classpath.iter().find(|s| s.label() == origin);
        match found {
            Some(source) => source.manifest(),
            None => Ok(None),
        }
    }
}
