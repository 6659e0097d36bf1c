//! The transformer chain: ordered, named byte-to-byte class transformations.
//!
//! Stages are registered during bootstrap and the chain is locked before any
//! class is resolved through it, so transformation results are reproducible
//! for a given chain configuration. Registration after the lock is an error.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

/// A single transformation stage: `(class name, bytes) -> bytes`.
pub type TransformFn = dyn Fn(&str, Vec<u8>) -> Vec<u8> + Send + Sync;

/// Mutable chain builder, owned by the delegate but populated by external
/// registration calls during bootstrap.
#[derive(Default)]
pub struct TransformerChain {
    stages: Vec<(String, Arc<TransformFn>)>,
    locked: bool,
}

impl TransformerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named stage at the end of the chain.
    pub fn register<F>(&mut self, name: impl Into<String>, stage: F) -> Result<()>
    where
        F: Fn(&str, Vec<u8>) -> Vec<u8> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.locked {
            bail!("transformer chain is locked, cannot register stage {:?}", name);
        }
        debug!(stage = %name, position = self.stages.len(), "registering transformer stage");
        self.stages.push((name, Arc::new(stage)));
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Lock the chain and materialize it into an immutable, shareable form.
    ///
    /// Idempotent: locking twice yields chains with identical stages.
    pub fn lock(&mut self) -> LockedChain {
        self.locked = true;
        LockedChain {
            stages: Arc::new(self.stages.clone()),
        }
    }
}

/// Immutable transformer chain as seen by the loading delegate.
#[derive(Clone)]
pub struct LockedChain {
    stages: Arc<Vec<(String, Arc<TransformFn>)>>,
}

impl LockedChain {
    /// An empty chain, used before transformer initialization completes.
    pub fn empty() -> Self {
        Self {
            stages: Arc::new(Vec::new()),
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Run every stage in registration order over the class bytes.
    pub fn apply(&self, class_name: &str, bytes: Vec<u8>) -> Vec<u8> {
        let mut current = bytes;
        for (name, stage) in self.stages.iter() {
            debug!(class = %class_name, stage = %name, "applying transformer stage");
            current = stage(class_name, current);
        }
        current
    }
}
