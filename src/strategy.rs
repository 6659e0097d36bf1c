//! Loading strategies and the uniform context wrapper around them.
//!
//! Two strategies back dynamic code loading. The exclusive strategy owns the
//! full class namespace and may rewrite any class, including ones normally
//! supplied by the platform. The compatibility strategy defers
//! platform-reserved names to a narrower platform-provided source and never
//! rewrites them; it is chosen only when the discovered game demands it or an
//! explicit override is set. Everything downstream of selection sees only
//! [`LoadingContext`], so the orchestrator is strategy-independent.

use std::cell::RefCell;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::delegate::LoadingDelegate;
use crate::source::ClassSource;

/// Class-name prefixes the compatibility strategy leaves to the platform.
const PLATFORM_RESERVED_PREFIXES: &[&str] = &["platform.", "runtime.internal."];

/// Uniform interface over the two classloading strategies.
///
/// Exactly two implementors exist, selected once at startup; no further
/// variants are added at runtime.
pub trait LoadingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The addURL equivalent: append a classpath entry.
    fn add_entry(&self, source: ClassSource) -> Result<bool>;

    fn is_class_loaded(&self, name: &str) -> bool;

    /// Class bytes, optionally with the transformer chain applied.
    fn class_bytes(&self, name: &str, run_transformers: bool) -> Result<Vec<u8>>;

    /// The getResourceAsStream equivalent: explicit absence, never an abort.
    fn open_resource(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Access to the shared resolution core.
    fn delegate(&self) -> &LoadingDelegate;
}

/// Strategy owning a private namespace: every name goes through the delegate.
pub struct ExclusiveStrategy {
    delegate: Arc<LoadingDelegate>,
}

impl ExclusiveStrategy {
    pub fn new(delegate: Arc<LoadingDelegate>) -> Self {
        Self { delegate }
    }
}

impl LoadingStrategy for ExclusiveStrategy {
    fn name(&self) -> &'static str {
        "exclusive"
    }

    fn add_entry(&self, source: ClassSource) -> Result<bool> {
        self.delegate.add_classpath_entry(source)
    }

    fn is_class_loaded(&self, name: &str) -> bool {
        self.delegate.is_class_loaded(name)
    }

    fn class_bytes(&self, name: &str, run_transformers: bool) -> Result<Vec<u8>> {
        self.delegate.class_bytes(name, run_transformers)
    }

    fn open_resource(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.delegate.open_resource(name)
    }

    fn delegate(&self) -> &LoadingDelegate {
        &self.delegate
    }
}

/// Strategy for hosts that force a platform loader: reserved names are served
/// from the platform source untransformed, everything else delegates.
pub struct CompatibilityStrategy {
    delegate: Arc<LoadingDelegate>,
    platform: ClassSource,
}

impl CompatibilityStrategy {
    pub fn new(delegate: Arc<LoadingDelegate>, platform: ClassSource) -> Self {
        Self { delegate, platform }
    }

    fn is_platform_reserved(name: &str) -> bool {
        PLATFORM_RESERVED_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
    }
}

impl LoadingStrategy for CompatibilityStrategy {
    fn name(&self) -> &'static str {
        "compatibility"
    }

    fn add_entry(&self, source: ClassSource) -> Result<bool> {
        self.delegate.add_classpath_entry(source)
    }

    fn is_class_loaded(&self, name: &str) -> bool {
        if Self::is_platform_reserved(name) {
            return self
                .platform
                .contains(&crate::source::class_resource_path(name));
        }
        self.delegate.is_class_loaded(name)
    }

    fn class_bytes(&self, name: &str, run_transformers: bool) -> Result<Vec<u8>> {
        if Self::is_platform_reserved(name) {
            // Platform classes are never rewritten under this strategy.
            let resource = crate::source::class_resource_path(name);
            return self.platform.read(&resource)?.ok_or_else(|| {
                anyhow::anyhow!("platform class {:?} not found in platform source", name)
            });
        }
        self.delegate.class_bytes(name, run_transformers)
    }

    fn open_resource(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.platform.read(name)? {
            return Ok(Some(bytes));
        }
        self.delegate.open_resource(name)
    }

    fn delegate(&self) -> &LoadingDelegate {
        &self.delegate
    }
}

/// The live loading context handed to the game; cheap to clone.
#[derive(Clone)]
pub struct LoadingContext {
    strategy: Arc<dyn LoadingStrategy>,
}

impl LoadingContext {
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn add_entry(&self, source: ClassSource) -> Result<bool> {
        self.strategy.add_entry(source)
    }

    pub fn is_class_loaded(&self, name: &str) -> bool {
        self.strategy.is_class_loaded(name)
    }

    pub fn class_bytes(&self, name: &str, run_transformers: bool) -> Result<Vec<u8>> {
        self.strategy.class_bytes(name, run_transformers)
    }

    pub fn open_resource(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.strategy.open_resource(name)
    }

    pub fn delegate(&self) -> &LoadingDelegate {
        self.strategy.delegate()
    }

    /// Make this context the current one for the calling thread. From this
    /// point all resolution on the thread goes through the new context.
    pub fn install(&self) {
        debug!(strategy = self.strategy_name(), "switching thread loading context");
        CURRENT_CONTEXT.with(|current| {
            *current.borrow_mut() = Some(self.clone());
        });
    }

    /// The calling thread's current context, if one was installed.
    pub fn current() -> Option<LoadingContext> {
        CURRENT_CONTEXT.with(|current| current.borrow().clone())
    }
}

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<LoadingContext>> = const { RefCell::new(None) };
}

/// Pick the backing strategy for this process.
///
/// Compatibility is used when the game demands a platform loader or the
/// override is set; the choice is wrapped so callers stay agnostic.
pub fn select_strategy(
    delegate: Arc<LoadingDelegate>,
    use_compatibility: bool,
    platform: Option<ClassSource>,
) -> LoadingContext {
    let strategy: Arc<dyn LoadingStrategy> = if use_compatibility {
        let platform = platform
            .unwrap_or_else(|| ClassSource::memory("platform", Default::default()));
        Arc::new(CompatibilityStrategy::new(delegate, platform))
    } else {
        Arc::new(ExclusiveStrategy::new(delegate))
    };
    info!(strategy = strategy.name(), "loading strategy selected");
    LoadingContext { strategy }
}
