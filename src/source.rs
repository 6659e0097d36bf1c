//! Class sources: a virtual filesystem of named byte blobs.
//!
//! A source maps resource names (`com/example/Mod.class`, `assets/...`) to
//! bytes. Two backings exist: an extracted archive on disk, and an in-memory
//! map used by mods that inject generated classes and by tests. Sources never
//! transform bytes; they only read them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Archive-level metadata, the analogue of a jar manifest.
///
/// Read lazily from a `manifest.json` blob at the root of a source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveManifest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Resource path for a fully-qualified class name.
pub fn class_resource_path(class_name: &str) -> String {
    let mut path = class_name.replace('.', "/");
    path.push_str(".class");
    path
}

/// One entry in the classpath: a labeled blob store.
#[derive(Debug, Clone)]
pub enum ClassSource {
    /// An extracted game or mod archive rooted at a directory.
    Directory { label: String, root: PathBuf },
    /// In-memory blobs, keyed by resource path.
    Memory {
        label: String,
        entries: HashMap<String, Vec<u8>>,
    },
}

impl ClassSource {
    pub fn directory(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        ClassSource::Directory {
            label: label.into(),
            root: root.into(),
        }
    }

    pub fn memory(label: impl Into<String>, entries: HashMap<String, Vec<u8>>) -> Self {
        ClassSource::Memory {
            label: label.into(),
            entries,
        }
    }

    /// Stable identifier used for origin pinning and duplicate detection.
    pub fn label(&self) -> &str {
        match self {
            ClassSource::Directory { label, .. } => label,
            ClassSource::Memory { label, .. } => label,
        }
    }

    /// The on-disk root, when the source is directory-backed.
    pub fn root(&self) -> Option<&Path> {
        match self {
            ClassSource::Directory { root, .. } => Some(root.as_path()),
            ClassSource::Memory { .. } => None,
        }
    }

    /// Read a resource by path. Absence is an explicit `Ok(None)`, never an
    /// error: callers implement optional-resource semantics on top of this.
    pub fn read(&self, resource: &str) -> Result<Option<Vec<u8>>> {
        match self {
            ClassSource::Directory { root, .. } => {
                let path = root.join(resource);
                if !path.is_file() {
                    return Ok(None);
                }
                let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
                Ok(Some(bytes))
            }
            ClassSource::Memory { entries, .. } => Ok(entries.get(resource).cloned()),
        }
    }

    pub fn contains(&self, resource: &str) -> bool {
        match self {
            ClassSource::Directory { root, .. } => root.join(resource).is_file(),
            ClassSource::Memory { entries, .. } => entries.contains_key(resource),
        }
    }

    /// Parse the source's manifest, if it carries one.
    pub fn manifest(&self) -> Result<Option<ArchiveManifest>> {
        let Some(bytes) = self.read("manifest.json")? else {
            return Ok(None);
        };
        let manifest: ArchiveManifest = serde_json::from_slice(&bytes)
            .with_context(|| format!("malformed manifest in source {:?}", self.label()))?;
        Ok(Some(manifest))
    }
}
