//! The ordered classpath set and load-time dependency introspection.
//!
//! Insertion order is resolution order: first match wins. The game archive
//! entry is tracked so it can be filtered out of any externally-introspected
//! classpath, which would otherwise double-load the game.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::source::ClassSource;

/// Ordered set of class sources with idempotent insertion.
#[derive(Default)]
pub struct ClasspathSet {
    entries: Vec<ClassSource>,
    /// Label of the game archive entry, if one was added.
    game_archive: Option<String>,
}

impl ClasspathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source unless one with the same label is already present.
    ///
    /// Returns whether the set grew. Duplicate additions keep the original
    /// position: resolution order never changes after first insertion.
    pub fn add(&mut self, source: ClassSource) -> bool {
        if self.entries.iter().any(|e| e.label() == source.label()) {
            debug!(entry = %source.label(), "classpath entry already present, skipping");
            return false;
        }
        debug!(entry = %source.label(), position = self.entries.len(), "adding classpath entry");
        self.entries.push(source);
        true
    }

    /// Append the game archive itself, remembering it for introspection
    /// filtering.
    pub fn add_game_archive(&mut self, source: ClassSource) -> bool {
        let label = source.label().to_string();
        let added = self.add(source);
        if added {
            self.game_archive = Some(label);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassSource> {
        self.entries.iter()
    }

    /// First entry containing the resource, in insertion order.
    pub fn find(&self, resource: &str) -> Option<&ClassSource> {
        self.entries.iter().find(|e| e.contains(resource))
    }

    pub fn game_archive_label(&self) -> Option<&str> {
        self.game_archive.as_deref()
    }
}

/// Build the set of load-time dependency paths from an inherited classpath
/// string.
///
/// Wildcard entries are unsupported and dropped with a warning, not a
/// failure; the game archive itself is excluded to avoid double-loading.
pub fn load_time_dependencies(classpath: &str, game_archive: Option<&Path>) -> Vec<PathBuf> {
    let separator = if cfg!(windows) { ';' } else { ':' };
    classpath
        .split(separator)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| {
            if is_wildcard_entry(entry) {
                warn!(
                    entry = %entry,
                    "wildcard classpath entries are not supported, the game may not load properly"
                );
                false
            } else {
                true
            }
        })
        .map(PathBuf::from)
        .filter(|path| game_archive != Some(path.as_path()))
        .collect()
}

fn is_wildcard_entry(entry: &str) -> bool {
    entry == "*" || entry.ends_with(&format!("{}*", std::path::MAIN_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(label: &str) -> ClassSource {
        ClassSource::memory(label, HashMap::new())
    }

    #[test]
    fn duplicate_add_leaves_size_unchanged() {
        let mut set = ClasspathSet::new();
        assert!(set.add(source("mods/a")));
        assert!(!set.add(source("mods/a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn first_match_wins() {
        let mut a = HashMap::new();
        a.insert("x/Y.class".to_string(), vec![1]);
        let mut b = HashMap::new();
        b.insert("x/Y.class".to_string(), vec![2]);

        let mut set = ClasspathSet::new();
        set.add(ClassSource::memory("first", a));
        set.add(ClassSource::memory("second", b));

        let found = set.find("x/Y.class").unwrap();
        assert_eq!(found.label(), "first");
    }

    #[test]
    fn wildcard_entries_are_excluded() {
        let sep = std::path::MAIN_SEPARATOR;
        let classpath = format!("lib/a.jar:*:lib{}*:lib/b.jar", sep);
        let deps = load_time_dependencies(&classpath, None);
        assert_eq!(deps, vec![PathBuf::from("lib/a.jar"), PathBuf::from("lib/b.jar")]);
    }

    #[test]
    fn game_archive_is_excluded_from_dependencies() {
        let deps = load_time_dependencies(
            "lib/a.jar:game/core.jar",
            Some(Path::new("game/core.jar")),
        );
        assert_eq!(deps, vec![PathBuf::from("lib/a.jar")]);
    }
}
