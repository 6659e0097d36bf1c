//! Class-name mapping between the named and intermediary namespaces.
//!
//! The mapper is a pure function of `(name, active namespace)`: identity in
//! the named (development) namespace, table lookup otherwise. The table is
//! supplied by the external deobfuscation service; the mapper never mutates
//! it after construction.

use std::collections::HashMap;

use crate::env::Namespace;

/// Deterministic, side-effect-free class-name mapper.
#[derive(Debug, Clone)]
pub struct NamespaceMapper {
    namespace: Namespace,
    /// named name -> intermediary name
    table: HashMap<String, String>,
}

impl NamespaceMapper {
    /// Identity mapper for the named (development) namespace.
    pub fn identity() -> Self {
        Self {
            namespace: Namespace::Named,
            table: HashMap::new(),
        }
    }

    /// Mapper for the intermediary namespace backed by a remapping table.
    pub fn with_table(table: HashMap<String, String>) -> Self {
        Self {
            namespace: Namespace::Intermediary,
            table,
        }
    }

    /// The active namespace identifier, e.g. passed to the remapping service.
    pub fn target_namespace(&self) -> &'static str {
        self.namespace.id()
    }

    /// Map a class name into the active namespace.
    ///
    /// Unknown names map to themselves: classes added by mods are never in
    /// the game's remapping table and must still resolve.
    pub fn map_class<'a>(&'a self, name: &'a str) -> &'a str {
        match self.namespace {
            Namespace::Named => name,
            Namespace::Intermediary => self.table.get(name).map(String::as_str).unwrap_or(name),
        }
    }
}
