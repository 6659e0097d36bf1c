//! Execution environment, namespaces, and the process configuration surface.
//!
//! Everything here is decided exactly once during bootstrap and is immutable
//! afterward. The configuration keys mirror the launcher's documented
//! environment-variable surface; explicit CLI parameters always win over
//! variables.

use std::str::FromStr;

use anyhow::{bail, Result};

/// Environment variable selecting the side when no explicit side is given.
pub const SIDE_VAR: &str = "GANTRY_SIDE";
/// Environment variable enabling development mode (`true`/`false`).
pub const DEVELOPMENT_VAR: &str = "GANTRY_DEV";
/// Environment variable overriding the game archive path.
pub const GAME_ARCHIVE_VAR: &str = "GANTRY_GAME_ARCHIVE";
/// Environment variable forcing the compatibility loading strategy.
pub const COMPAT_LOADER_VAR: &str = "GANTRY_COMPAT_LOADER";

/// Which side of the game this process bootstraps.
///
/// Chosen once from explicit configuration or a command argument and required
/// before any loading decision can be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Client,
    Server,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Client => "client",
            Environment::Server => "server",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Environment::Client),
            "server" => Ok(Environment::Server),
            other => bail!("invalid side {:?}: must be \"client\" or \"server\"", other),
        }
    }
}

/// Naming convention under which class and member names are expressed.
///
/// `Named` is the development-friendly namespace; `Intermediary` is the
/// runtime/obfuscated namespace. A single process-wide value, derived from
/// the development flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Named,
    Intermediary,
}

impl Namespace {
    /// Namespace for the given development mode.
    pub fn for_development(development: bool) -> Self {
        if development {
            Namespace::Named
        } else {
            Namespace::Intermediary
        }
    }

    /// Identifier consumed by the external remapping service.
    pub fn id(&self) -> &'static str {
        match self {
            Namespace::Named => "named",
            Namespace::Intermediary => "intermediary",
        }
    }
}

/// Read an environment variable, treating unset and whitespace-only as absent.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a boolean environment variable; anything other than `true` is false.
pub fn env_flag(key: &str) -> bool {
    env_var(key)
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
