use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::env::Environment;

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum Side {
    Client,
    Server,
}

impl From<Side> for Environment {
    fn from(side: Side) -> Self {
        match side {
            Side::Client => Environment::Client,
            Side::Server => Environment::Server,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Which side to bootstrap. Falls back to GANTRY_SIDE when omitted.
    #[arg(long, value_enum)]
    pub side: Option<Side>,

    /// Enable development mode (named namespace, no remapping). Takes an
    /// optional value, so `--dev false` overrides GANTRY_DEV=true.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub dev: Option<bool>,

    /// Explicit game archive directory. Falls back to GANTRY_GAME_ARCHIVE.
    #[arg(long, value_name = "DIR")]
    pub game_archive: Option<PathBuf>,

    /// Force the compatibility loading strategy regardless of what the
    /// discovered game requires. Takes an optional value like `--dev`.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub compat_loader: Option<bool>,

    /// Inherited classpath string used for load-time dependency scanning.
    /// Falls back to the CLASSPATH variable.
    #[arg(long, value_name = "PATHLIST")]
    pub classpath: Option<String>,

    /// Arguments passed through to the game untouched.
    #[arg(trailing_var_arg = true)]
    pub game_args: Vec<String>,
}
