//! gantry: bootstrap orchestrator for a modular game runtime.
//!
//! Before the host game starts, gantry discovers which game variant is
//! present, constructs an isolated reconfigurable code-loading context,
//! applies a deterministic sequence of name and bytecode transformations to
//! classes as they are first resolved, and hands control to the game only
//! after all registered pre-launch hooks have run in order.
//!
//! ## Key components
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bootstrap`] | The 13-step startup sequence and the launch handle |
//! | [`delegate`] | Class resolution, transformation, and caching core |
//! | [`strategy`] | Exclusive vs. compatibility loading strategies |
//! | [`provider`] | Game provider contract and candidate discovery |
//! | [`transform`] | Ordered transformer chain with a lock protocol |
//! | [`cache`] | Per-class record store with at-most-once transformation |
//! | [`namespace`] | Named/intermediary class-name mapping |
//! | [`services`] | Contracts for external collaborators |

pub mod args;
pub mod bootstrap;
pub mod cache;
pub mod classpath;
pub mod delegate;
pub mod env;
pub mod namespace;
pub mod provider;
pub mod services;
pub mod source;
pub mod strategy;
pub mod transform;

pub use bootstrap::{BootstrapConfig, LaunchHandle, Orchestrator};
pub use delegate::LoadingDelegate;
pub use env::{Environment, Namespace};
pub use provider::{GameCandidate, GameProvider};
pub use strategy::LoadingContext;
