//! Isolated execution of untrusted, repository-supplied commands.
//!
//! The sandbox runs a single shell command inside a disposable,
//! resource-bounded environment with a hard wall-clock timeout. Every
//! environment it creates is reclaimed before the call returns, whether the
//! command exited, failed to start, or timed out. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The execution service in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
