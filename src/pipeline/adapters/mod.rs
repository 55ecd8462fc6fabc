//! Adapter implementations for the orchestration engine ports.

pub mod agents;
pub mod memory;
mod scanner;

pub use scanner::PatternSecretScanner;
