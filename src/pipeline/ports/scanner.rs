//! Security gate port.

use crate::pipeline::domain::SecurityReport;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Scans a filesystem root for credential-shaped content.
#[async_trait]
pub trait SecretScanner: Send + Sync {
    /// Scans every file below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when the tree cannot be read.
    async fn scan(&self, root: &Path) -> Result<SecurityReport, ScanError>;
}

/// Errors returned by scanners.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// The root does not exist or is not a directory.
    #[error("scan root is not a directory: {0}")]
    InvalidRoot(String),

    /// A detection pattern failed to compile.
    #[error("invalid detection pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// I/O failure while walking the tree.
    #[error("scan failed: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl ScanError {
    /// Wraps an I/O error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
