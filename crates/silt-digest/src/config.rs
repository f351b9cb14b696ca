//! Digest layer configuration.

use std::path::PathBuf;

use crate::digester::RetryPolicy;

/// Configuration for the derived store and digester.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// Open the derived store read-only; all mutating calls fail locally.
    pub readonly: bool,
    /// Retry policy for failing blocks.
    pub retry: RetryPolicy,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./silt"),
            readonly: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl DigestConfig {
    /// Path to the derived store database.
    pub fn digest_path(&self) -> PathBuf {
        self.data_dir.join("digest")
    }

    /// Path to the primary ledger archive.
    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join("archive")
    }
}
