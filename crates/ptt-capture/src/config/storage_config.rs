use serde::{Deserialize, Serialize};

use std::path::PathBuf;

/// Where clips are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Scratch directory for clip files. Created on demand.
    pub scratch_dir: PathBuf,
}
