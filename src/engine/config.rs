//! Engine configuration options.

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log every admission decision at info instead of debug.
    #[serde(default)]
    pub verbose: bool,
}
