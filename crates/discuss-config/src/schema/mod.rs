//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod realtime;
mod topics;

pub use logging::*;
pub use realtime::*;
pub use topics::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiscussConfig {
    pub realtime: RealtimeConfig,
    pub topics: TopicsConfig,
    pub logging: LoggingConfig,
}
