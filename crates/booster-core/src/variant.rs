//! Device family and the enumeration strategy it implies.
//!
//! Only snapshot providers consult this table. The policy engine sees the
//! resulting snapshot and its `restricted_enumeration` flag, nothing else.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First SDK level with usage-stats queries (Android 5.1).
pub const USAGE_STATS_MIN_SDK: u32 = 22;

/// First SDK level where the process table reports foreground importance
/// reliably (Android 10).
pub const RELIABLE_FOREGROUND_MIN_SDK: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManufacturerVariant {
    Xiaomi,
    Samsung,
    #[default]
    Generic,
}

impl ManufacturerVariant {
    /// Case-insensitive; unknown manufacturers fall back to `Generic`.
    pub fn from_manufacturer(manufacturer: &str) -> Self {
        match manufacturer.trim().to_ascii_lowercase().as_str() {
            "xiaomi" => ManufacturerVariant::Xiaomi,
            "samsung" => ManufacturerVariant::Samsung,
            _ => ManufacturerVariant::Generic,
        }
    }

    /// OEM builds that hide the running process table from third-party apps.
    pub fn restricts_process_table(&self) -> bool {
        matches!(self, ManufacturerVariant::Xiaomi | ManufacturerVariant::Samsung)
    }
}

impl fmt::Display for ManufacturerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManufacturerVariant::Xiaomi => write!(f, "xiaomi"),
            ManufacturerVariant::Samsung => write!(f, "samsung"),
            ManufacturerVariant::Generic => write!(f, "generic"),
        }
    }
}

/// How the upstream provider enumerates candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationStrategy {
    /// Running process list with real pids.
    ProcessTable,
    /// Recently used packages; no pid available, handle is 0.
    UsageHistory,
    /// Own task stack; handle is a task id.
    TaskStack,
}

impl EnumerationStrategy {
    /// Handles from this strategy are not real pids.
    pub fn restricted_enumeration(&self) -> bool {
        !matches!(self, EnumerationStrategy::ProcessTable)
    }
}

/// Strategy selection table.
pub fn strategy_for(variant: ManufacturerVariant, sdk_level: u32) -> EnumerationStrategy {
    match (variant.restricts_process_table(), sdk_level >= USAGE_STATS_MIN_SDK) {
        (true, true) => EnumerationStrategy::UsageHistory,
        (true, false) => EnumerationStrategy::TaskStack,
        (false, _) => EnumerationStrategy::ProcessTable,
    }
}

/// Whether the provider must normalize the foreground flag itself because
/// the platform does not report it reliably at this SDK level.
pub fn needs_foreground_normalization(strategy: EnumerationStrategy, sdk_level: u32) -> bool {
    match strategy {
        EnumerationStrategy::ProcessTable => sdk_level < RELIABLE_FOREGROUND_MIN_SDK,
        EnumerationStrategy::UsageHistory | EnumerationStrategy::TaskStack => true,
    }
}
