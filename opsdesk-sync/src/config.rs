// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration of the relationship synchronizer.
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default capacity of the audit event channel.
pub const DEFAULT_AUDIT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for the mutating phase of an operation. When it is exceeded the transaction
    /// is rolled back and the operation fails as cancelled. `None` waits forever.
    pub operation_timeout: Option<Duration>,

    /// Number of audit events buffered for slow subscribers before the oldest ones get dropped.
    pub audit_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            operation_timeout: None,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}
