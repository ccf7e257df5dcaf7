//! Delivery rate control for rendered frame subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants to see rendered frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every rendered frame as it is produced
    Native,

    /// At most this many frames per second, latest wins.
    /// `Max(0)` is treated as `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Sampling interval, or `None` when no rate limiting is needed.
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }

    /// Whether sampling at this rate skips frames from a source producing `source_fps`.
    pub fn is_limiting(self, source_fps: f64) -> bool {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => false,
            UpdateRate::Max(hz) => (hz as f64) < source_fps,
        }
    }
}
