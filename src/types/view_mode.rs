//! Output selector for completed cycles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which decoder consumes a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Left color camera, scaled to the display width
    Color,
    /// Contrast-enhanced depth at sensor resolution
    #[default]
    Depth,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Color => "color",
            ViewMode::Depth => "depth",
        }
    }

    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Color => ViewMode::Depth,
            ViewMode::Depth => ViewMode::Color,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" | "rgb" => Ok(ViewMode::Color),
            "depth" => Ok(ViewMode::Depth),
            other => Err(format!("unknown view mode '{other}' (expected 'color' or 'depth')")),
        }
    }
}
