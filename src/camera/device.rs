use crate::error::StreamerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Frame rate used by `pattern` devices without an explicit rate
pub const DEFAULT_PATTERN_FPS: u32 = 30;

/// Identifier of a capture device as given on the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceId {
    /// Enumerated V4L2 index, e.g. `0` for `/dev/video0`
    Index(u32),
    /// Explicit device node
    Path(PathBuf),
    /// Synthetic counter-pattern source, no hardware required
    Pattern { fps: u32 },
}

impl DeviceId {
    /// Device node backing this identifier, if it is a hardware device
    pub fn device_path(&self) -> Option<PathBuf> {
        match self {
            DeviceId::Index(index) => Some(PathBuf::from(format!("/dev/video{}", index))),
            DeviceId::Path(path) => Some(path.clone()),
            DeviceId::Pattern { .. } => None,
        }
    }
}

impl FromStr for DeviceId {
    type Err = StreamerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StreamerError::config("Camera device identifier is empty"));
        }

        if s.chars().all(|c| c.is_ascii_digit()) {
            return s.parse::<u32>().map(DeviceId::Index).map_err(|e| {
                StreamerError::config(format!("Invalid camera index '{}': {}", s, e))
            });
        }

        if s == "pattern" {
            return Ok(DeviceId::Pattern {
                fps: DEFAULT_PATTERN_FPS,
            });
        }

        if let Some(rate) = s.strip_prefix("pattern:") {
            let fps = rate.parse::<u32>().ok().filter(|fps| *fps > 0).ok_or_else(|| {
                StreamerError::config(format!("Invalid pattern frame rate '{}'", rate))
            })?;
            return Ok(DeviceId::Pattern { fps });
        }

        Ok(DeviceId::Path(PathBuf::from(s)))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Index(index) => write!(f, "{}", index),
            DeviceId::Path(path) => write!(f, "{}", path.display()),
            DeviceId::Pattern { fps } => write!(f, "pattern:{}", fps),
        }
    }
}
