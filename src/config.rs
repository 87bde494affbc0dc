use crate::camera::DeviceId;
use crate::error::{Result, StreamerError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamerConfig {
    pub cameras: Vec<CameraConfig>,
    pub capture: CaptureConfig,
    pub overlay: OverlayConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Route and stats identifier (e.g. "cam0")
    pub id: String,

    /// Enumerated index ("0"), device path ("/dev/video2") or "pattern[:fps]"
    pub device: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Frame resolution (width, height), shared by every camera
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),

    /// Upper bound on a single frame read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Number of inter-frame deltas averaged by the rate meter
    #[serde(default = "default_fps_window")]
    pub fps_window: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    /// Path to TrueType font file for the FPS overlay
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// Font size for the FPS overlay
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// IP address to bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_stream_port")]
    pub port: u16,

    /// JPEG quality for streamed frames (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl StreamConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl StreamerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.cameras.is_empty() {
            return Err(StreamerError::config("At least one camera must be configured"));
        }

        let mut seen = HashSet::new();
        for camera in &self.cameras {
            if camera.id.is_empty() || !camera.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(StreamerError::config(format!(
                    "Camera id '{}' must be non-empty ASCII alphanumeric",
                    camera.id
                )));
            }
            if !seen.insert(camera.id.as_str()) {
                return Err(StreamerError::config(format!(
                    "Duplicate camera id '{}'",
                    camera.id
                )));
            }
            if camera.id == "stats" {
                return Err(StreamerError::config("Camera id 'stats' is reserved"));
            }
            camera.device.parse::<DeviceId>()?;
        }

        if self.capture.resolution.0 == 0 || self.capture.resolution.1 == 0 {
            return Err(StreamerError::config(
                "Capture resolution must be greater than 0",
            ));
        }

        if self.capture.read_timeout_ms == 0 {
            return Err(StreamerError::config(
                "Read timeout must be greater than 0",
            ));
        }

        if self.capture.fps_window == 0 {
            return Err(StreamerError::config(
                "FPS averaging window must be greater than 0",
            ));
        }

        if self.overlay.font_size <= 0.0 {
            return Err(StreamerError::config(
                "Overlay font size must be greater than 0",
            ));
        }

        if self.stream.port == 0 {
            return Err(StreamerError::config("Stream port must be greater than 0"));
        }

        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(StreamerError::config(
                "JPEG quality must be between 1 and 100",
            ));
        }

        Ok(())
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            cameras: vec![
                CameraConfig {
                    id: "cam0".to_string(),
                    device: default_cam0_device(),
                },
                CameraConfig {
                    id: "cam1".to_string(),
                    device: default_cam1_device(),
                },
            ],
            capture: CaptureConfig {
                resolution: default_resolution(),
                read_timeout_ms: default_read_timeout_ms(),
                fps_window: default_fps_window(),
            },
            overlay: OverlayConfig {
                font_path: default_font_path(),
                font_size: default_font_size(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                port: default_stream_port(),
                jpeg_quality: default_jpeg_quality(),
            },
        }
    }
}

// Default value functions
pub fn default_cam0_device() -> String {
    "0".to_string()
}
pub fn default_cam1_device() -> String {
    "2".to_string()
}

fn default_resolution() -> (u32, u32) {
    (640, 360)
}
fn default_read_timeout_ms() -> u64 {
    1000
}
fn default_fps_window() -> usize {
    30
}

fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    24.0
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_stream_port() -> u16 {
    8080
}
fn default_jpeg_quality() -> u8 {
    95
}
