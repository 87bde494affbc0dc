mod device;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod gst;
mod pattern;
mod source;

pub use device::{DeviceId, DEFAULT_PATTERN_FPS};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gst::CameraSource;
pub use pattern::TestPatternSource;
pub use source::{open_source, FrameSource, SourceSettings};
