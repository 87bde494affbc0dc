use super::device::DeviceId;
use super::pattern::TestPatternSource;
use crate::error::CameraError;
use crate::frame::Frame;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A capture device producing frames on demand.
///
/// Sources are shared by every stream session of a camera. Implementations
/// must tolerate concurrent `read_frame` calls without an external lock,
/// and a single failed read must never poison later reads.
pub trait FrameSource: Send + Sync {
    /// Read the newest available frame, or report a transient failure
    fn read_frame(&self) -> Result<Frame, CameraError>;

    /// Configured (width, height)
    fn resolution(&self) -> (u32, u32);
}

/// Settings applied to every opened source
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub width: u32,
    pub height: u32,
    pub read_timeout: Duration,
}

/// Open the source named by `device`
pub fn open_source(
    device: &DeviceId,
    settings: &SourceSettings,
) -> Result<Arc<dyn FrameSource>, CameraError> {
    info!(
        "Opening camera device {} ({}x{})",
        device, settings.width, settings.height
    );

    match device {
        DeviceId::Pattern { fps } => Ok(Arc::new(TestPatternSource::new(
            settings.width,
            settings.height,
            *fps,
        ))),
        DeviceId::Index(_) | DeviceId::Path(_) => open_hardware(device, settings),
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn open_hardware(
    device: &DeviceId,
    settings: &SourceSettings,
) -> Result<Arc<dyn FrameSource>, CameraError> {
    let source = super::gst::CameraSource::open(device, settings)?;
    Ok(Arc::new(source))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn open_hardware(
    device: &DeviceId,
    _settings: &SourceSettings,
) -> Result<Arc<dyn FrameSource>, CameraError> {
    tracing::warn!(
        "Cannot open {}: built without the `camera` feature or not on Linux",
        device
    );
    Err(CameraError::NotAvailable)
}
