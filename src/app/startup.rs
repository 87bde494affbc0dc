use crate::annotate::FrameAnnotator;
use crate::camera::{DeviceId, FrameSource, SourceSettings};
use crate::config::StreamerConfig;
use crate::error::{CameraError, Result, StreamerError};
use crate::overlay::RateOverlay;
use crate::streaming::{CameraChannel, StreamServer, StreamServerBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Opens one capture device; `camera::open_source` in production
pub trait SourceOpener {
    fn open(
        &mut self,
        device: &DeviceId,
        settings: &SourceSettings,
    ) -> std::result::Result<Arc<dyn FrameSource>, CameraError>;
}

impl<F> SourceOpener for F
where
    F: FnMut(&DeviceId, &SourceSettings) -> std::result::Result<Arc<dyn FrameSource>, CameraError>,
{
    fn open(
        &mut self,
        device: &DeviceId,
        settings: &SourceSettings,
    ) -> std::result::Result<Arc<dyn FrameSource>, CameraError> {
        self(device, settings)
    }
}

pub(crate) fn source_settings(config: &StreamerConfig) -> SourceSettings {
    SourceSettings {
        width: config.capture.resolution.0,
        height: config.capture.resolution.1,
        read_timeout: Duration::from_millis(config.capture.read_timeout_ms),
    }
}

/// Open every configured camera in order. The first failure aborts startup
/// and names the camera index and device that failed.
pub fn open_cameras(
    config: &StreamerConfig,
    opener: &mut impl SourceOpener,
) -> Result<Vec<CameraChannel>> {
    let settings = source_settings(config);
    let mut channels = Vec::with_capacity(config.cameras.len());

    for (index, camera) in config.cameras.iter().enumerate() {
        let device: DeviceId = camera.device.parse()?;

        let source = opener.open(&device, &settings).map_err(|source| {
            error!("Cannot open camera {} ({}): {}", index, camera.device, source);
            StreamerError::CameraOpen {
                camera: index,
                device: camera.device.clone(),
                source,
            }
        })?;

        info!("Camera {} ({}) opened as /{}", index, camera.device, camera.id);
        channels.push(CameraChannel::new(
            camera.id.clone(),
            source,
            config.capture.fps_window,
        ));
    }

    Ok(channels)
}

/// Validate the config, open every camera and assemble the server.
/// Nothing is bound until all cameras are open.
pub fn build_server(
    config: &StreamerConfig,
    annotator: Arc<dyn FrameAnnotator>,
    opener: &mut impl SourceOpener,
) -> Result<StreamServer> {
    config.validate()?;

    let cameras = open_cameras(config, opener)?;
    let overlay = RateOverlay::from_config(&config.overlay);

    cameras
        .into_iter()
        .fold(StreamServerBuilder::new(), |builder, camera| builder.camera(camera))
        .config(config.stream.clone())
        .annotator(annotator)
        .overlay(overlay)
        .build()
}
