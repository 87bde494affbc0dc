use super::device::DeviceId;
use super::source::{FrameSource, SourceSettings};
use crate::error::CameraError;
use crate::frame::Frame;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How long opening waits for the pipeline to settle
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// V4L2 camera captured through a GStreamer MJPEG pipeline.
///
/// The appsink keeps at most one sample and drops older ones, so a lagging
/// reader always gets the newest frame.
pub struct CameraSource {
    device: String,
    resolution: (u32, u32),
    pipeline: Pipeline,
    appsink: AppSink,
    read_timeout: Duration,
    frame_counter: AtomicU64,
}

impl CameraSource {
    /// Open and start the device. Fails if the pipeline cannot reach Playing.
    pub fn open(device: &DeviceId, settings: &SourceSettings) -> Result<Self, CameraError> {
        let device_name = device.to_string();
        let path = device.device_path().ok_or_else(|| CameraError::DeviceOpen {
            device: device_name.clone(),
            details: "not a hardware device".to_string(),
        })?;

        gstreamer::init().map_err(|e| CameraError::Pipeline {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = build_pipeline_string(
            &path.to_string_lossy(),
            settings.width,
            settings.height,
        );
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::DeviceOpen {
                device: device_name.clone(),
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Pipeline {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Pipeline {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Pipeline {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::DeviceOpen {
                device: device_name,
                details: format!("Failed to start pipeline: {}", e),
            });
        }

        let (result, current, _pending) = pipeline.state(gstreamer::ClockTime::from_mseconds(
            OPEN_TIMEOUT.as_millis() as u64,
        ));
        if let Err(e) = result {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::DeviceOpen {
                device: device_name,
                details: format!("Pipeline did not start: {}", e),
            });
        }
        debug!("Pipeline for {} is {:?}", device_name, current);

        info!(
            "Camera {} opened: {}x{} MJPEG",
            device_name, settings.width, settings.height
        );

        Ok(Self {
            device: device_name,
            resolution: (settings.width, settings.height),
            pipeline,
            appsink,
            read_timeout: settings.read_timeout,
            frame_counter: AtomicU64::new(0),
        })
    }
}

impl FrameSource for CameraSource {
    fn read_frame(&self) -> Result<Frame, CameraError> {
        let timeout_ms = self.read_timeout.as_millis() as u64;
        let sample = self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout_ms))
            .ok_or(CameraError::ReadTimeout { timeout_ms })?;

        let buffer = sample.buffer().ok_or_else(|| CameraError::Pipeline {
            details: "No buffer in sample".to_string(),
        })?;

        let map = buffer.map_readable().map_err(|e| CameraError::Pipeline {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Captured MJPEG sample {} from {} ({} bytes)",
            frame_id,
            self.device,
            map.len()
        );

        Frame::from_mjpeg(frame_id, map.as_slice())
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop pipeline for {}: {}", self.device, e);
        }
    }
}

/// Pipeline requesting MJPEG at a fixed size with single-frame buffering
pub(crate) fn build_pipeline_string(device_path: &str, width: u32, height: u32) -> String {
    format!(
        "v4l2src device=\"{}\" io-mode=mmap do-timestamp=true ! \
         image/jpeg,width={},height={} ! \
         appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false enable-last-sample=false",
        device_path, width, height
    )
}
