use super::session::StreamSession;
use crate::annotate::{annotate_or_passthrough, FrameAnnotator};
use crate::camera::FrameSource;
use crate::error::{CameraError, StreamError};
use crate::frame::encode_jpeg;
use crate::overlay::RateOverlay;
use crate::rate_meter::RateMeter;
use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, trace};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Content type of every camera stream response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const PART_TRAILER: &[u8] = b"\r\n";

/// Frame one JPEG as a multipart part
pub fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    let mut chunk = BytesMut::with_capacity(PART_HEADER.len() + jpeg.len() + PART_TRAILER.len());
    chunk.put_slice(PART_HEADER);
    chunk.put_slice(jpeg);
    chunk.put_slice(PART_TRAILER);
    chunk.freeze()
}

/// Why an iteration produced no chunk. Both cases are retried immediately.
#[derive(Error, Debug)]
pub enum FrameSkip {
    #[error("capture failed: {0}")]
    Capture(#[from] CameraError),

    #[error("encode failed: {0}")]
    Encode(#[from] StreamError),
}

/// Turns one camera's frames into multipart chunks.
///
/// Each iteration reads, annotates, ticks the rate meter, draws the FPS
/// text and encodes. Sessions share the source and meter; nothing else is
/// shared between them.
#[derive(Clone)]
pub struct StreamEncoder {
    label: String,
    source: Arc<dyn FrameSource>,
    annotator: Arc<dyn FrameAnnotator>,
    meter: Arc<RateMeter>,
    overlay: Arc<RateOverlay>,
    jpeg_quality: u8,
}

impl StreamEncoder {
    pub fn new(
        label: impl Into<String>,
        source: Arc<dyn FrameSource>,
        annotator: Arc<dyn FrameAnnotator>,
        meter: Arc<RateMeter>,
        overlay: Arc<RateOverlay>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            label: label.into(),
            source,
            annotator,
            meter,
            overlay,
            jpeg_quality,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run one iteration of the pipeline. Blocks on the device read.
    pub fn encode_next(&self) -> Result<Bytes, FrameSkip> {
        let frame = self.source.read_frame()?;
        let frame_id = frame.id;
        let mut frame = annotate_or_passthrough(self.annotator.as_ref(), &self.label, frame);

        let rate = self.meter.tick();
        self.overlay.render(&mut frame.image, &self.label, rate);

        let jpeg = encode_jpeg(&frame.image, self.jpeg_quality)?;
        trace!(
            "[{}] encoded frame {} ({} bytes, {:.1} fps)",
            self.label,
            frame_id,
            jpeg.len(),
            rate
        );

        Ok(multipart_chunk(&jpeg))
    }

    /// Endless chunk stream for one client connection.
    ///
    /// Iterations run on the blocking pool. Failed iterations are retried
    /// with no backoff and no cap, so a dead device spins here. The stream
    /// ends only when the response body is dropped, which also drops
    /// `session`.
    pub fn into_stream(
        self: Arc<Self>,
        mut session: StreamSession,
    ) -> impl Stream<Item = Result<Bytes, axum::Error>> + Send + 'static {
        async_stream::stream! {
            loop {
                let encoder = Arc::clone(&self);
                match tokio::task::spawn_blocking(move || encoder.encode_next()).await {
                    Ok(Ok(chunk)) => {
                        session.record_chunk(chunk.len());
                        yield Ok::<_, axum::Error>(chunk);
                    }
                    Ok(Err(skip)) => {
                        session.record_skip();
                        trace!("[{}] skipped frame: {}", self.label, skip);
                    }
                    Err(e) => {
                        error!("[{}] stream worker failed: {}", self.label, e);
                        break;
                    }
                }
            }
        }
    }
}
