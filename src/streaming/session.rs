use super::server::CameraChannel;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Log streaming throughput every this many frames
const STATS_LOG_INTERVAL: u64 = 100;

/// One client connection to a camera route.
///
/// Holds only a reference to the camera it views. Dropping the session
/// (client disconnect or write failure) logs its totals.
pub struct StreamSession {
    id: Uuid,
    camera: Arc<CameraChannel>,
    opened_at: Instant,
    frames_streamed: u64,
    bytes_streamed: u64,
    frames_skipped: u64,
}

impl StreamSession {
    pub fn open(camera: Arc<CameraChannel>) -> Self {
        let viewers = camera.viewers.fetch_add(1, Ordering::Relaxed) + 1;
        let id = Uuid::new_v4();
        info!(
            "Stream client {} connected to {} ({} active)",
            id, camera.id, viewers
        );

        Self {
            id,
            camera,
            opened_at: Instant::now(),
            frames_streamed: 0,
            bytes_streamed: 0,
            frames_skipped: 0,
        }
    }

    pub fn record_chunk(&mut self, size: usize) {
        self.frames_streamed += 1;
        self.bytes_streamed += size as u64;

        if self.frames_streamed % STATS_LOG_INTERVAL == 0 {
            let elapsed = self.opened_at.elapsed().as_secs_f64();
            let fps = self.frames_streamed as f64 / elapsed;
            let mbps = (self.bytes_streamed as f64 / elapsed) / 1_048_576.0;

            debug!(
                "Stream {} on {}: {} frames, {:.1} FPS, {:.2} MB/s, {} skipped",
                self.id, self.camera.id, self.frames_streamed, fps, mbps, self.frames_skipped
            );
        }
    }

    pub fn record_skip(&mut self) {
        self.frames_skipped += 1;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let remaining = self.camera.viewers.fetch_sub(1, Ordering::Relaxed) - 1;
        info!(
            "Stream client {} disconnected from {} after {:.1}s: {} frames, {:.1} MB, {} skipped ({} active)",
            self.id,
            self.camera.id,
            self.opened_at.elapsed().as_secs_f64(),
            self.frames_streamed,
            self.bytes_streamed as f64 / 1_048_576.0,
            self.frames_skipped,
            remaining
        );
    }
}
