use super::source::FrameSource;
use crate::error::CameraError;
use crate::frame::Frame;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Synthetic source emitting a counter pattern at a fixed frame interval
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_interval: Duration,
    next_due: Mutex<Option<Instant>>,
    frame_counter: AtomicU64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            frame_interval: Duration::from_micros(1_000_000u64 / fps.max(1) as u64),
            next_due: Mutex::new(None),
            frame_counter: AtomicU64::new(0),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Reserve the next emission slot; concurrent readers share the cadence
    fn reserve_slot(&self) -> Instant {
        let now = Instant::now();
        let mut next_due = self.next_due.lock();
        let due = match *next_due {
            Some(due) if due > now => due,
            _ => now,
        };
        *next_due = Some(due + self.frame_interval);
        due
    }

    fn render(&self, frame_id: u64) -> RgbImage {
        let shade = (frame_id % 256) as u8;
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb([shade, 128, 255 - shade]));

        // Sweeping bar so consecutive frames are visibly distinct
        let bar_width = (self.width / 16).max(1);
        let bar_x = ((frame_id * bar_width as u64) % self.width.max(1) as u64) as u32;
        for y in 0..self.height {
            for x in bar_x..(bar_x + bar_width).min(self.width) {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }

        image
    }
}

impl FrameSource for TestPatternSource {
    fn read_frame(&self) -> Result<Frame, CameraError> {
        let due = self.reserve_slot();
        let wait = due.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Generated pattern frame {} ({}x{})",
            frame_id,
            self.width,
            self.height
        );

        Ok(Frame::new(frame_id, self.render(frame_id)))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
