use crate::config::OverlayConfig;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::fs;
use tracing::{debug, warn};

/// Top-left corner of the FPS text
const TEXT_ORIGIN: (i32, i32) = (10, 10);

/// Text drawn on every streamed frame
pub fn format_rate_text(label: &str, rate: f64) -> String {
    format!("{}  FPS: {:.1}", label, rate)
}

/// Renders the per-stream FPS text onto frames
pub struct RateOverlay {
    font: Option<Font<'static>>,
    scale: Scale,
}

impl RateOverlay {
    /// Load the configured font. A missing or unreadable font disables the
    /// overlay instead of failing startup.
    pub fn from_config(config: &OverlayConfig) -> Self {
        let font = match fs::read(&config.font_path) {
            Ok(data) => {
                let font = Font::try_from_vec(data);
                if font.is_none() {
                    warn!(
                        "Failed to parse font file '{}', FPS overlay disabled",
                        config.font_path
                    );
                }
                font
            }
            Err(e) => {
                warn!(
                    "Failed to read font file '{}': {}; FPS overlay disabled",
                    config.font_path, e
                );
                None
            }
        };

        Self {
            font,
            scale: Scale::uniform(config.font_size),
        }
    }

    pub fn with_font(font: Font<'static>, size: f32) -> Self {
        Self {
            font: Some(font),
            scale: Scale::uniform(size),
        }
    }

    pub fn disabled() -> Self {
        Self {
            font: None,
            scale: Scale::uniform(1.0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.font.is_some()
    }

    /// Draw `"<label>  FPS: <rate>"` at a fixed position
    pub fn render(&self, image: &mut RgbImage, label: &str, rate: f64) {
        let Some(font) = &self.font else {
            return;
        };

        let text = format_rate_text(label, rate);
        let (x, y) = TEXT_ORIGIN;
        let (text_width, text_height) = text_size(self.scale, font, &text);

        // Darken the area behind the text so it stays readable on bright scenes
        for dy in 0..(text_height.max(0) as u32 + 10) {
            for dx in 0..(text_width.max(0) as u32 + 10) {
                let px = (x as u32).saturating_sub(5) + dx;
                let py = (y as u32).saturating_sub(5) + dy;
                if px < image.width() && py < image.height() {
                    let pixel = image.get_pixel(px, py);
                    image.put_pixel(px, py, Rgb([pixel[0] / 3, pixel[1] / 3, pixel[2] / 3]));
                }
            }
        }

        draw_text_mut(image, Rgb([255, 255, 255]), x, y, self.scale, font, &text);
        debug!("Rendered overlay '{}'", text);
    }
}
