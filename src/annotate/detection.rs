use super::FrameAnnotator;
use crate::error::AnnotationError;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};

/// One detected object in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    /// Corners as [left, top, right, bottom]
    pub bbox: [f32; 4],
}

/// Object detector backing a [`DetectionAnnotator`]
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, AnnotationError>;
}

/// Draws a box and optional label for every detection above a threshold
pub struct DetectionAnnotator<D> {
    detector: D,
    min_confidence: f32,
    color: Rgb<u8>,
    label_font: Option<(Font<'static>, Scale)>,
}

impl<D: Detector> DetectionAnnotator<D> {
    pub fn new(detector: D, min_confidence: f32) -> Self {
        Self {
            detector,
            min_confidence,
            color: Rgb([0, 255, 0]),
            label_font: None,
        }
    }

    pub fn with_color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }

    pub fn with_label_font(mut self, font: Font<'static>, size: f32) -> Self {
        self.label_font = Some((font, Scale::uniform(size)));
        self
    }

    fn draw(&self, image: &mut RgbImage, detection: &Detection) {
        let max_x = image.width().saturating_sub(1) as f32;
        let max_y = image.height().saturating_sub(1) as f32;
        let left = detection.bbox[0].clamp(0.0, max_x).round() as i32;
        let top = detection.bbox[1].clamp(0.0, max_y).round() as i32;
        let right = detection.bbox[2].clamp(0.0, max_x).round() as i32;
        let bottom = detection.bbox[3].clamp(0.0, max_y).round() as i32;

        if right <= left || bottom <= top {
            return;
        }

        // Two nested outlines for a 2px border
        for inset in 0..2 {
            let width = (right - left - 2 * inset).max(1) as u32;
            let height = (bottom - top - 2 * inset).max(1) as u32;
            draw_hollow_rect_mut(
                image,
                Rect::at(left + inset, top + inset).of_size(width, height),
                self.color,
            );
        }

        if let Some((font, scale)) = &self.label_font {
            let text = format!("{} {:.2}", detection.label, detection.confidence);
            let (text_width, text_height) = imageproc::drawing::text_size(*scale, font, &text);
            let label_y = (top - text_height - 4).max(0);

            draw_filled_rect_mut(
                image,
                Rect::at(left, label_y).of_size((text_width + 4).max(1) as u32, (text_height + 4).max(1) as u32),
                self.color,
            );
            draw_text_mut(image, Rgb([0, 0, 0]), left + 2, label_y + 2, *scale, font, &text);
        }
    }
}

impl<D: Detector> FrameAnnotator for DetectionAnnotator<D> {
    fn annotate(&self, image: &RgbImage) -> Result<RgbImage, AnnotationError> {
        let detections = self.detector.detect(image)?;
        let mut annotated = image.clone();

        for detection in detections
            .iter()
            .filter(|d| d.confidence >= self.min_confidence)
        {
            self.draw(&mut annotated, detection);
        }

        Ok(annotated)
    }
}
