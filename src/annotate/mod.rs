//! Pluggable frame annotation.
//!
//! An annotator is a frame-in/frame-out transform applied once per captured
//! frame before the FPS overlay. The stream never depends on it succeeding:
//! [`annotate_or_passthrough`] turns every failure into the original frame.

mod detection;

pub use detection::{Detection, DetectionAnnotator, Detector};

use crate::error::AnnotationError;
use crate::frame::Frame;
use image::RgbImage;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, image: &RgbImage) -> Result<RgbImage, AnnotationError>;
}

/// Closures work as annotators, which keeps test doubles short
impl<F> FrameAnnotator for F
where
    F: Fn(&RgbImage) -> Result<RgbImage, AnnotationError> + Send + Sync,
{
    fn annotate(&self, image: &RgbImage) -> Result<RgbImage, AnnotationError> {
        self(image)
    }
}

/// Passes frames through untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnnotator;

impl FrameAnnotator for NoopAnnotator {
    fn annotate(&self, image: &RgbImage) -> Result<RgbImage, AnnotationError> {
        Ok(image.clone())
    }
}

/// Run `annotator` on `frame`, falling back to the unannotated frame on
/// error, panic, or output whose dimensions differ from the input.
pub fn annotate_or_passthrough(annotator: &dyn FrameAnnotator, label: &str, frame: Frame) -> Frame {
    let result = panic::catch_unwind(AssertUnwindSafe(|| annotator.annotate(&frame.image)))
        .unwrap_or(Err(AnnotationError::Panicked))
        .and_then(|annotated| {
            if annotated.dimensions() == frame.dimensions() {
                Ok(annotated)
            } else {
                Err(AnnotationError::Malformed {
                    expected: frame.dimensions(),
                    actual: annotated.dimensions(),
                })
            }
        });

    match result {
        Ok(image) => Frame { image, ..frame },
        Err(e) => {
            warn!("[{}] annotation failed, using unannotated frame {}: {}", label, frame.id, e);
            frame
        }
    }
}
