use crate::error::{CameraError, StreamError};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

/// One decoded image captured from a camera
#[derive(Debug, Clone)]
pub struct Frame {
    /// Per-source sequence number
    pub id: u64,
    /// Decoded RGB pixels
    pub image: RgbImage,
}

impl Frame {
    pub fn new(id: u64, image: RgbImage) -> Self {
        Self { id, image }
    }

    /// Decode a motion-JPEG sample into a frame
    pub fn from_mjpeg(id: u64, data: &[u8]) -> Result<Self, CameraError> {
        let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| CameraError::Decode {
                details: format!("JPEG decode failed for frame {}: {}", id, e),
            })?
            .to_rgb8();

        Ok(Self::new(id, image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Encode an RGB image as baseline JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, StreamError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(StreamError::Encode {
            details: "cannot encode an empty image".to_string(),
        });
    }

    let mut buf = Vec::with_capacity(image.as_raw().len() / 8);
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(image)
        .map_err(|e| StreamError::Encode {
            details: e.to_string(),
        })?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_encode_produces_jpeg_markers() {
        let image = RgbImage::from_pixel(64, 48, Rgb([10, 200, 30]));
        let jpeg = encode_jpeg(&image, 90).unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_rejects_empty_image() {
        let image = RgbImage::new(0, 0);
        assert!(matches!(
            encode_jpeg(&image, 90),
            Err(StreamError::Encode { .. })
        ));
    }

    #[test]
    fn test_mjpeg_decode_keeps_dimensions() {
        let image = RgbImage::from_pixel(32, 16, Rgb([128, 128, 128]));
        let jpeg = encode_jpeg(&image, 90).unwrap();

        let frame = Frame::from_mjpeg(7, &jpeg).unwrap();
        assert_eq!(frame.id, 7);
        assert_eq!(frame.dimensions(), (32, 16));
    }

    #[test]
    fn test_mjpeg_decode_failure_is_decode_error() {
        let result = Frame::from_mjpeg(1, &[0xFF, 0xD8, 0x00, 0x01]);
        assert!(matches!(result, Err(CameraError::Decode { .. })));
    }
}
