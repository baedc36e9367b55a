//! Image processor - decode, resize and re-encode uploaded images

use crate::error::ProcessingError;
use crate::image::dimensions::{fit_scale, target_dimensions};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

/// Constraints applied by [`ImageProcessing::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeConstraints {
    /// Fit inside the requested box instead of stretching to it
    pub preserve_aspect: bool,
    /// Never produce an image larger than the source
    pub no_upscale: bool,
}

impl Default for ResizeConstraints {
    fn default() -> Self {
        Self {
            preserve_aspect: true,
            no_upscale: true,
        }
    }
}

/// Image codec capability used by the upload pipeline.
///
/// Implementations are synchronous and CPU-bound; the pipeline calls them from
/// the blocking thread pool.
pub trait ImageProcessing: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ProcessingError>;

    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        constraints: ResizeConstraints,
    ) -> Result<DynamicImage, ProcessingError>;

    /// Encode with the codec matching `extension` (case-insensitive).
    fn encode_by_extension(
        &self,
        image: &DynamicImage,
        extension: &str,
        quality: u8,
    ) -> Result<Bytes, ProcessingError>;

    /// Decode, scale to `height` keeping the aspect ratio, and re-encode as `extension`.
    fn process(
        &self,
        data: &[u8],
        extension: &str,
        height: u32,
        quality: u8,
    ) -> Result<Bytes, ProcessingError> {
        let image = self.decode(data)?;
        let (src_w, src_h) = image.dimensions();
        if src_h == 0 {
            return Err(ProcessingError::InvalidDimensions {
                width: src_w,
                height: src_h,
            });
        }

        let (width, height) = target_dimensions(src_w, src_h, height);
        tracing::debug!(
            src_width = src_w,
            src_height = src_h,
            width = width,
            height = height,
            "Resizing image"
        );

        let resized = self.resize(image, width, height, ResizeConstraints::default())?;
        self.encode_by_extension(&resized, extension, quality)
    }
}

/// [`ImageProcessing`] backed by the `image` crate, with `webp` for lossy WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterProcessor;

impl RasterProcessor {
    pub fn new() -> Self {
        Self
    }

    fn encode_with_format(image: &DynamicImage, format: ImageFormat) -> Result<Bytes, ProcessingError> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), format)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(&rgba, width, height);
        // `encode` unwraps libwebp errors; `encode_simple` reports them.
        let data = encoder
            .encode_simple(false, quality.min(100) as f32)
            .map_err(|e| ProcessingError::Encode(format!("WebP encoding failed: {:?}", e)))?;
        Ok(Bytes::copy_from_slice(&data))
    }
}

impl ImageProcessing for RasterProcessor {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ProcessingError> {
        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        reader
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))
    }

    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        constraints: ResizeConstraints,
    ) -> Result<DynamicImage, ProcessingError> {
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }

        let (src_w, src_h) = image.dimensions();
        if constraints.no_upscale && width >= src_w && height >= src_h {
            return Ok(image);
        }

        let (out_w, out_h) = if constraints.preserve_aspect {
            let scale = if constraints.no_upscale {
                fit_scale(src_w, src_h, width, height)
            } else {
                (width as f64 / src_w as f64).min(height as f64 / src_h as f64)
            };
            (
                ((src_w as f64 * scale).round() as u32).max(1),
                ((src_h as f64 * scale).round() as u32).max(1),
            )
        } else if constraints.no_upscale {
            (width.min(src_w), height.min(src_h))
        } else {
            (width, height)
        };

        Ok(image.resize_exact(out_w, out_h, FilterType::Lanczos3))
    }

    fn encode_by_extension(
        &self,
        image: &DynamicImage,
        extension: &str,
        quality: u8,
    ) -> Result<Bytes, ProcessingError> {
        let format = ImageFormat::from_extension(extension)
            .ok_or_else(|| ProcessingError::UnsupportedFormat(extension.to_string()))?;

        match format {
            ImageFormat::Jpeg => Self::encode_jpeg(image, quality),
            ImageFormat::WebP => Self::encode_webp(image, quality),
            other => Self::encode_with_format(image, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        }))
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        gradient(width, height)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_process_preserves_aspect_ratio() {
        let processor = RasterProcessor::new();
        let output = processor.process(&png_bytes(1200, 600), "png", 300, 75).unwrap();

        let decoded = processor.decode(&output).unwrap();
        assert_eq!(decoded.dimensions(), (600, 300));
    }

    #[test]
    fn test_process_does_not_upscale() {
        let processor = RasterProcessor::new();
        let output = processor.process(&png_bytes(120, 60), "png", 300, 75).unwrap();

        let decoded = processor.decode(&output).unwrap();
        assert_eq!(decoded.dimensions(), (120, 60));
    }

    #[test]
    fn test_process_encodes_with_extension_codec() {
        let processor = RasterProcessor::new();
        let output = processor.process(&png_bytes(400, 200), "JPG", 100, 75).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        assert_eq!(processor.decode(&output).unwrap().dimensions(), (200, 100));
    }

    #[test]
    fn test_webp_encoding() {
        let processor = RasterProcessor::new();
        let output = processor
            .encode_by_extension(&gradient(32, 16), "webp", 80)
            .unwrap();

        assert_eq!(&output[0..4], b"RIFF");
        assert_eq!(&output[8..12], b"WEBP");
    }

    #[test]
    fn test_webp_oversized_image_is_an_encode_error() {
        // libwebp caps each side at 16383 px
        let result = RasterProcessor::new().encode_by_extension(&gradient(16_400, 2), "webp", 80);
        assert!(matches!(result, Err(ProcessingError::Encode(_))));
    }

    #[test]
    fn test_jpeg_quality_changes_output_size() {
        let processor = RasterProcessor::new();
        let image = gradient(256, 256);

        let low = processor.encode_by_extension(&image, "jpg", 10).unwrap();
        let high = processor.encode_by_extension(&image, "jpg", 95).unwrap();

        assert!(low.len() < high.len());
    }

    #[test]
    fn test_corrupt_data_fails_to_decode() {
        let processor = RasterProcessor::new();
        let result = processor.process(b"definitely not an image", "jpg", 300, 75);

        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let processor = RasterProcessor::new();
        let result = processor.process(&png_bytes(10, 10), "txt", 300, 75);

        assert!(matches!(result, Err(ProcessingError::UnsupportedFormat(ext)) if ext == "txt"));
    }

    #[test]
    fn test_resize_without_aspect_stretches() {
        let processor = RasterProcessor::new();
        let resized = processor
            .resize(
                gradient(100, 100),
                50,
                20,
                ResizeConstraints {
                    preserve_aspect: false,
                    no_upscale: true,
                },
            )
            .unwrap();

        assert_eq!(resized.dimensions(), (50, 20));
    }

    #[test]
    fn test_resize_allows_upscale_when_asked() {
        let processor = RasterProcessor::new();
        let resized = processor
            .resize(
                gradient(10, 5),
                40,
                20,
                ResizeConstraints {
                    preserve_aspect: true,
                    no_upscale: false,
                },
            )
            .unwrap();

        assert_eq!(resized.dimensions(), (40, 20));
    }

    #[test]
    fn test_resize_rejects_zero_dimensions() {
        let processor = RasterProcessor::new();
        let result = processor.resize(gradient(10, 10), 0, 10, ResizeConstraints::default());

        assert!(matches!(
            result,
            Err(ProcessingError::InvalidDimensions { width: 0, height: 10 })
        ));
    }
}
