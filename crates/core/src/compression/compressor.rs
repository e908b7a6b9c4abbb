//! Resize and re-encode images with the `image` crate.

use std::io::Cursor;

use bytes::Bytes;
use futures::future::try_join_all;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};

use super::error::CompressionError;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFormat {
    /// Lossy JPEG at the configured quality.
    #[default]
    Jpeg,
    /// WebP (lossless; quality is ignored).
    Webp,
}

impl TargetFormat {
    /// MIME type of the encoded output.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// File extension of the encoded output.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Bounds and encoding for [`ImageCompressor::compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Output encoding.
    pub format: TargetFormat,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_width: 2048,
            max_height: 2048,
            quality: 80,
            format: TargetFormat::Jpeg,
        }
    }
}

/// Normalizes uploaded images.
///
/// Decoding and encoding are CPU-bound and run on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCompressor;

impl ImageCompressor {
    /// Create a compressor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Auto-rotate, shrink to fit `options` and re-encode one image.
    ///
    /// # Errors
    ///
    /// Empty, unrecognized or undecodable input yields a client error
    /// (see [`CompressionError::is_client_error`]); encoder failures yield
    /// [`CompressionError::Codec`].
    pub async fn compress(
        &self,
        data: Bytes,
        options: CompressionOptions,
    ) -> Result<Bytes, CompressionError> {
        if data.is_empty() {
            return Err(CompressionError::Empty);
        }

        tokio::task::spawn_blocking(move || compress_blocking(&data, options))
            .await
            .map_err(|e| CompressionError::codec(format!("compression worker failed: {e}")))?
    }

    /// Compress every image with the same options.
    ///
    /// All-or-nothing: the first failure fails the whole batch. Callers that
    /// tolerate partial failure should call [`Self::compress`] per item.
    pub async fn compress_batch(
        &self,
        images: Vec<Bytes>,
        options: CompressionOptions,
    ) -> Result<Vec<Bytes>, CompressionError> {
        try_join_all(images.into_iter().map(|data| self.compress(data, options))).await
    }
}

fn compress_blocking(data: &[u8], options: CompressionOptions) -> Result<Bytes, CompressionError> {
    let format = image::guess_format(data).map_err(|_| CompressionError::NotAnImage)?;

    let mut decoder = ImageReader::with_format(Cursor::new(data), format)
        .into_decoder()
        .map_err(|e| CompressionError::invalid_image(e.to_string()))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| CompressionError::invalid_image(e.to_string()))?;
    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| CompressionError::invalid_image(e.to_string()))?;
    img.apply_orientation(orientation);

    let img = fit_within(img, options.max_width, options.max_height);
    encode(&img, options).map(Bytes::from)
}

/// Shrink `img` so it fits the bounding box, keeping its aspect ratio.
/// Images already inside the box are returned untouched.
fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let max_width = max_width.max(1);
    let max_height = max_height.max(1);

    if img.width() <= max_width && img.height() <= max_height {
        return img;
    }

    img.resize(max_width, max_height, FilterType::Lanczos3)
}

fn encode(img: &DynamicImage, options: CompressionOptions) -> Result<Vec<u8>, CompressionError> {
    let mut buf = Vec::new();

    match options.format {
        TargetFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, options.quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)
                .map_err(|e| CompressionError::codec(e.to_string()))?;
        }
        TargetFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let encoder = WebPEncoder::new_lossless(&mut buf);
            rgba.write_with_encoder(encoder)
                .map_err(|e| CompressionError::codec(e.to_string()))?;
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use rstest::rstest;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .expect("encode png");
        Bytes::from(buf.into_inner())
    }

    fn small_options(max: u32) -> CompressionOptions {
        CompressionOptions {
            max_width: max,
            max_height: max,
            ..CompressionOptions::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = CompressionOptions::default();
        assert_eq!(options.max_width, 2048);
        assert_eq!(options.max_height, 2048);
        assert_eq!(options.quality, 80);
        assert_eq!(options.format, TargetFormat::Jpeg);
    }

    #[rstest]
    #[case(400, 200, 100, (100, 50))]
    #[case(200, 400, 100, (50, 100))]
    #[case(300, 300, 100, (100, 100))]
    #[case(50, 40, 100, (50, 40))]
    #[tokio::test]
    async fn test_compress_fits_bounds_without_upscaling(
        #[case] width: u32,
        #[case] height: u32,
        #[case] max: u32,
        #[case] expected: (u32, u32),
    ) {
        let out = ImageCompressor::new()
            .compress(png_bytes(width, height), small_options(max))
            .await
            .expect("compress");

        assert_eq!(image::guess_format(&out).expect("format"), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).expect("decodable output");
        assert_eq!((decoded.width(), decoded.height()), expected);
    }

    #[tokio::test]
    async fn test_compress_to_webp() {
        let options = CompressionOptions {
            format: TargetFormat::Webp,
            ..small_options(64)
        };
        let out = ImageCompressor::new()
            .compress(png_bytes(128, 32), options)
            .await
            .expect("compress");

        assert_eq!(image::guess_format(&out).expect("format"), ImageFormat::WebP);
        let decoded = image::load_from_memory(&out).expect("decodable output");
        assert!(decoded.width() <= 64 && decoded.height() <= 64);
    }

    #[tokio::test]
    async fn test_compress_flattens_alpha_for_jpeg() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 100]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .expect("encode png");

        let out = ImageCompressor::new()
            .compress(Bytes::from(buf.into_inner()), CompressionOptions::default())
            .await
            .expect("compress");
        assert_eq!(image::guess_format(&out).expect("format"), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_empty_input_is_client_error() {
        let err = ImageCompressor::new()
            .compress(Bytes::new(), CompressionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompressionError::Empty));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_non_image_is_client_error() {
        let err = ImageCompressor::new()
            .compress(
                Bytes::from_static(b"just some text, definitely not pixels"),
                CompressionOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CompressionError::NotAnImage));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_truncated_image_is_client_error() {
        let full = png_bytes(64, 64);
        let truncated = full.slice(..40);

        let err = ImageCompressor::new()
            .compress(truncated, CompressionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_client_error(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let compressor = ImageCompressor::new();

        let ok = compressor
            .compress_batch(vec![png_bytes(10, 10), png_bytes(300, 30)], small_options(100))
            .await
            .expect("batch");
        assert_eq!(ok.len(), 2);

        let err = compressor
            .compress_batch(
                vec![png_bytes(10, 10), Bytes::from_static(b"nope"), png_bytes(10, 10)],
                small_options(100),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CompressionError::NotAnImage));
    }

    #[test]
    fn test_codec_error_is_not_client_error() {
        assert!(!CompressionError::codec("boom").is_client_error());
        assert!(CompressionError::invalid_image("bad").is_client_error());
    }

    #[test]
    fn test_target_format_metadata() {
        assert_eq!(TargetFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(TargetFormat::Jpeg.extension(), "jpg");
        assert_eq!(TargetFormat::Webp.content_type(), "image/webp");
        assert_eq!(TargetFormat::Webp.extension(), "webp");
    }
}
