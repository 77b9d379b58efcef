//! # Source and Output Bitmaps
//!
//! [`SourceImage`] is the user's upload, [`OutputImage`] the decoded result.
//! Both are immutable once built and have independent lifetimes.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use upscale_codec::{
    decode_from_bytes, encode_to_bytes, encode_to_embeddable, is_supported_upload, sniff_format,
};

use crate::error::{UpscalerError, UpscalerResult};

/// Fixed file name offered for the download.
pub const DOWNLOAD_FILE_NAME: &str = "upscaled_image.png";

/// The user's uploaded image.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
}

impl SourceImage {
    /// Decode uploaded file bytes.
    ///
    /// Only PNG and JPEG are accepted; anything else is a validation error.
    /// Bytes that claim a supported format but fail to decode are a decode error.
    pub fn from_bytes(bytes: &[u8]) -> UpscalerResult<Self> {
        if !is_supported_upload(bytes) {
            let found = sniff_format(bytes)
                .map(|f| format!("{:?}", f))
                .unwrap_or_else(|| "unknown".to_string());
            return Err(UpscalerError::validation("upload", "must be a PNG or JPEG image", found)
                .with_recovery_suggestion("Choose a .png, .jpg or .jpeg file"));
        }
        let image = decode_from_bytes(bytes).map_err(|e| UpscalerError::decode("upload", e))?;
        Ok(Self { image })
    }

    /// Read and decode an uploaded file.
    pub async fn from_path(path: impl AsRef<Path>) -> UpscalerResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UpscalerError::io("read_upload", e).with_path(path.display().to_string()))?;
        Self::from_bytes(&bytes)
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

    /// PNG `data:` URI of the bitmap, ready to be sent as `image_url`.
    pub fn to_embeddable(&self) -> UpscalerResult<String> {
        Ok(encode_to_embeddable(&self.image)?)
    }
}

/// The decoded upscaling result.
#[derive(Debug, Clone)]
pub struct OutputImage {
    image: DynamicImage,
}

impl OutputImage {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
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

    /// PNG bytes offered for download.
    pub fn to_png_bytes(&self) -> UpscalerResult<Vec<u8>> {
        Ok(encode_to_bytes(&self.image)?)
    }

    /// Write the PNG download to `path`.
    pub async fn save_png(&self, path: impl AsRef<Path>) -> UpscalerResult<()> {
        let path = path.as_ref();
        let bytes = self.to_png_bytes()?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| UpscalerError::io("write_download", e).with_path(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, Rgba32FImage, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([x as u8, y as u8, 0, 255])
        }));
        encode_to_bytes(&image).unwrap()
    }

    #[test]
    fn test_source_from_png() {
        let source = SourceImage::from_bytes(&png_bytes(100, 50)).unwrap();
        assert_eq!(source.dimensions(), (100, 50));
    }

    #[test]
    fn test_source_from_jpeg() {
        let mut jpeg = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([200, 10, 10])))
            .write_to(&mut jpeg, ImageFormat::Jpeg)
            .unwrap();

        let source = SourceImage::from_bytes(jpeg.get_ref()).unwrap();
        assert_eq!(source.dimensions(), (10, 20));
    }

    #[test]
    fn test_source_rejects_unsupported_format() {
        let mut bmp = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(2, 2))
            .write_to(&mut bmp, ImageFormat::Bmp)
            .unwrap();

        let err = SourceImage::from_bytes(bmp.get_ref()).unwrap_err();
        assert_eq!(err.category(), "validation");

        let err = SourceImage::from_bytes(b"hello").unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_source_corrupt_png_is_decode_error() {
        let bytes = png_bytes(32, 32);
        let err = SourceImage::from_bytes(&bytes[..40]).unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_embeddable_prefix() {
        let source = SourceImage::from_bytes(&png_bytes(4, 4)).unwrap();
        assert!(source.to_embeddable().unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_output_png_bytes() {
        let output = OutputImage::new(DynamicImage::ImageRgba8(RgbaImage::new(7, 3)));
        let bytes = output.to_png_bytes().unwrap();
        let decoded = decode_from_bytes(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (7, 3));
    }

    #[tokio::test]
    async fn test_float_output_saves_as_png() {
        let output = OutputImage::new(DynamicImage::ImageRgba32F(Rgba32FImage::from_pixel(
            5,
            4,
            Rgba([0.2, 0.4, 0.6, 1.0]),
        )));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOWNLOAD_FILE_NAME);

        output.save_png(&path).await.unwrap();
        let saved = decode_from_bytes(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved.dimensions(), (5, 4));
    }
}
