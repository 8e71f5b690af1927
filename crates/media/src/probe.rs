//! Detection of uploaded image formats
//!
//! The stored extension and content type always come from the bytes, never
//! from the client supplied filename or content type. Every upload is fully
//! decoded, so a valid header in front of a corrupt body is rejected too.

use image::ImageFormat;

use crate::MediaError;

/// Image formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::WebP => "webp",
            ImageKind::Bmp => "bmp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::WebP => "image/webp",
            ImageKind::Bmp => "image/bmp",
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Gif => Some(ImageKind::Gif),
            ImageFormat::WebP => Some(ImageKind::WebP),
            ImageFormat::Bmp => Some(ImageKind::Bmp),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageKind {
    #[mutants::skip] // Delegates to extension()
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Format and pixel dimensions of an uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

/// Identify the image format from its magic bytes, decode the whole image
/// and report its dimensions.
pub fn probe_image(bytes: &[u8]) -> Result<ImageInfo, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::UnsupportedImage("empty file".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| MediaError::UnsupportedImage(e.to_string()))?;
    let kind = ImageKind::from_format(format).ok_or_else(|| {
        MediaError::UnsupportedImage(format!("format {:?} is not accepted", format))
    })?;

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MediaError::UnsupportedImage(e.to_string()))?;
    let (width, height) = image::GenericImageView::dimensions(&decoded);

    if width == 0 || height == 0 {
        return Err(MediaError::UnsupportedImage(
            "image has no pixels".to_string(),
        ));
    }

    Ok(ImageInfo {
        kind,
        width,
        height,
    })
}
