//! Core types for image generation.

use crate::data_uri::{DataUri, DEFAULT_IMAGE_MIME};
use crate::error::{GenError, Result};
use crate::media::{MediaKind, MediaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Aspect ratios offered for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape (widescreen).
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall).
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }

    /// Maps any input onto a supported ratio: `"9:16"` is portrait, anything
    /// else falls back to landscape.
    pub fn normalize(input: &str) -> Self {
        if input.trim() == "9:16" {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            other => Err(GenError::InvalidRequest(format!(
                "unsupported aspect ratio '{other}' (expected 16:9 or 9:16)"
            ))),
        }
    }
}

/// Output resolution for the high-quality model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// About 1024px on the long edge.
    #[default]
    #[serde(rename = "1K")]
    OneK,
    /// About 2048px on the long edge.
    #[serde(rename = "2K")]
    TwoK,
    /// About 4096px on the long edge.
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Returns the API value (e.g., "2K").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which image model tier to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageModel {
    /// Gemini 2.5 Flash Image (fast, economical, no resolution control).
    Fast,
    /// Gemini 3 Pro Image (highest quality).
    #[default]
    Standard,
}

impl ImageModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "gemini-2.5-flash-image",
            Self::Standard => "gemini-3-pro-image-preview",
        }
    }

    /// Whether the model accepts an output resolution.
    pub fn supports_resolution(&self) -> bool {
        matches!(self, Self::Standard)
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model that produced the image.
    pub model: Option<String>,
    /// Whether the call fell back from the high-quality to the fast model.
    pub fallback_used: bool,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A request to generate an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Aspect ratio of the output.
    pub aspect_ratio: AspectRatio,
    /// Output resolution; ignored by the fast model.
    pub resolution: Resolution,
    /// Model tier.
    pub model: ImageModel,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt and default options.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            model: ImageModel::default(),
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the model tier.
    pub fn with_model(mut self, model: ImageModel) -> Self {
        self.model = model;
        self
    }

    /// Rejects requests the API would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(GenError::InvalidRequest("prompt must not be empty".into()));
        }
        Ok(())
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Declared MIME type.
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image. An empty MIME type becomes `image/png`.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, metadata: GenerationMetadata) -> Self {
        let mime_type = mime_type.into();
        Self {
            data,
            mime_type: if mime_type.is_empty() {
                DEFAULT_IMAGE_MIME.to_string()
            } else {
                mime_type
            },
            metadata,
        }
    }

    /// Returns the format, from magic bytes first and the MIME type second.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_magic_bytes(&self.data).or_else(|| ImageFormat::from_mime_type(&self.mime_type))
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Returns the image as a data URI.
    pub fn to_data_uri(&self) -> DataUri {
        DataUri::from_bytes(self.mime_type.clone(), &self.data)
    }

    /// Converts into a generic media result.
    pub fn to_media_result(&self) -> MediaResult {
        MediaResult::new(MediaKind::Image, self.to_data_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(ImageFormat::from_magic_bytes(&PNG_MAGIC), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_magic_bytes(&JPEG_MAGIC), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_magic_bytes(&WEBP_MAGIC), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_magic_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn test_format_from_mime_and_extension() {
        assert_eq!(ImageFormat::from_mime_type("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime_type("video/mp4"), None);
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_aspect_ratio_normalize() {
        assert_eq!(AspectRatio::normalize("9:16"), AspectRatio::Portrait);
        assert_eq!(AspectRatio::normalize("16:9"), AspectRatio::Landscape);
        assert_eq!(AspectRatio::normalize(""), AspectRatio::Landscape);
        assert_eq!(AspectRatio::normalize("4:3"), AspectRatio::Landscape);
    }

    #[test]
    fn test_aspect_ratio_from_str() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert!("1:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_model_ids() {
        assert_eq!(ImageModel::Fast.as_str(), "gemini-2.5-flash-image");
        assert_eq!(ImageModel::Standard.as_str(), "gemini-3-pro-image-preview");
        assert!(!ImageModel::Fast.supports_resolution());
        assert_eq!(ImageModel::default(), ImageModel::Standard);
    }

    #[test]
    fn test_request_defaults_and_validation() {
        let req = GenerationRequest::new("A lighthouse");
        assert_eq!(req.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(req.resolution, Resolution::OneK);
        assert!(req.validate().is_ok());
        assert!(GenerationRequest::new("  ").validate().is_err());
    }

    #[test]
    fn test_generated_image_data_uri() {
        let image = GeneratedImage::new(PNG_MAGIC.to_vec(), "", GenerationMetadata::default());
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.format(), Some(ImageFormat::Png));
        let uri = image.to_data_uri().to_string();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(uri.len() > "data:image/png;base64,".len());
    }
}
