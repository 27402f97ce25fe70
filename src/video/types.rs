//! Core types for video generation.

use crate::data_uri::DataUri;
use crate::error::{GenError, Result};
use crate::image::AspectRatio;
use crate::media::{MediaKind, MediaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed output resolution for animated clips.
pub const VIDEO_RESOLUTION: &str = "720p";

/// Veo model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoModel {
    /// Veo 3.1 Fast, tried first.
    #[default]
    Fast,
    /// Veo 3.1, used when the fast variant is not available.
    Standard,
}

impl VideoModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "veo-3.1-fast-generate-preview",
            Self::Standard => "veo-3.1-generate-preview",
        }
    }
}

/// Metadata about the video generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model that accepted the job.
    pub model: Option<String>,
    /// Whether submission fell back to the standard model.
    pub fallback_used: bool,
    /// Number of status checks made.
    pub poll_attempts: u32,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Video resolution.
    pub resolution: Option<String>,
}

/// A request to animate an image.
#[derive(Debug, Clone)]
pub struct VideoGenerationRequest {
    /// Motion description.
    pub prompt: String,
    /// First frame of the clip.
    pub source_image: DataUri,
    /// Aspect ratio of the clip.
    pub aspect_ratio: AspectRatio,
}

impl VideoGenerationRequest {
    /// Creates a new landscape request.
    pub fn new(prompt: impl Into<String>, source_image: DataUri) -> Self {
        Self {
            prompt: prompt.into(),
            source_image,
            aspect_ratio: AspectRatio::default(),
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Rejects requests the API would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(GenError::InvalidRequest("prompt must not be empty".into()));
        }
        if self.source_image.payload().is_empty() {
            return Err(GenError::InvalidRequest("source image is empty".into()));
        }
        Ok(())
    }
}

/// A generated video with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated video should be saved or processed"]
pub struct GeneratedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

impl GeneratedVideo {
    /// Creates a new generated video.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            metadata,
        }
    }

    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the video to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Returns the video as a data URI.
    pub fn to_data_uri(&self) -> DataUri {
        DataUri::from_bytes(self.mime_type.clone(), &self.data)
    }

    /// Converts into a generic media result.
    pub fn to_media_result(&self) -> MediaResult {
        MediaResult::new(MediaKind::Video, self.to_data_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids() {
        assert_eq!(VideoModel::Fast.as_str(), "veo-3.1-fast-generate-preview");
        assert_eq!(VideoModel::Standard.as_str(), "veo-3.1-generate-preview");
        assert_eq!(VideoModel::default(), VideoModel::Fast);
    }

    #[test]
    fn test_request_validation() {
        let image = DataUri::from_bytes("image/png", &[1, 2, 3]);
        assert!(VideoGenerationRequest::new("pan left", image.clone()).validate().is_ok());
        assert!(VideoGenerationRequest::new("", image).validate().is_err());
    }

    #[test]
    fn test_generated_video_data_uri() {
        let video = GeneratedVideo::new(vec![0, 0, 0, 0x18], "video/mp4", VideoMetadata::default());
        let result = video.to_media_result();
        assert_eq!(result.kind, MediaKind::Video);
        assert_eq!(result.data_uri.to_string(), "data:video/mp4;base64,AAAAGA==");
    }
}
