//! Media kinds shared by generation results and the gallery.

use crate::data_uri::DataUri;
use serde::{Deserialize, Serialize};

/// What a piece of media is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A still image.
    #[default]
    Image,
    /// A short video clip.
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// The outcome of one successful generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResult {
    /// Image or video.
    pub kind: MediaKind,
    /// The encoded media.
    pub data_uri: DataUri,
}

impl MediaResult {
    /// Creates a new result.
    pub fn new(kind: MediaKind, data_uri: DataUri) -> Self {
        Self { kind, data_uri }
    }
}
