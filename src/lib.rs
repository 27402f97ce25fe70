#![warn(missing_docs)]
//! Lumiframe - prompt-to-image and image-to-video generation.
//!
//! Images come from Gemini's image models, videos from Veo. Results are
//! returned as data URIs and can be kept in a small local gallery.
//!
//! # Quick Start - Images
//!
//! ```no_run
//! use lumiframe::{Config, GeminiProvider, GenerationRequest, ImageProvider};
//!
//! #[tokio::main]
//! async fn main() -> lumiframe::Result<()> {
//!     let config = Config::load(None)?.build()?;
//!     let provider = GeminiProvider::new(config);
//!     let request = GenerationRequest::new("A lighthouse at dusk");
//!     let image = provider.generate(&request).await?;
//!     image.save("lighthouse.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Videos
//!
//! ```no_run
//! use lumiframe::{Config, DataUri, VeoProvider, VideoGenerationRequest, VideoProvider};
//!
//! #[tokio::main]
//! async fn main() -> lumiframe::Result<()> {
//!     let config = Config::load(None)?.build()?;
//!     let provider = VeoProvider::new(config);
//!     let still = DataUri::from_bytes("image/png", &std::fs::read("lighthouse.png")?);
//!     let request = VideoGenerationRequest::new("Waves roll in slowly", still);
//!     let video = provider.generate(&request).await?;
//!     video.save("lighthouse.mp4")?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `lumiframe` command-line binary

pub mod config;
pub mod data_uri;
mod error;
pub mod gallery;
pub mod image;
pub mod media;
pub mod studio;
pub mod video;

pub use config::{Config, ConfigBuilder};
pub use data_uri::DataUri;
pub use error::{GenError, Result};
pub use gallery::{FileSlot, Gallery, GalleryEntry, MemorySlot, SaveOutcome, StorageSlot};
pub use image::providers::GeminiProvider;
pub use image::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageModel,
    ImageProvider, Resolution,
};
pub use media::{MediaKind, MediaResult};
pub use studio::{Artifact, Studio};
pub use video::providers::VeoProvider;
pub use video::{GeneratedVideo, VideoGenerationRequest, VideoMetadata, VideoModel, VideoProvider};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{GenError, Result};
    pub use crate::gallery::{FileSlot, Gallery, GalleryEntry, SaveOutcome};
    pub use crate::image::providers::GeminiProvider;
    pub use crate::image::{AspectRatio, GeneratedImage, GenerationRequest, ImageProvider};
    pub use crate::media::{MediaKind, MediaResult};
    pub use crate::studio::Studio;
    pub use crate::video::providers::VeoProvider;
    pub use crate::video::{GeneratedVideo, VideoGenerationRequest, VideoProvider};
}
