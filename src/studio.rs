//! Session state tying generation to the gallery.
//!
//! A [`Studio`] holds the image and video currently on display and refuses to
//! start a second generation while one is outstanding. It can be shared
//! behind an `Arc`; all methods take `&self`.

use crate::data_uri::DataUri;
use crate::error::{GenError, Result};
use crate::gallery::{Gallery, GalleryEntry, SaveOutcome, StorageSlot};
use crate::image::{AspectRatio, GenerationRequest, ImageProvider};
use crate::media::{MediaKind, MediaResult};
use crate::video::{VideoGenerationRequest, VideoProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// A generated artifact together with what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The encoded media.
    pub result: MediaResult,
    /// Prompt used to produce it.
    pub prompt: String,
    /// Aspect ratio it was produced at.
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Default)]
struct Session {
    image: Option<Artifact>,
    video: Option<Artifact>,
}

/// Application shell over an image provider, a video provider and a gallery.
pub struct Studio<I, V, S> {
    images: I,
    videos: V,
    gallery: Mutex<Gallery<S>>,
    session: Mutex<Session>,
    busy: AtomicBool,
}

/// Clears the busy flag when dropped, including when the generation future
/// is dropped mid-flight.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| GenError::Busy)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<I, V, S> Studio<I, V, S>
where
    I: ImageProvider,
    V: VideoProvider,
    S: StorageSlot,
{
    /// Creates a studio with an empty session.
    pub fn new(images: I, videos: V, gallery: Gallery<S>) -> Self {
        Self {
            images,
            videos,
            gallery: Mutex::new(gallery),
            session: Mutex::new(Session::default()),
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a generation is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Generates an image and makes it the current image. Any current video
    /// belonged to the previous image and is cleared.
    pub async fn generate_image(&self, request: &GenerationRequest) -> Result<MediaResult> {
        let _guard = BusyGuard::acquire(&self.busy)?;

        let image = self.images.generate(request).await?;
        if image.metadata.fallback_used {
            tracing::info!(model = ?image.metadata.model, "image generated on fallback model");
        }
        let result = image.to_media_result();

        let mut session = lock(&self.session);
        session.image = Some(Artifact {
            result: result.clone(),
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio,
        });
        session.video = None;
        Ok(result)
    }

    /// Loads an existing image (e.g. from disk) as the current image.
    pub fn set_current_image(&self, image: DataUri, prompt: impl Into<String>, aspect_ratio: AspectRatio) {
        let mut session = lock(&self.session);
        session.image = Some(Artifact {
            result: MediaResult::new(MediaKind::Image, image),
            prompt: prompt.into(),
            aspect_ratio,
        });
        session.video = None;
    }

    /// Animates the current image and makes the clip the current video.
    pub async fn animate(&self, motion_prompt: &str) -> Result<MediaResult> {
        let _guard = BusyGuard::acquire(&self.busy)?;

        let source = lock(&self.session)
            .image
            .clone()
            .ok_or_else(|| GenError::InvalidRequest("no image to animate".into()))?;

        let request = VideoGenerationRequest::new(motion_prompt, source.result.data_uri)
            .with_aspect_ratio(source.aspect_ratio);
        let video = self.videos.generate(&request).await?;
        let result = video.to_media_result();

        lock(&self.session).video = Some(Artifact {
            result: result.clone(),
            prompt: motion_prompt.to_string(),
            aspect_ratio: source.aspect_ratio,
        });
        Ok(result)
    }

    /// The image currently on display.
    pub fn current_image(&self) -> Option<Artifact> {
        lock(&self.session).image.clone()
    }

    /// The video currently on display.
    pub fn current_video(&self) -> Option<Artifact> {
        lock(&self.session).video.clone()
    }

    /// Saves the current image to the gallery.
    pub fn save_current_image(&self) -> Result<SaveOutcome> {
        let artifact = self
            .current_image()
            .ok_or_else(|| GenError::InvalidRequest("no image to save".into()))?;
        Ok(self.save(&artifact))
    }

    /// Saves the current video to the gallery.
    pub fn save_current_video(&self) -> Result<SaveOutcome> {
        let artifact = self
            .current_video()
            .ok_or_else(|| GenError::InvalidRequest("no video to save".into()))?;
        Ok(self.save(&artifact))
    }

    fn save(&self, artifact: &Artifact) -> SaveOutcome {
        let entry = GalleryEntry::new(&artifact.result, artifact.prompt.clone(), artifact.aspect_ratio);
        lock(&self.gallery).save(entry)
    }

    /// Removes a gallery entry. Unknown ids are ignored.
    pub fn delete(&self, id: &str) {
        lock(&self.gallery).delete(id);
    }

    /// Snapshot of the gallery, newest first.
    pub fn gallery_entries(&self) -> Vec<GalleryEntry> {
        lock(&self.gallery).entries().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::MemorySlot;
    use crate::image::{GeneratedImage, GenerationMetadata};
    use crate::video::{GeneratedVideo, VideoMetadata};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeImages {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl FakeImages {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ImageProvider for FakeImages {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(GenError::NoImageData);
            }
            Ok(GeneratedImage::new(vec![1, 2, 3], "image/png", GenerationMetadata::default()))
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeVideos {
        seen_aspect: Mutex<Option<AspectRatio>>,
    }

    #[async_trait]
    impl VideoProvider for FakeVideos {
        async fn generate(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo> {
            *self.seen_aspect.lock().unwrap() = Some(request.aspect_ratio);
            Ok(GeneratedVideo::new(vec![9, 9], "video/mp4", VideoMetadata::default()))
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn studio(images: FakeImages) -> Studio<FakeImages, FakeVideos, MemorySlot> {
        Studio::new(images, FakeVideos::default(), Gallery::load(MemorySlot::new()))
    }

    #[tokio::test]
    async fn test_generate_sets_current_image() {
        let studio = studio(FakeImages::new());
        let request = GenerationRequest::new("a cat").with_aspect_ratio(AspectRatio::Portrait);
        let result = studio.generate_image(&request).await.unwrap();

        assert_eq!(result.kind, MediaKind::Image);
        let current = studio.current_image().unwrap();
        assert_eq!(current.prompt, "a cat");
        assert_eq!(current.aspect_ratio, AspectRatio::Portrait);
        assert!(!studio.is_busy());
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_previous_state() {
        let studio = studio(FakeImages {
            fail: true,
            ..FakeImages::new()
        });
        let err = studio.generate_image(&GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GenError::NoImageData));
        assert!(studio.current_image().is_none());
        assert!(!studio.is_busy());
    }

    #[tokio::test]
    async fn test_concurrent_generation_is_rejected() {
        let studio = Arc::new(studio(FakeImages {
            delay: Duration::from_millis(100),
            ..FakeImages::new()
        }));
        let request = GenerationRequest::new("slow");

        let (a, b) = tokio::join!(studio.generate_image(&request), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            studio.generate_image(&request).await
        });
        assert!(a.is_ok());
        assert!(matches!(b, Err(GenError::Busy)));
        assert_eq!(studio.images.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_generation_releases_busy() {
        let studio = studio(FakeImages {
            delay: Duration::from_secs(5),
            ..FakeImages::new()
        });
        let request = GenerationRequest::new("abandoned");
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), studio.generate_image(&request)).await;
        assert!(timed_out.is_err());
        assert!(!studio.is_busy());
    }

    #[tokio::test]
    async fn test_animate_requires_image() {
        let studio = studio(FakeImages::new());
        assert!(matches!(
            studio.animate("zoom").await,
            Err(GenError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_animate_uses_image_aspect_ratio() {
        let studio = studio(FakeImages::new());
        let request = GenerationRequest::new("tower").with_aspect_ratio(AspectRatio::Portrait);
        studio.generate_image(&request).await.unwrap();

        let video = studio.animate("clouds drift").await.unwrap();
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(*studio.videos.seen_aspect.lock().unwrap(), Some(AspectRatio::Portrait));
        assert_eq!(studio.current_video().unwrap().prompt, "clouds drift");

        // A new image invalidates the old clip
        studio.generate_image(&request).await.unwrap();
        assert!(studio.current_video().is_none());
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let studio = studio(FakeImages::new());
        assert!(studio.save_current_image().is_err());

        studio.generate_image(&GenerationRequest::new("a fox")).await.unwrap();
        assert!(studio.save_current_image().unwrap().is_persisted());

        let entries = studio.gallery_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, MediaKind::Image);
        assert_eq!(entries[0].prompt, "a fox");

        studio.delete("missing");
        assert_eq!(studio.gallery_entries().len(), 1);
        studio.delete(&entries[0].id);
        assert!(studio.gallery_entries().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_entry_in_session() {
        let slot = MemorySlot::new();
        slot.set_fail_writes(true);
        let studio = Studio::new(FakeImages::new(), FakeVideos::default(), Gallery::load(slot));

        studio.generate_image(&GenerationRequest::new("a fox")).await.unwrap();
        let outcome = studio.save_current_image().unwrap();
        assert!(outcome.warning().is_some());
        assert_eq!(studio.gallery_entries().len(), 1);
    }

    #[test]
    fn test_set_current_image() {
        let studio = studio(FakeImages::new());
        studio.set_current_image(DataUri::from_bytes("image/jpeg", &[1]), "imported", AspectRatio::Landscape);
        let current = studio.current_image().unwrap();
        assert_eq!(current.result.data_uri.mime_type(), "image/jpeg");
    }
}
