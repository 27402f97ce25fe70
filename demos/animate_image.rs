//! Generate a still, animate it, and keep both in the gallery.
//!
//! Run with: `cargo run --example animate_image`
//!
//! Requires `GEMINI_API_KEY` or `GOOGLE_API_KEY` environment variable.
//! Video jobs usually take a few minutes.

use lumiframe::{
    AspectRatio, Config, FileSlot, Gallery, GeminiProvider, GenerationRequest, Studio, VeoProvider,
};

#[tokio::main]
async fn main() -> lumiframe::Result<()> {
    let config = Config::load(None)?.build()?;
    let gallery = Gallery::load(FileSlot::new(config.gallery_path()));
    let studio = Studio::new(
        GeminiProvider::new(config.clone()),
        VeoProvider::new(config),
        gallery,
    );

    let request = GenerationRequest::new("A paper boat on a rainy street, cinematic")
        .with_aspect_ratio(AspectRatio::Portrait);
    studio.generate_image(&request).await?;
    if let Some(warning) = studio.save_current_image()?.warning() {
        eprintln!("image not persisted: {warning}");
    }

    let video = studio.animate("The boat drifts forward as raindrops ripple").await?;
    std::fs::write("boat.mp4", video.data_uri.decode()?)?;
    if let Some(warning) = studio.save_current_video()?.warning() {
        eprintln!("video not persisted: {warning}");
    }

    println!("Gallery now holds {} entries", studio.gallery_entries().len());
    Ok(())
}
