//! Basic image generation example.
//!
//! Run with: `cargo run --example generate_image`
//!
//! Requires `GEMINI_API_KEY` or `GOOGLE_API_KEY` environment variable.

use lumiframe::{AspectRatio, Config, GeminiProvider, GenerationRequest, ImageProvider, Resolution};

#[tokio::main]
async fn main() -> lumiframe::Result<()> {
    let config = Config::load(None)?.build()?;
    let provider = GeminiProvider::new(config);

    let request = GenerationRequest::new("A golden retriever puppy playing in snow")
        .with_aspect_ratio(AspectRatio::Landscape)
        .with_resolution(Resolution::TwoK);
    let image = provider.generate(&request).await?;

    image.save("output.png")?;
    println!(
        "Generated image: {} bytes, {} (model: {:?}, fallback: {})",
        image.size(),
        image.mime_type,
        image.metadata.model,
        image.metadata.fallback_used
    );

    Ok(())
}
