//! CLI for Lumiframe - image and video generation with a local gallery.

use clap::{Args, Parser, Subcommand, ValueEnum};
use lumiframe::config::default_config_path;
use lumiframe::{
    AspectRatio, Config, ConfigBuilder, DataUri, FileSlot, Gallery, GeminiProvider,
    GenerationRequest, ImageFormat, ImageModel, ImageProvider, MediaResult, Resolution,
    SaveOutcome, Studio, VeoProvider, VideoModel, VideoProvider,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lumiframe")]
#[command(about = "Generate images with Gemini, animate them with Veo, keep the results in a gallery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Image(ImageArgs),

    /// Animate a still image into a short video
    Animate(AnimateArgs),

    /// Inspect or edit the saved gallery
    Gallery {
        #[command(subcommand)]
        action: GalleryAction,
    },

    /// List the models used for generation
    Models,

    /// Verify the API key can reach the image and video models
    Check,
}

#[derive(Args)]
struct ImageArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Aspect ratio
    #[arg(long, value_enum, default_value = "16:9")]
    aspect_ratio: AspectRatioArg,

    /// Output resolution (ignored by the fast model)
    #[arg(long, value_enum, default_value = "1K")]
    resolution: ResolutionArg,

    /// Model tier
    #[arg(short, long, value_enum, default_value = "standard")]
    model: ModelArg,

    /// Also save the image to the gallery
    #[arg(long)]
    save: bool,
}

#[derive(Args)]
struct AnimateArgs {
    /// Motion prompt describing what should happen
    prompt: String,

    /// Source image: a file path or a data URI
    #[arg(short, long)]
    image: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Aspect ratio; anything other than 9:16 renders landscape
    #[arg(long, default_value = "16:9")]
    aspect_ratio: String,

    /// Also save the video to the gallery
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum GalleryAction {
    /// List saved entries, newest first
    List,

    /// Delete an entry by id
    Delete {
        /// Entry id
        id: String,
    },

    /// Write an entry's media to a file
    Export {
        /// Entry id
        id: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    #[value(name = "1K")]
    OneK,
    #[value(name = "2K")]
    TwoK,
    #[value(name = "4K")]
    FourK,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::OneK => Resolution::OneK,
            ResolutionArg::TwoK => Resolution::TwoK,
            ResolutionArg::FourK => Resolution::FourK,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Standard,
    Fast,
}

impl From<ModelArg> for ImageModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Standard => ImageModel::Standard,
            ModelArg::Fast => ImageModel::Fast,
        }
    }
}

type CliStudio = Studio<GeminiProvider, VeoProvider, FileSlot>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lumiframe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let builder = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Image(args) => {
            generate_image(args, builder, cli.json).await?;
        }
        Commands::Animate(args) => {
            animate(args, builder, cli.json).await?;
        }
        Commands::Gallery { action } => {
            gallery(action, &builder, cli.json)?;
        }
        Commands::Models => {
            list_models(cli.json, cli.config.as_deref())?;
        }
        Commands::Check => {
            check(builder, cli.json).await?;
        }
    }

    Ok(())
}

fn studio(builder: ConfigBuilder) -> anyhow::Result<CliStudio> {
    let config = builder.build()?;
    let gallery = Gallery::load(FileSlot::new(config.gallery_path()));
    Ok(Studio::new(
        GeminiProvider::new(config.clone()),
        VeoProvider::new(config),
        gallery,
    ))
}

async fn generate_image(args: ImageArgs, builder: ConfigBuilder, json_output: bool) -> anyhow::Result<()> {
    let studio = studio(builder)?;
    let request = GenerationRequest::new(&args.prompt)
        .with_aspect_ratio(args.aspect_ratio.into())
        .with_resolution(args.resolution.into())
        .with_model(args.model.into());

    let result = studio.generate_image(&request).await?;
    let size = write_media(&result, &args.output)?;
    let saved = args.save.then(|| studio.save_current_image()).transpose()?;

    report(&result, &args.output, size, saved.as_ref(), json_output)
}

async fn animate(args: AnimateArgs, builder: ConfigBuilder, json_output: bool) -> anyhow::Result<()> {
    let studio = studio(builder)?;
    let source = read_source_image(&args.image)?;
    studio.set_current_image(source, "", AspectRatio::normalize(&args.aspect_ratio));

    if !json_output {
        eprintln!("Animating... this can take several minutes (Ctrl-C to abandon)");
    }

    let result = tokio::select! {
        result = studio.animate(&args.prompt) => result?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("cancelled; the video job was abandoned");
        }
    };

    let size = write_media(&result, &args.output)?;
    let saved = args.save.then(|| studio.save_current_video()).transpose()?;

    report(&result, &args.output, size, saved.as_ref(), json_output)
}

/// Accepts a data URI or a path to an image file.
fn read_source_image(input: &str) -> anyhow::Result<DataUri> {
    if input.starts_with("data:") {
        return Ok(DataUri::parse(input)?);
    }
    let bytes = std::fs::read(input)?;
    let mime = ImageFormat::from_magic_bytes(&bytes)
        .or_else(|| {
            Path::new(input)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .unwrap_or(ImageFormat::Png)
        .mime_type();
    Ok(DataUri::from_bytes(mime, &bytes))
}

fn write_media(result: &MediaResult, output: &Path) -> anyhow::Result<usize> {
    let bytes = result.data_uri.decode()?;
    std::fs::write(output, &bytes)?;
    Ok(bytes.len())
}

fn report(
    result: &MediaResult,
    output: &Path,
    size: usize,
    saved: Option<&SaveOutcome>,
    json_output: bool,
) -> anyhow::Result<()> {
    let warning = saved.and_then(SaveOutcome::warning).map(|e| e.to_string());

    if json_output {
        let json = serde_json::json!({
            "type": result.kind.to_string(),
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": size,
            "mime_type": result.data_uri.mime_type(),
            "saved": saved.map(SaveOutcome::is_persisted),
            "warning": warning,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!(
            "Generated {}: {} ({} bytes, {})",
            result.kind,
            output.display(),
            size,
            result.data_uri.mime_type()
        );
        match (saved, warning) {
            (Some(_), Some(w)) => eprintln!("Warning: saved for this session only ({w})"),
            (Some(_), None) => println!("Saved to gallery"),
            (None, _) => {}
        }
    }

    Ok(())
}

fn gallery(action: GalleryAction, builder: &ConfigBuilder, json_output: bool) -> anyhow::Result<()> {
    let mut gallery = Gallery::load(FileSlot::new(builder.resolved_gallery_path()));

    match action {
        GalleryAction::List => {
            if json_output {
                let entries: Vec<_> = gallery
                    .entries()
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "id": e.id,
                            "kind": e.kind,
                            "prompt": e.prompt,
                            "createdAt": e.created_at,
                            "aspectRatio": e.aspect_ratio,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if gallery.is_empty() {
                println!("Gallery is empty");
            } else {
                for e in gallery.entries() {
                    let when = e
                        .created_at_utc()
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "{}  {:<5} {:<4} {}  {}",
                        e.id,
                        e.kind.to_string(),
                        e.aspect_ratio.to_string(),
                        when,
                        e.prompt
                    );
                }
            }
        }
        GalleryAction::Delete { id } => {
            gallery.delete(&id);
            if !json_output {
                println!("Deleted {id}");
            }
        }
        GalleryAction::Export { id, output } => {
            let entry = gallery
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("no gallery entry with id {id}"))?;
            entry.export(&output)?;
            if !json_output {
                println!("Exported {} to {}", id, output.display());
            }
        }
    }

    Ok(())
}

fn list_models(json_output: bool, config: Option<&Path>) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ModelInfo {
        id: &'static str,
        media_type: &'static str,
        role: &'static str,
    }

    let models = [
        ModelInfo {
            id: ImageModel::Standard.as_str(),
            media_type: "image",
            role: "default",
        },
        ModelInfo {
            id: ImageModel::Fast.as_str(),
            media_type: "image",
            role: "fallback on permission/not-found",
        },
        ModelInfo {
            id: VideoModel::Fast.as_str(),
            media_type: "video",
            role: "default",
        },
        ModelInfo {
            id: VideoModel::Standard.as_str(),
            media_type: "video",
            role: "fallback on not-found",
        },
    ];

    if json_output {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        println!("IMAGE:");
        for m in models.iter().filter(|m| m.media_type == "image") {
            println!("  {} ({})", m.id, m.role);
        }
        println!("\nVIDEO:");
        for m in models.iter().filter(|m| m.media_type == "video") {
            println!("  {} ({})", m.id, m.role);
        }
        let path = config.map(PathBuf::from).unwrap_or_else(default_config_path);
        println!("\nAPI key: GEMINI_API_KEY, GOOGLE_API_KEY, or [api] api_key in {}", path.display());
    }

    Ok(())
}

async fn check(builder: ConfigBuilder, json_output: bool) -> anyhow::Result<()> {
    let config = builder.build()?;
    let image = GeminiProvider::new(config.clone());
    let video = VeoProvider::new(config);

    let results = [
        (image.name().to_string(), image.health_check().await),
        (video.name().to_string(), video.health_check().await),
    ];

    if json_output {
        let json: Vec<_> = results
            .iter()
            .map(|(name, r)| {
                serde_json::json!({
                    "provider": name,
                    "ok": r.is_ok(),
                    "error": r.as_ref().err().map(|e| e.to_string()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for (name, r) in &results {
            match r {
                Ok(()) => println!("  \u{2713} {name}"),
                Err(e) => println!("  \u{2717} {name}: {e}"),
            }
        }
    }

    if results.iter().any(|(_, r)| r.is_err()) {
        anyhow::bail!("one or more providers are unavailable");
    }
    Ok(())
}
