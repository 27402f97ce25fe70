//! Gemini (Google) image generation provider.

use crate::config::Config;
use crate::error::{parse_api_error, GenError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{GeneratedImage, GenerationMetadata, GenerationRequest, ImageModel};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gemini image generation provider.
///
/// Requests for [`ImageModel::Standard`] that fail with a permission-denied or
/// not-found error are retried once on [`ImageModel::Fast`].
pub struct GeminiProvider {
    client: reqwest::Client,
    config: Config,
}

impl GeminiProvider {
    /// Creates a provider from a resolved config.
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let start = Instant::now();

        let (model, fallback_used, image) = match request.model {
            ImageModel::Fast => (ImageModel::Fast, false, self.call_model(ImageModel::Fast, request).await?),
            ImageModel::Standard => match self.call_model(ImageModel::Standard, request).await {
                Ok(image) => (ImageModel::Standard, false, image),
                Err(e) if e.is_permission_or_not_found() => {
                    tracing::warn!(
                        from = ImageModel::Standard.as_str(),
                        to = ImageModel::Fast.as_str(),
                        "image model unavailable, falling back: {e}"
                    );
                    (ImageModel::Fast, true, self.call_model(ImageModel::Fast, request).await?)
                }
                Err(e) => return Err(e),
            },
        };

        let data = base64::engine::general_purpose::STANDARD
            .decode(&image.data)
            .map_err(|e| GenError::Decode(e.to_string()))?;

        Ok(GeneratedImage::new(
            data,
            image.mime_type,
            GenerationMetadata {
                model: Some(model.as_str().to_string()),
                fallback_used,
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        ))
    }

    async fn call_model(&self, model: ImageModel, request: &GenerationRequest) -> Result<InlineData> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url(),
            model.as_str(),
        );
        let body = GeminiRequest::new(request, model);
        tracing::debug!(model = model.as_str(), "requesting image");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.config.api_key())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        extract_image(gemini_response)
    }
}

/// Picks the first inline data part of the first candidate.
fn extract_image(response: GeminiResponse) -> Result<InlineData> {
    // Blocked prompts come back as HTTP 200 with prompt feedback
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
            return Err(GenError::ContentBlocked(msg));
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenError::NoCandidates)?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        if matches!(
            finish_reason.as_str(),
            "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST"
        ) {
            return Err(GenError::ContentBlocked(format!(
                "Content blocked by Gemini safety filter: {finish_reason}"
            )));
        }
    }

    candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
        .ok_or(GenError::NoImageData)
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!(
            "{}/models/{}",
            self.config.base_url(),
            ImageModel::Standard.as_str(),
        );

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.config.api_key())
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(GenError::Auth("API key was rejected".into())),
            s if !(200..300).contains(&s) => Err(GenError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

impl GeminiRequest {
    fn new(req: &GenerationRequest, model: ImageModel) -> Self {
        let image_size = model
            .supports_resolution()
            .then(|| req.resolution.as_str().to_string());

        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiTextPart {
                    text: req.prompt.clone(),
                }],
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: ImageConfig {
                    aspect_ratio: req.aspect_ratio.as_str().to_string(),
                    image_size,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}
