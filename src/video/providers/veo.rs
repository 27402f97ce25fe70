//! Veo (Google) video generation provider.

use crate::config::Config;
use crate::error::{parse_api_error, sanitize_error_message, GenError, Result};
use crate::video::provider::VideoProvider;
use crate::video::types::{
    GeneratedVideo, VideoGenerationRequest, VideoMetadata, VideoModel, VIDEO_RESOLUTION,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Veo image-to-video provider.
///
/// Jobs are submitted to [`VideoModel::Fast`] and resubmitted once to
/// [`VideoModel::Standard`] if the fast model is not found. The job is then
/// polled every `poll_interval` up to `max_poll_attempts` times.
pub struct VeoProvider {
    client: reqwest::Client,
    config: Config,
}

impl VeoProvider {
    /// Creates a provider from a resolved config.
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn generate_impl(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo> {
        request.validate()?;
        let start = Instant::now();
        let body = VeoRequest::new(request);

        let (model, fallback_used, operation) = match self.submit(VideoModel::Fast, &body).await {
            Ok(operation) => (VideoModel::Fast, false, operation),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    from = VideoModel::Fast.as_str(),
                    to = VideoModel::Standard.as_str(),
                    "video model not found, resubmitting: {e}"
                );
                let operation = self.submit(VideoModel::Standard, &body).await?;
                (VideoModel::Standard, true, operation)
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(operation = %operation.name, model = model.as_str(), "submitted video job");

        let (operation, poll_attempts) = self.wait_for(operation).await?;
        let video_uri = extract_video_uri(operation)?;
        tracing::debug!(poll_attempts, "video job complete");

        let (data, mime_type) = self.download(&video_uri).await?;

        Ok(GeneratedVideo::new(
            data,
            mime_type,
            VideoMetadata {
                model: Some(model.as_str().to_string()),
                fallback_used,
                poll_attempts,
                duration_ms: Some(start.elapsed().as_millis() as u64),
                resolution: Some(VIDEO_RESOLUTION.to_string()),
            },
        ))
    }

    async fn submit(&self, model: VideoModel, body: &VeoRequest) -> Result<VeoOperation> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.config.base_url(),
            model.as_str(),
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.config.api_key())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }

    /// Polls until the operation is done. Returns the final operation and the
    /// number of status checks made.
    async fn wait_for(&self, mut operation: VeoOperation) -> Result<(VeoOperation, u32)> {
        let start = Instant::now();
        let mut attempts = 0;

        while !operation.done {
            if let Some(err) = operation.error.take() {
                return Err(GenError::VideoJob(
                    err.message.unwrap_or_else(|| "Unknown error".into()),
                ));
            }
            if attempts >= self.config.max_poll_attempts() {
                return Err(GenError::Timeout { attempts });
            }

            tokio::time::sleep(self.config.poll_interval()).await;
            operation = self.poll(&operation.name).await?;
            attempts += 1;

            tracing::debug!(
                operation = %operation.name,
                attempts,
                elapsed_secs = start.elapsed().as_secs(),
                done = operation.done,
                "polled video job"
            );
        }

        Ok((operation, attempts))
    }

    async fn poll(&self, operation_name: &str) -> Result<VeoOperation> {
        let url = format!("{}/{}", self.config.base_url(), operation_name);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.config.api_key())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &text, &headers));
        }

        let mut operation: VeoOperation = response.json().await?;
        if operation.name.is_empty() {
            operation.name = operation_name.to_string();
        }
        Ok(operation)
    }

    async fn download(&self, uri: &str) -> Result<(Vec<u8>, String)> {
        if uri.starts_with("gs://") {
            return Err(GenError::VideoJob(format!(
                "Veo returned a Google Cloud Storage URI ({uri}) which cannot be fetched directly"
            )));
        }

        let url = with_key_param(uri, self.config.api_key())?;
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", self.config.api_key())
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenError::VideoFetch {
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());

        let bytes = response.bytes().await.map_err(fetch_error)?;
        Ok((bytes.to_vec(), mime_type))
    }
}

/// Appends the credential as a percent-encoded `key` query parameter.
fn with_key_param(uri: &str, api_key: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(uri).map_err(|e| GenError::VideoFetch {
        status: None,
        message: format!("invalid video URI: {e}"),
    })?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Transport failures during the download; the URL is dropped so the key stays out.
fn fetch_error(err: reqwest::Error) -> GenError {
    GenError::VideoFetch {
        status: err.status().map(|s| s.as_u16()),
        message: sanitize_error_message(&err.without_url().to_string()),
    }
}

/// Pulls the first video location out of a finished operation.
fn extract_video_uri(operation: VeoOperation) -> Result<String> {
    let VeoOperation {
        response, error, ..
    } = operation;

    if let Some(err) = error {
        return Err(GenError::VideoJob(
            err.message.unwrap_or_else(|| "Unknown error".into()),
        ));
    }

    let Some(resp) = response else {
        return Err(GenError::NoVideoUri);
    };

    if let Some(gen_resp) = resp.generate_video_response {
        let samples = gen_resp.generated_samples.unwrap_or_default();
        if gen_resp.rai_media_filtered_count.unwrap_or(0) > 0 && samples.is_empty() {
            let reason = gen_resp
                .rai_media_filtered_reasons
                .and_then(|r| r.into_iter().next())
                .unwrap_or_else(|| "Video was filtered by Veo safety filters".into());
            return Err(GenError::ContentBlocked(reason));
        }
        if let Some(uri) = samples.into_iter().find_map(|s| s.video.and_then(|v| v.uri)) {
            return Ok(uri);
        }
    }

    resp.generated_videos
        .unwrap_or_default()
        .into_iter()
        .find_map(|s| s.video.and_then(|v| v.uri))
        .ok_or(GenError::NoVideoUri)
}

#[async_trait]
impl VideoProvider for VeoProvider {
    async fn generate(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        "Veo (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!(
            "{}/models/{}",
            self.config.base_url(),
            VideoModel::Fast.as_str(),
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

// ── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
struct VeoInstance {
    prompt: String,
    image: VeoMediaData,
}

/// Media payload wrapping `inlineData`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoMediaData {
    inline_data: VeoInlineData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    aspect_ratio: String,
    resolution: String,
    number_of_videos: u32,
}

impl VeoRequest {
    fn new(req: &VideoGenerationRequest) -> Self {
        Self {
            instances: vec![VeoInstance {
                prompt: req.prompt.clone(),
                image: VeoMediaData {
                    inline_data: VeoInlineData {
                        mime_type: req.source_image.mime_type().to_string(),
                        data: req.source_image.payload().to_string(),
                    },
                },
            }],
            parameters: VeoParameters {
                aspect_ratio: req.aspect_ratio.as_str().to_string(),
                resolution: VIDEO_RESOLUTION.to_string(),
                number_of_videos: 1,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct VeoOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<VeoVideoResponse>,
    #[serde(default)]
    error: Option<VeoError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    /// REST shape: `generateVideoResponse.generatedSamples[]`.
    #[serde(default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
    /// SDK shape: `generatedVideos[]`.
    #[serde(default)]
    generated_videos: Option<Vec<VeoGeneratedSample>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoGenerateVideoResponse {
    #[serde(default)]
    generated_samples: Option<Vec<VeoGeneratedSample>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    rai_media_filtered_reasons: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct VeoGeneratedSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Deserialize)]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeoError {
    #[serde(default)]
    message: Option<String>,
}
