//! Error types for generation and gallery operations.

use std::time::Duration;

/// Errors that can occur while generating media or persisting the gallery.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// No API credential configured.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// The server rejected the configured credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized server message.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-suggested wait, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The model response had no candidates.
    #[error("no candidates returned by the model")]
    NoCandidates,

    /// The first candidate carried no inline image part.
    #[error("no image data found in the response")]
    NoImageData,

    /// The video job finished with a server-reported error.
    #[error("video generation failed: {0}")]
    VideoJob(String),

    /// The video job finished without a video location.
    #[error("video generation completed but no video URI was returned")]
    NoVideoUri,

    /// Downloading the finished video failed.
    #[error("failed to fetch generated video: {message}")]
    VideoFetch {
        /// HTTP status of the download, if a response arrived.
        status: Option<u16>,
        /// What went wrong, with the credential redacted.
        message: String,
    },

    /// Polling gave up before the job finished.
    #[error("video job still running after {attempts} status checks")]
    Timeout {
        /// Status checks made before giving up.
        attempts: u32,
    },

    /// A generation is already running for this session.
    #[error("a generation is already in progress")]
    Busy,

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Failed to decode base64 or a data URI.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Writing the gallery slot failed; the entry lives only for this session.
    #[error("gallery write failed: {0}")]
    StorageWrite(String),

    /// Reading the gallery slot failed.
    #[error("gallery read failed: {0}")]
    StorageRead(String),

    /// Configuration file could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    /// Returns true if the error signals permission-denied or not-found.
    ///
    /// Checks the HTTP status first, then falls back to the symbolic codes
    /// Google APIs put in error bodies.
    pub fn is_permission_or_not_found(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                matches!(status, 403 | 404)
                    || contains_marker(message, &["403", "404", "PERMISSION_DENIED", "NOT_FOUND"])
            }
            _ => false,
        }
    }

    /// Returns true if the error signals a missing model or resource.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                *status == 404 || contains_marker(message, &["404", "NOT_FOUND"])
            }
            _ => false,
        }
    }

    /// Returns true if this error only degrades persistence and should not
    /// abort the action that triggered it.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageWrite(_) | Self::StorageRead(_))
    }
}

fn contains_marker(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| message.contains(m))
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenError>;

const MAX_ERROR_LEN: usize = 500;

/// Redacts credentials and truncates an error body before it is surfaced.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_ERROR_LEN));
    let mut rest = text;
    while let Some(idx) = rest.find("key=") {
        out.push_str(&rest[..idx + 4]);
        out.push_str("[REDACTED]");
        rest = &rest[idx + 4..];
        let end = rest
            .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
            .unwrap_or(rest.len());
        rest = &rest[end..];
    }
    out.push_str(rest);

    if out.chars().count() > MAX_ERROR_LEN {
        let truncated: String = out.chars().take(MAX_ERROR_LEN).collect();
        return format!("{truncated}...");
    }
    out
}

/// Builds an error from a non-success Google API response.
///
/// Google error bodies look like
/// `{"error": {"code": 403, "message": "...", "status": "PERMISSION_DENIED"}}`;
/// the symbolic status is kept in the message so marker checks still see it.
pub(crate) fn parse_api_error(
    status: u16,
    text: &str,
    headers: &reqwest::header::HeaderMap,
) -> GenError {
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return GenError::RateLimited { retry_after };
    }

    let message = serde_json::from_str::<GoogleErrorBody>(text)
        .ok()
        .map(|body| match body.error.status {
            Some(code) => format!("{} ({code})", body.error.message),
            None => body.error.message,
        })
        .unwrap_or_else(|| text.to_string());
    let message = sanitize_error_message(&message);

    let fallback_marked =
        contains_marker(&message, &["403", "404", "PERMISSION_DENIED", "NOT_FOUND"]);
    if !matches!(status, 401 | 403 | 404) && !fallback_marked {
        let lower = message.to_lowercase();
        if lower.contains("safety") || lower.contains("prohibited") || lower.contains("blocked") {
            return GenError::ContentBlocked(message);
        }
    }

    GenError::Api { status, message }
}

#[derive(serde::Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(serde::Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
