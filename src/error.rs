use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum AisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image has zero dimensions")]
    ZeroSizeImage,

    #[error("A processing pass is already active")]
    PassActive,

    #[error("Image already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Failed to load image {url}: {message}")]
    ImageLoad { url: String, message: String },

    #[error("Page error: {0}")]
    Page(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl AisError {
    pub fn config(message: impl Into<String>) -> Self {
        AisError::Config(message.into())
    }

    pub fn page(message: impl Into<String>) -> Self {
        AisError::Page(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        AisError::Store(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            AisError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            AisError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            AisError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            AisError::Image(e) => ErrorPayload::new(
                ErrorCategory::Image,
                e.to_string(),
                "Verify image path/format and readability.",
            ),
            AisError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs; run with --verbose for details.",
            ),
            AisError::ZeroSizeImage => ErrorPayload::new(
                ErrorCategory::Image,
                self.to_string(),
                "The image decoded to an empty pixel grid; check the source.",
            ),
            AisError::PassActive => ErrorPayload::new(
                ErrorCategory::Processing,
                self.to_string(),
                "Wait for the current pass to finish or call stop first.",
            ),
            AisError::AlreadyProcessed(_) => ErrorPayload::new(
                ErrorCategory::Processing,
                self.to_string(),
                "A result for this URL is already recorded for the current page.",
            ),
            AisError::ImageLoad { .. } => ErrorPayload::new(
                ErrorCategory::Image,
                self.to_string(),
                "Verify the image URL is reachable and decodes as a supported format.",
            ),
            AisError::Page(msg) => ErrorPayload::new(
                ErrorCategory::Page,
                msg.to_string(),
                "Verify the page snapshot source and its JSON shape.",
            ),
            AisError::Store(msg) => ErrorPayload::new(
                ErrorCategory::Store,
                msg.to_string(),
                "Check the store file path and permissions.",
            ),
            AisError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags/paths and the TOML config file.",
            ),
            AisError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

impl From<FetchError> for AisError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Request(e) => AisError::Network(e),
            FetchError::Status { url, status } => AisError::ImageLoad {
                url,
                message: format!("server returned status {}", status.as_u16()),
            },
            FetchError::Decode { url, source } => AisError::ImageLoad {
                url,
                message: source.to_string(),
            },
            FetchError::NotFound(path) => AisError::Config(format!("File not found: {}", path)),
        }
    }
}

pub type Result<T> = std::result::Result<T, AisError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Image,
    Page,
    Processing,
    Store,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_active_maps_to_processing_category() {
        let payload = AisError::PassActive.to_payload();
        assert_eq!(payload.category, ErrorCategory::Processing);
        assert!(payload.remediation.is_some());
    }

    #[test]
    fn image_load_payload_names_the_url() {
        let err = AisError::ImageLoad {
            url: "https://example.com/a.png".to_string(),
            message: "server returned status 404".to_string(),
        };
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Image);
        assert!(
            payload.message.contains("https://example.com/a.png"),
            "expected message to name the failing URL, got: {}",
            payload.message
        );
    }

    #[test]
    fn fetch_not_found_becomes_config_error() {
        let err: AisError = FetchError::NotFound("missing.png".to_string()).into();
        assert!(matches!(err, AisError::Config(_)));
    }
}
