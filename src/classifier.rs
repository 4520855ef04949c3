//! Remote detector client.
//!
//! Packages an RGBA grid as a compressed JPEG, submits it to the detection
//! endpoint as a multipart upload, and converts the duck-typed response into
//! the typed [`ClassificationResult`] exactly once, at this boundary. The
//! client never returns an error to the pipeline: every transport, status,
//! or application failure becomes the `Failure` variant. No retry, no
//! caching; each invocation is a fresh call.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::RgbaImage;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{AisError, Result};
use crate::types::{ClassificationResult, Detection, Prediction};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_JPEG_QUALITY: u8 = 90;

#[async_trait]
pub trait Detector: Send + Sync {
    /// Classify one image. Always resolves to a value; failures are data.
    async fn detect(&self, image: &RgbaImage) -> ClassificationResult;
}

#[derive(Debug, Clone)]
pub struct DetectorClient {
    http: Client,
    endpoint: Url,
    jpeg_quality: u8,
}

impl DetectorClient {
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Self::with_timeout_and_quality(endpoint, DEFAULT_TIMEOUT, DEFAULT_JPEG_QUALITY)
    }

    pub fn with_timeout_and_quality(
        endpoint: impl AsRef<str>,
        timeout: Duration,
        jpeg_quality: u8,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        if jpeg_quality == 0 || jpeg_quality > 100 {
            return Err(AisError::config("jpeg_quality must be in 1..=100"));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AisError::Network)?;

        Ok(Self {
            http,
            endpoint,
            jpeg_quality,
        })
    }

    /// JPEG-encode the pixel grid to bound the upload size.
    fn encode_jpeg(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
        // JPEG has no alpha channel; flatten first.
        let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)?;
        Ok(buf.into_inner())
    }

    async fn submit(&self, jpeg: Vec<u8>) -> Result<DetectApiResponse> {
        let part = Part::bytes(jpeg)
            .file_name("image.jpg")
            .mime_str("image/jpeg")
            .map_err(AisError::Network)?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(AisError::Network)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AisError::Unknown(format!(
                "detector returned status {}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&body).map_err(AisError::Serialization)
    }
}

#[async_trait]
impl Detector for DetectorClient {
    async fn detect(&self, image: &RgbaImage) -> ClassificationResult {
        let jpeg = match self.encode_jpeg(image) {
            Ok(bytes) => bytes,
            Err(e) => return ClassificationResult::failure(e.to_string()),
        };

        debug!(endpoint = %self.endpoint, bytes = jpeg.len(), "submitting image for detection");

        match self.submit(jpeg).await {
            Ok(response) => convert_response(response),
            Err(e) => ClassificationResult::failure(e.to_string()),
        }
    }
}

/// Raw response shape of the detection endpoint. Optional everywhere; the
/// strict validation happens in [`convert_response`].
#[derive(Debug, Deserialize)]
struct DetectApiResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Option<RawProbabilities>,
    #[serde(default)]
    prediction: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawProbabilities {
    human: f64,
    artificial: f64,
}

fn convert_response(response: DetectApiResponse) -> ClassificationResult {
    if !response.success {
        let message = response
            .error
            .unwrap_or_else(|| "detector reported failure without a message".to_string());
        return ClassificationResult::failure(message);
    }

    let (results, prediction, confidence) =
        match (response.results, response.prediction, response.confidence) {
            (Some(r), Some(p), Some(c)) => (r, p, c),
            _ => {
                return ClassificationResult::failure(
                    "malformed detector response: missing results, prediction, or confidence",
                )
            }
        };

    let prediction = match prediction.as_str() {
        "human" => Prediction::Human,
        "artificial" => Prediction::Artificial,
        other => {
            return ClassificationResult::failure(format!(
                "malformed detector response: unknown prediction '{other}'"
            ))
        }
    };

    ClassificationResult::Success(Detection {
        human_probability: results.human,
        artificial_probability: results.artificial,
        prediction,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn successful_response_converts_to_detection() {
        let response: DetectApiResponse = serde_json::from_str(
            r#"{
                "success": true,
                "results": {"human": 0.15, "artificial": 0.85},
                "prediction": "artificial",
                "confidence": 0.85
            }"#,
        )
        .unwrap();

        let result = convert_response(response);
        let detection = result.as_success().expect("should be success");
        assert_eq!(detection.prediction, Prediction::Artificial);
        assert!((detection.confidence - 0.85).abs() < 1e-9);
        assert!((detection.human_probability - 0.15).abs() < 1e-9);
    }

    #[test]
    fn application_failure_converts_to_failure() {
        let response: DetectApiResponse =
            serde_json::from_str(r#"{"success": false, "error": "model overloaded"}"#).unwrap();

        match convert_response(response) {
            ClassificationResult::Failure(f) => assert_eq!(f.error_message, "model overloaded"),
            ClassificationResult::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn missing_fields_on_success_are_rejected_as_malformed() {
        let response: DetectApiResponse =
            serde_json::from_str(r#"{"success": true, "prediction": "human"}"#).unwrap();

        match convert_response(response) {
            ClassificationResult::Failure(f) => {
                assert!(f.error_message.contains("malformed"), "{}", f.error_message)
            }
            ClassificationResult::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn unknown_prediction_label_is_rejected() {
        let response: DetectApiResponse = serde_json::from_str(
            r#"{
                "success": true,
                "results": {"human": 0.5, "artificial": 0.5},
                "prediction": "alien",
                "confidence": 0.5
            }"#,
        )
        .unwrap();

        assert!(!convert_response(response).is_success());
    }

    #[test]
    fn encode_jpeg_produces_decodable_bytes() {
        let client = DetectorClient::new("http://localhost:9/api/detect").unwrap();
        let img = RgbaImage::from_pixel(16, 16, Rgba([120, 80, 40, 255]));

        let jpeg = client.encode_jpeg(&img).unwrap();
        assert!(!jpeg.is_empty());

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn client_rejects_out_of_range_quality() {
        let err = DetectorClient::with_timeout_and_quality(
            "http://localhost:9/api/detect",
            Duration::from_secs(1),
            0,
        );
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_failure_not_panic() {
        // Port 9 (discard) is not listening; the call must settle as Failure.
        let client = DetectorClient::with_timeout_and_quality(
            "http://127.0.0.1:9/api/detect",
            Duration::from_millis(200),
            90,
        )
        .unwrap();
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));

        let result = client.detect(&img).await;
        assert!(!result.is_success());
    }
}
