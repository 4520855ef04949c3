//! Fundamental data structures:
//! - [`ImageInfo`] / [`ImageElement`] - what discovery hands to the pipeline
//! - [`AnalysisResult`] - the per-image record produced by the analyzer
//! - [`PageStatistics`] - aggregate counters owned by the controller

use serde::{Deserialize, Serialize};

use super::classify::{ClassificationResult, Detection, Prediction};

/// Immutable snapshot of an image's source metadata, captured at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub title: String,
}

/// A reference to an image element on the page, with its rendered size.
///
/// Rendered dimensions are measured by the page collaborator, not read from
/// the image file; they can change as layout settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl ImageElement {
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            src: self.src.clone(),
            alt: self.alt.clone(),
            title: self.title.clone(),
        }
    }
}

/// Pixel dimensions plus the width/height ratio, formatted to two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: String,
}

/// Whichever channel average strictly exceeds the other two; ties are Balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DominantColor {
    Red,
    Green,
    Blue,
    Balanced,
}

/// Coarse classification of the image content, by priority order:
/// brightness extremes first, then channel spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatedType {
    #[serde(rename = "Dark/Low-light")]
    DarkLowLight,
    #[serde(rename = "Bright/Overexposed")]
    BrightOverexposed,
    Grayscale,
    Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStats {
    pub average_red: u8,
    pub average_green: u8,
    pub average_blue: u8,
    pub dominant_color: DominantColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Characteristics {
    pub brightness: u8,
    pub is_dark: bool,
    pub is_colorful: bool,
    pub estimated_type: EstimatedType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub alt: String,
    pub title: String,
    pub url: String,
}

/// The per-image analysis record.
///
/// Immutable once constructed, except that `ai_detection` is attached exactly
/// once (success or failure variant) after the classification settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub dimensions: Dimensions,
    pub colors: ColorStats,
    pub characteristics: Characteristics,
    pub metadata: ImageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_detection: Option<ClassificationResult>,
}

impl AnalysisResult {
    /// The successful detection attached to this result, if any.
    pub fn detection(&self) -> Option<&Detection> {
        match &self.ai_detection {
            Some(ClassificationResult::Success(d)) => Some(d),
            _ => None,
        }
    }
}

/// Aggregate counters for the current page lifecycle.
///
/// `processed_count` counts every settled entry, decode errors included.
/// `total_processed` counts successful classifications and always equals
/// `ai_count + human_count`; `average_confidence` is a running mean over
/// those classifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStatistics {
    pub processed_count: u32,
    pub total_processed: u32,
    pub ai_count: u32,
    pub human_count: u32,
    pub average_confidence: f64,
}

impl PageStatistics {
    /// Incremental update after a successful classification.
    /// newAvg = (oldAvg * (n - 1) + confidence) / n
    pub(crate) fn record_detection(&mut self, detection: &Detection) {
        self.total_processed += 1;
        match detection.prediction {
            Prediction::Artificial => self.ai_count += 1,
            Prediction::Human => self.human_count += 1,
        }
        let n = self.total_processed as f64;
        self.average_confidence =
            (self.average_confidence * (n - 1.0) + detection.confidence) / n;
    }
}
