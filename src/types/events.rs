//! Events emitted by the processing controller.
//!
//! Presentation consumers (the CLI renderer, the message bridge) receive these
//! over an unbounded channel; they read state but never originate processing
//! decisions.

use serde::{Deserialize, Serialize};

use super::classify::Detection;
use super::core::{AnalysisResult, PageStatistics};

/// Visual state of an image's overlay tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagState {
    /// The image is mid-pipeline.
    Processing,
    /// Classification settled successfully.
    Verdict(Detection),
    /// Classification failed; analysis is recorded without a verdict.
    DetectionFailed,
    /// The image could not be fetched or decoded.
    LoadFailed,
}

/// Aggregate detection counters, emitted after a classification updates the
/// page statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummaryData {
    pub ai_count: u32,
    pub human_count: u32,
    pub total_processed: u32,
    pub average_confidence: f64,
}

impl From<&PageStatistics> for DetectionSummaryData {
    fn from(stats: &PageStatistics) -> Self {
        Self {
            ai_count: stats.ai_count,
            human_count: stats.human_count,
            total_processed: stats.total_processed,
            average_confidence: stats.average_confidence,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Update the visual tag for one image.
    TagUpdate { url: String, state: TagState },
    /// One more entry settled; `total` is fixed for the whole pass.
    Progress { current: usize, total: usize },
    /// Statistics changed after a successful classification. Emitted after
    /// the progress event for the same image, never before.
    DetectionSummary(DetectionSummaryData),
    /// A result was recorded for `url`.
    ImageProcessed { url: String, result: AnalysisResult },
}
