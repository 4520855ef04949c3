//! Core types used throughout the AIS library.

mod classify;
mod core;
mod events;

pub use classify::{ClassificationResult, Detection, DetectionFailure, Prediction};
pub use core::{
    AnalysisResult, Characteristics, ColorStats, Dimensions, DominantColor, EstimatedType,
    ImageElement, ImageInfo, ImageMetadata, PageStatistics,
};
pub use events::{ControllerEvent, DetectionSummaryData, TagState};
