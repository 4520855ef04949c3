//! AI Image Scanner (AIS) Library
//!
//! A library for finding the images on a web page, analyzing their pixel
//! statistics locally, and classifying each one as human-made or AI-generated
//! through a remote detection service.
//!
//! # Module Overview
//!
//! - [`page`] - Page access abstraction (snapshots + insertion events)
//! - [`discovery`] - Candidate qualification and dynamic-insertion watching
//! - [`analyzer`] - Local pixel statistics
//! - [`classifier`] - Remote detector client
//! - [`controller`] - Processing queue and single-flight controller
//! - [`bridge`] - Cross-context message protocol and relay
//! - [`store`] - Durable result store
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types and structures
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ais_lib::{ControllerOptions, DetectorClient, Discovery, HttpImageFetcher};
//! use ais_lib::{MemoryPage, Page, PageController};
//!
//! # async fn example() -> ais_lib::Result<()> {
//! let page = MemoryPage::new(vec![]);
//! let discovery = Discovery::new(150, std::time::Duration::from_millis(500));
//!
//! let fetcher = Arc::new(HttpImageFetcher::new()?);
//! let detector = Arc::new(DetectorClient::new("https://detective.builddev.in/api/detect")?);
//! let (controller, _events) =
//!     PageController::new(fetcher, detector, ControllerOptions::default());
//!
//! let candidates = discovery.scan(&page).await?;
//! let summary = controller.process_all(candidates).await?;
//! println!("settled {}/{}", summary.settled, summary.total);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod bridge;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod page;
pub mod store;
pub mod types;

pub use analyzer::analyze;
pub use bridge::{Bridge, Message, Response};
pub use classifier::{Detector, DetectorClient};
pub use config::{Config, DetectorConfig, DEFAULT_DETECTOR_ENDPOINT, DEFAULT_MIN_IMAGE_SIZE};
pub use controller::{ControllerOptions, PageController, PassSummary};
pub use discovery::Discovery;
pub use error::{AisError, ErrorCategory, ErrorPayload, Result};
pub use fetch::{FetchError, HttpImageFetcher, ImageFetcher};
pub use page::{InsertionEvent, MemoryPage, Page, PageSnapshot};
pub use store::{ResultStore, StoredRecord, HISTORY_CAP};
pub use types::{
    AnalysisResult, Characteristics, ClassificationResult, ColorStats, ControllerEvent, Detection,
    DetectionFailure, DetectionSummaryData, Dimensions, DominantColor, EstimatedType, ImageElement,
    ImageInfo, ImageMetadata, PageStatistics, Prediction, TagState,
};
