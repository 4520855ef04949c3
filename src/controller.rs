//! Processing queue and single-flight controller.
//!
//! The controller exclusively owns the pending queue, the active/idle flag,
//! and the page statistics. It drives every dequeued image through the full
//! pipeline (tag, fetch/decode, analyze, classify, record, emit) and enforces
//! at-most-one active pass process-wide. Entries settle strictly one at a
//! time; the next pop never happens before the current image's pipeline has
//! settled, success or failure.
//!
//! Cancellation is cooperative: `stop` drops the remaining queue immediately
//! and takes effect at the next pop boundary, letting the in-flight image
//! finish and be recorded.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analyzer;
use crate::classifier::Detector;
use crate::config::Config;
use crate::error::{AisError, Result};
use crate::fetch::ImageFetcher;
use crate::types::{
    AnalysisResult, ClassificationResult, ControllerEvent, DetectionSummaryData, ImageElement,
    PageStatistics, TagState,
};

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Pause inserted between consecutive images of a pass, to avoid
    /// saturating the remote detector.
    pub inter_image_pause: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            inter_image_pause: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            inter_image_pause: config.inter_image_pause,
        }
    }
}

/// Result of one completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Candidate count fixed when the pass started.
    pub total: usize,
    /// Entries that reached a terminal outcome (success or error).
    pub settled: usize,
    /// Whether the pass ended through `stop` rather than queue exhaustion.
    pub stopped: bool,
}

struct ControllerState {
    active: bool,
    queue: VecDeque<ImageElement>,
    in_flight: Option<String>,
    processed: HashMap<String, AnalysisResult>,
    stats: PageStatistics,
    cancel: CancellationToken,
    pass_total: usize,
    pass_current: usize,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            active: false,
            queue: VecDeque::new(),
            in_flight: None,
            processed: HashMap::new(),
            stats: PageStatistics::default(),
            cancel: CancellationToken::new(),
            pass_total: 0,
            pass_current: 0,
        }
    }
}

enum EntryOutcome {
    /// Fetch or decode failed; nothing is recorded for this URL.
    LoadFailed,
    /// Analysis completed; the classification variant is already attached.
    Recorded { analysis: AnalysisResult, tag: TagState },
}

pub struct PageController {
    options: ControllerOptions,
    fetcher: Arc<dyn ImageFetcher>,
    detector: Arc<dyn Detector>,
    state: Mutex<ControllerState>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl PageController {
    /// Build a controller and the event stream its consumers read.
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        detector: Arc<dyn Detector>,
        options: ControllerOptions,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            options,
            fetcher,
            detector,
            state: Mutex::new(ControllerState::new()),
            events: tx,
        });
        (controller, rx)
    }

    /// Process every candidate, FIFO, and return when the pass settles.
    ///
    /// Rejected with [`AisError::PassActive`] while another pass runs; the
    /// queue state is left unchanged in that case. Candidates already in the
    /// completed-result map, duplicates, and data URLs are skipped at
    /// submission time.
    pub async fn process_all(&self, candidates: Vec<ImageElement>) -> Result<PassSummary> {
        let total = self.begin_pass(candidates)?;
        if total == 0 {
            return Ok(PassSummary {
                total: 0,
                settled: 0,
                stopped: false,
            });
        }
        Ok(self.drain().await)
    }

    /// Validate and seed a pass, then drain it on a background task.
    /// Returns the fixed candidate count; progress flows through the events.
    pub fn spawn_all(self: &Arc<Self>, candidates: Vec<ImageElement>) -> Result<usize> {
        let total = self.begin_pass(candidates)?;
        if total > 0 {
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                controller.drain().await;
            });
        }
        Ok(total)
    }

    /// Process a single image immediately as a one-entry pass.
    ///
    /// Rejected while a pass is active or when the URL already has a recorded
    /// result. A fetch/decode failure surfaces as an error here (the manual
    /// path wants to tell the caller), but is still counted as settled.
    pub async fn process_image(&self, element: ImageElement) -> Result<AnalysisResult> {
        if element.src.is_empty() || element.src.starts_with("data:") {
            return Err(AisError::config("embedded data URLs are never processed"));
        }

        {
            let mut state = self.state.lock().unwrap();
            if state.active {
                return Err(AisError::PassActive);
            }
            if state.processed.contains_key(&element.src) {
                return Err(AisError::AlreadyProcessed(element.src.clone()));
            }
            state.active = true;
            state.cancel = CancellationToken::new();
            state.queue.clear();
            state.pass_total = 1;
            state.pass_current = 0;
        }

        let url = element.src.clone();
        self.process_entry(element).await;

        let recorded = {
            let mut state = self.state.lock().unwrap();
            state.active = false;
            state.processed.get(&url).cloned()
        };

        recorded.ok_or_else(|| AisError::ImageLoad {
            url,
            message: "image could not be loaded or decoded".to_string(),
        })
    }

    /// Request cancellation of the active pass. Remaining queued entries are
    /// dropped immediately; the in-flight image finishes its pipeline and is
    /// recorded. Returns false when no pass is active.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.active {
            return false;
        }
        let dropped = state.queue.len();
        state.queue.clear();
        state.cancel.cancel();
        debug!(dropped, "stop requested; remaining queue dropped");
        true
    }

    /// Clear the completed-result map and statistics for a fresh page
    /// lifecycle. Rejected while a pass is active.
    pub fn reset_page(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.active {
            return Err(AisError::PassActive);
        }
        state.processed.clear();
        state.stats = PageStatistics::default();
        state.pass_total = 0;
        state.pass_current = 0;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn statistics(&self) -> PageStatistics {
        self.state.lock().unwrap().stats
    }

    /// Recorded result for a URL, if the image settled successfully this page.
    pub fn result_for(&self, url: &str) -> Option<AnalysisResult> {
        self.state.lock().unwrap().processed.get(url).cloned()
    }

    /// Snapshot of the completed-result map.
    pub fn results(&self) -> HashMap<String, AnalysisResult> {
        self.state.lock().unwrap().processed.clone()
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.state.lock().unwrap().processed.contains_key(url)
    }

    /// URL of the image currently mid-pipeline, if any.
    pub fn in_flight(&self) -> Option<String> {
        self.state.lock().unwrap().in_flight.clone()
    }

    fn begin_pass(&self, candidates: Vec<ImageElement>) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.active {
            return Err(AisError::PassActive);
        }

        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        for el in candidates {
            if el.src.is_empty() || el.src.starts_with("data:") {
                continue;
            }
            if state.processed.contains_key(&el.src) {
                continue;
            }
            if seen.insert(el.src.clone()) {
                queue.push_back(el);
            }
        }

        let total = queue.len();
        state.queue = queue;
        state.active = total > 0;
        state.cancel = CancellationToken::new();
        state.pass_total = total;
        state.pass_current = 0;
        if total > 0 {
            debug!(total, "processing pass started");
        }
        Ok(total)
    }

    async fn drain(&self) -> PassSummary {
        let total = self.state.lock().unwrap().pass_total;
        let mut stopped = false;

        loop {
            let entry = {
                let mut state = self.state.lock().unwrap();
                if state.cancel.is_cancelled() {
                    stopped = true;
                    state.queue.clear();
                    None
                } else {
                    state.queue.pop_front()
                }
            };

            let Some(element) = entry else { break };
            self.process_entry(element).await;

            let pause = {
                let state = self.state.lock().unwrap();
                !state.queue.is_empty() && !state.cancel.is_cancelled()
            };
            if pause {
                tokio::time::sleep(self.options.inter_image_pause).await;
            }
        }

        let settled = {
            let mut state = self.state.lock().unwrap();
            state.active = false;
            state.queue.clear();
            state.pass_current
        };
        debug!(total, settled, stopped, "processing pass finished");

        PassSummary {
            total,
            settled,
            stopped,
        }
    }

    /// The per-image pipeline. Every failure is absorbed into a recorded
    /// outcome; nothing here is fatal to the queue.
    async fn process_entry(&self, element: ImageElement) {
        let url = element.src.clone();
        self.state.lock().unwrap().in_flight = Some(url.clone());
        self.emit(ControllerEvent::TagUpdate {
            url: url.clone(),
            state: TagState::Processing,
        });

        let outcome = match self.fetcher.fetch(&url).await {
            Err(e) => {
                warn!(url = %url, error = %e, "image load failed");
                EntryOutcome::LoadFailed
            }
            Ok(pixels) => match analyzer::analyze(&pixels, &element.info()) {
                Err(e) => {
                    warn!(url = %url, error = %e, "analysis failed");
                    EntryOutcome::LoadFailed
                }
                Ok(mut analysis) => {
                    let classification = self.detector.detect(&pixels).await;
                    let tag = match &classification {
                        ClassificationResult::Success(d) => TagState::Verdict(d.clone()),
                        ClassificationResult::Failure(f) => {
                            warn!(url = %url, error = %f.error_message, "detection failed");
                            TagState::DetectionFailed
                        }
                    };
                    analysis.ai_detection = Some(classification);
                    EntryOutcome::Recorded { analysis, tag }
                }
            },
        };

        let mut summary: Option<DetectionSummaryData> = None;
        let mut recorded: Option<AnalysisResult> = None;
        let (current, total) = {
            let mut state = self.state.lock().unwrap();
            if let EntryOutcome::Recorded { analysis, .. } = &outcome {
                if let Some(detection) = analysis.detection() {
                    state.stats.record_detection(detection);
                    summary = Some((&state.stats).into());
                }
                state.processed.insert(url.clone(), analysis.clone());
                recorded = Some(analysis.clone());
            }
            state.stats.processed_count += 1;
            state.pass_current += 1;
            state.in_flight = None;
            (state.pass_current, state.pass_total)
        };

        self.emit(ControllerEvent::Progress { current, total });
        if let Some(data) = summary {
            self.emit(ControllerEvent::DetectionSummary(data));
        }
        if let Some(result) = recorded {
            self.emit(ControllerEvent::ImageProcessed {
                url: url.clone(),
                result,
            });
        }

        let tag = match outcome {
            EntryOutcome::LoadFailed => TagState::LoadFailed,
            EntryOutcome::Recorded { tag, .. } => tag,
        };
        self.emit(ControllerEvent::TagUpdate { url, state: tag });
    }

    fn emit(&self, event: ControllerEvent) {
        // Consumers may have gone away; processing does not depend on them.
        let _ = self.events.send(event);
    }
}
