//! Cross-context messaging bridge.
//!
//! Speaks the action-tagged message protocol of the host environment:
//! requests are dispatched to the controller's entry points, controller
//! events are relayed outward as notifications, and completions are
//! persisted to the result store. The bridge never makes processing
//! decisions of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::controller::PageController;
use crate::discovery::Discovery;
use crate::page::Page;
use crate::store::ResultStore;
use crate::types::{AnalysisResult, ControllerEvent, DetectionSummaryData, ImageInfo, PageStatistics};

/// The wire protocol. Incoming requests and outgoing notifications share one
/// tagged shape, as the host's message channel carries both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    ProcessImage {
        image_url: String,
        image_info: ImageInfo,
    },
    ImageProcessed {
        image_url: String,
        result: AnalysisResult,
    },
    GetImageCount,
    GetPageStatistics,
    ProcessAllImages,
    StopProcessing,
    UpdateAutoProcessSetting {
        enabled: bool,
    },
    ProcessingProgress {
        current: usize,
        total: usize,
    },
    DetectionSummary {
        data: DetectionSummaryData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Count {
        count: usize,
    },
    Statistics(PageStatistics),
    Ack {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Response {
    fn ok() -> Self {
        Response::Ack {
            success: true,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Response::Ack {
            success: false,
            error: Some(message.into()),
        }
    }
}

pub struct Bridge {
    controller: Arc<PageController>,
    discovery: Arc<Discovery>,
    page: Arc<dyn Page>,
    store: Arc<ResultStore>,
    auto_enabled: Arc<AtomicBool>,
}

impl Bridge {
    /// The auto-process flag is seeded from the store so a page picks up the
    /// setting chosen on a previous one.
    pub fn new(
        controller: Arc<PageController>,
        discovery: Arc<Discovery>,
        page: Arc<dyn Page>,
        store: Arc<ResultStore>,
    ) -> Self {
        let auto = store.auto_process().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read auto-process setting; defaulting to off");
            false
        });
        Self {
            controller,
            discovery,
            page,
            store,
            auto_enabled: Arc::new(AtomicBool::new(auto)),
        }
    }

    /// Shared flag consulted by the discovery watcher.
    pub fn auto_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.auto_enabled)
    }

    /// Dispatch one incoming message. Requests yield `Some` response;
    /// notifications (and fire-and-forget actions) yield `None`.
    pub async fn handle(&self, message: Message) -> Option<Response> {
        match message {
            Message::ProcessImage {
                image_url,
                image_info,
            } => {
                // Manual request: bypasses the size threshold, still subject
                // to the controller's dedupe and single-flight rules.
                let controller = Arc::clone(&self.controller);
                let element = crate::types::ImageElement {
                    id: image_url.clone(),
                    src: image_url,
                    alt: image_info.alt,
                    title: image_info.title,
                    width: 0,
                    height: 0,
                };
                tokio::spawn(async move {
                    if let Err(e) = controller.process_image(element).await {
                        debug!(error = %e, "manual processing request rejected");
                    }
                });
                None
            }
            Message::GetImageCount => match self.discovery.scan(self.page.as_ref()).await {
                Ok(candidates) => Some(Response::Count {
                    count: candidates.len(),
                }),
                Err(e) => Some(Response::err(e.to_string())),
            },
            Message::GetPageStatistics => {
                Some(Response::Statistics(self.controller.statistics()))
            }
            Message::ProcessAllImages => {
                let candidates = match self.discovery.scan(self.page.as_ref()).await {
                    Ok(c) => c,
                    Err(e) => return Some(Response::err(e.to_string())),
                };
                match self.controller.spawn_all(candidates) {
                    Ok(_) => Some(Response::ok()),
                    Err(e) => Some(Response::err(e.to_string())),
                }
            }
            Message::StopProcessing => {
                self.controller.stop();
                Some(Response::ok())
            }
            Message::UpdateAutoProcessSetting { enabled } => {
                self.auto_enabled.store(enabled, Ordering::Relaxed);
                match self.store.set_auto_process(enabled) {
                    Ok(()) => Some(Response::ok()),
                    Err(e) => Some(Response::err(e.to_string())),
                }
            }
            // Outbound-only notifications; nothing to do if echoed back.
            Message::ImageProcessed { .. }
            | Message::ProcessingProgress { .. }
            | Message::DetectionSummary { .. } => None,
        }
    }

    /// Forward controller events as outgoing messages and persist completed
    /// results. Runs until the controller's event stream closes.
    pub fn relay(
        mut events: mpsc::UnboundedReceiver<ControllerEvent>,
        store: Arc<ResultStore>,
        outgoing: mpsc::UnboundedSender<Message>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ControllerEvent::ImageProcessed { url, result } => {
                        if let Err(e) = store.record_processed(&url, &result) {
                            warn!(url = %url, error = %e, "failed to persist result");
                        }
                        if let Some(detection) = &result.ai_detection {
                            if let Err(e) = store.set_latest_detection(detection) {
                                warn!(error = %e, "failed to persist latest detection");
                            }
                        }
                        let _ = outgoing.send(Message::ImageProcessed {
                            image_url: url,
                            result,
                        });
                    }
                    ControllerEvent::Progress { current, total } => {
                        let _ = outgoing.send(Message::ProcessingProgress { current, total });
                    }
                    ControllerEvent::DetectionSummary(data) => {
                        let _ = outgoing.send(Message::DetectionSummary { data });
                    }
                    // Tag state is rendered in-page; it does not cross contexts.
                    ControllerEvent::TagUpdate { .. } => {}
                }
            }
        })
    }
}
