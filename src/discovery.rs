//! Candidate image discovery.
//!
//! Scans the page for qualifying images and watches insertion events for ones
//! attached after load. Measurement of dynamically inserted images is deferred
//! by a short settle delay so layout can finish before the size check runs.
//! A URL is discovered at most once per page lifetime; re-discovery of a
//! tagged or already-processed image is a no-op.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::controller::PageController;
use crate::error::{AisError, Result};
use crate::page::Page;
use crate::types::ImageElement;

pub struct Discovery {
    min_image_size: u32,
    settle_delay: Duration,
    seen: Mutex<HashSet<String>>,
}

impl Discovery {
    pub fn new(min_image_size: u32, settle_delay: Duration) -> Self {
        Self {
            min_image_size,
            settle_delay,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_image_size, config.settle_delay)
    }

    /// A candidate has a network/resource URL and a rendered width or height
    /// at or above the threshold.
    pub fn qualifies(&self, element: &ImageElement) -> bool {
        if element.src.is_empty() || element.src.starts_with("data:") {
            return false;
        }
        element.width >= self.min_image_size || element.height >= self.min_image_size
    }

    /// All qualifying images currently on the page, document order, one entry
    /// per URL (first occurrence wins).
    pub async fn scan(&self, page: &dyn Page) -> Result<Vec<ImageElement>> {
        let snapshot = page.snapshot().await?;
        let mut urls = HashSet::new();
        Ok(snapshot
            .images
            .into_iter()
            .filter(|el| self.qualifies(el))
            .filter(|el| urls.insert(el.src.clone()))
            .collect())
    }

    /// Record a URL as discovered. Returns false when it was already known,
    /// in which case the discovery event must be treated as a no-op.
    pub fn mark_discovered(&self, url: &str) -> bool {
        self.seen.lock().unwrap().insert(url.to_string())
    }

    /// Consume the page's insertion events and feed fresh candidates to the
    /// controller while auto-processing is enabled. Runs until the page's
    /// event stream ends.
    pub fn watch(
        self: Arc<Self>,
        page: Arc<dyn Page>,
        controller: Arc<PageController>,
        auto_enabled: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let mut insertions = page.subscribe();
        tokio::spawn(async move {
            while let Some(event) = insertions.recv().await {
                // Let layout settle before measuring the new elements.
                tokio::time::sleep(self.settle_delay).await;

                let snapshot = match page.snapshot().await {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(error = %e, "page snapshot failed during insertion handling");
                        continue;
                    }
                };

                for inserted in &event.images {
                    // Re-measure: the size at insertion time is often zero.
                    let Some(measured) = snapshot.by_src(&inserted.src) else {
                        continue;
                    };
                    if !self.qualifies(measured) {
                        continue;
                    }
                    if !self.mark_discovered(&measured.src) {
                        continue;
                    }
                    if !auto_enabled.load(Ordering::Relaxed) {
                        debug!(url = %measured.src, "discovered image; auto-processing disabled");
                        continue;
                    }

                    match controller.process_image(measured.clone()).await {
                        Ok(_) => {}
                        // Busy or already recorded: the discovery stays a no-op.
                        Err(AisError::PassActive) | Err(AisError::AlreadyProcessed(_)) => {
                            debug!(url = %measured.src, "auto-discovery skipped");
                        }
                        Err(e) => {
                            warn!(url = %measured.src, error = %e, "auto-processing failed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use tokio::time::timeout;

    use crate::classifier::Detector;
    use crate::controller::ControllerOptions;
    use crate::fetch::{FetchError, ImageFetcher};
    use crate::page::MemoryPage;
    use crate::types::{ClassificationResult, Detection, Prediction};

    fn element(src: &str, width: u32, height: u32) -> ImageElement {
        ImageElement {
            id: src.to_string(),
            src: src.to_string(),
            alt: String::new(),
            title: String::new(),
            width,
            height,
        }
    }

    fn discovery() -> Discovery {
        Discovery::new(150, Duration::from_millis(10))
    }

    #[test]
    fn qualification_threshold_is_inclusive_on_either_axis() {
        let d = discovery();
        assert!(!d.qualifies(&element("https://a.test/small.png", 149, 149)));
        assert!(d.qualifies(&element("https://a.test/wide.png", 150, 10)));
        assert!(d.qualifies(&element("https://a.test/tall.png", 10, 150)));
    }

    #[test]
    fn data_urls_and_empty_sources_never_qualify() {
        let d = discovery();
        assert!(!d.qualifies(&element("data:image/png;base64,abc", 500, 500)));
        assert!(!d.qualifies(&element("", 500, 500)));
    }

    #[tokio::test]
    async fn scan_returns_document_order_without_duplicate_urls() {
        let d = discovery();
        let page = MemoryPage::new(vec![
            element("https://a.test/1.png", 300, 200),
            element("https://a.test/tiny.png", 20, 20),
            element("https://a.test/2.png", 300, 200),
            element("https://a.test/1.png", 300, 200),
        ]);

        let candidates = d.scan(&page).await.unwrap();
        let srcs: Vec<&str> = candidates.iter().map(|el| el.src.as_str()).collect();
        assert_eq!(srcs, ["https://a.test/1.png", "https://a.test/2.png"]);
    }

    #[test]
    fn mark_discovered_dedupes_per_page() {
        let d = discovery();
        assert!(d.mark_discovered("https://a.test/1.png"));
        assert!(!d.mark_discovered("https://a.test/1.png"));
    }

    struct FixedFetcher;

    #[async_trait]
    impl ImageFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> std::result::Result<RgbaImage, FetchError> {
            Ok(RgbaImage::from_pixel(4, 4, Rgba([10, 10, 10, 255])))
        }
    }

    struct HumanDetector;

    #[async_trait]
    impl Detector for HumanDetector {
        async fn detect(&self, _image: &RgbaImage) -> ClassificationResult {
            ClassificationResult::Success(Detection {
                human_probability: 0.95,
                artificial_probability: 0.05,
                prediction: Prediction::Human,
                confidence: 0.95,
            })
        }
    }

    #[tokio::test]
    async fn watcher_processes_inserted_image_after_settle() {
        let discovery = Arc::new(Discovery::new(150, Duration::from_millis(10)));
        let page = Arc::new(MemoryPage::new(Vec::new()));
        let (controller, mut events) = PageController::new(
            Arc::new(FixedFetcher),
            Arc::new(HumanDetector),
            ControllerOptions {
                inter_image_pause: Duration::ZERO,
            },
        );
        let auto = Arc::new(AtomicBool::new(true));

        let _watch = Arc::clone(&discovery).watch(
            page.clone() as Arc<dyn Page>,
            Arc::clone(&controller),
            Arc::clone(&auto),
        );

        // Inserted at zero size; layout "settles" to a qualifying size.
        page.insert(vec![element("https://a.test/late.png", 0, 0)]);
        page.resize("https://a.test/late.png", 640, 480);

        let deadline = Duration::from_secs(2);
        let settled = timeout(deadline, async {
            loop {
                if controller.is_processed("https://a.test/late.png") {
                    break;
                }
                match events.recv().await {
                    Some(_) => continue,
                    None => break,
                }
            }
        })
        .await;
        assert!(settled.is_ok(), "inserted image was never processed");
    }

    #[tokio::test]
    async fn watcher_ignores_insertions_when_auto_is_disabled() {
        let discovery = Arc::new(Discovery::new(150, Duration::from_millis(5)));
        let page = Arc::new(MemoryPage::new(Vec::new()));
        let (controller, _events) = PageController::new(
            Arc::new(FixedFetcher),
            Arc::new(HumanDetector),
            ControllerOptions {
                inter_image_pause: Duration::ZERO,
            },
        );
        let auto = Arc::new(AtomicBool::new(false));

        let _watch = Arc::clone(&discovery).watch(
            page.clone() as Arc<dyn Page>,
            Arc::clone(&controller),
            Arc::clone(&auto),
        );

        page.insert(vec![element("https://a.test/ignored.png", 640, 480)]);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!controller.is_processed("https://a.test/ignored.png"));
        // The URL still counts as discovered, so flipping the toggle later
        // does not replay old insertions.
        assert!(!discovery.mark_discovered("https://a.test/ignored.png"));
    }
}
