//! Page access abstraction.
//!
//! The live DOM is an external collaborator. This module narrows it to the two
//! capabilities discovery needs: taking a snapshot of the image elements
//! currently on the page, and subscribing to insertion events for elements
//! attached after initial load. Any change-notification mechanism native to
//! the host environment can sit behind [`Page`]; [`MemoryPage`] is the
//! in-process implementation used by the CLI and the tests.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{AisError, Result};
use crate::types::ImageElement;

/// All image elements present on the page at one instant, in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub images: Vec<ImageElement>,
}

impl PageSnapshot {
    /// Find an element by its resolved source URL.
    pub fn by_src(&self, src: &str) -> Option<&ImageElement> {
        self.images.iter().find(|el| el.src == src)
    }
}

/// New image elements attached to the page after initial load. Carries every
/// image found in the inserted subtree, including the inserted node itself.
#[derive(Debug, Clone)]
pub struct InsertionEvent {
    pub images: Vec<ImageElement>,
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Snapshot the image elements currently on the page, document order.
    async fn snapshot(&self) -> Result<PageSnapshot>;

    /// Subscribe to insertion events. Each subscriber gets its own stream;
    /// the stream ends when the page is torn down.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<InsertionEvent>;
}

/// An in-process page: a mutable element list plus insertion fan-out.
///
/// The CLI builds one from a snapshot file; tests script insertions through
/// [`MemoryPage::insert`].
#[derive(Debug)]
pub struct MemoryPage {
    images: Mutex<Vec<ImageElement>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<InsertionEvent>>>,
}

impl MemoryPage {
    pub fn new(images: Vec<ImageElement>) -> Self {
        Self {
            images: Mutex::new(images),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Load a page snapshot from a JSON file holding an array of elements.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AisError::Page(format!("Failed to read page snapshot {}: {}", path.display(), e))
        })?;
        let images: Vec<ImageElement> = serde_json::from_str(&raw).map_err(|e| {
            AisError::Page(format!(
                "Invalid page snapshot {} (expected a JSON array of image elements): {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(images))
    }

    /// Attach new elements to the page and notify subscribers.
    pub fn insert(&self, images: Vec<ImageElement>) {
        self.images.lock().unwrap().extend(images.iter().cloned());
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(InsertionEvent { images: images.clone() }).is_ok());
    }

    /// Replace an element's rendered size, as a layout pass would.
    pub fn resize(&self, src: &str, width: u32, height: u32) {
        let mut images = self.images.lock().unwrap();
        for el in images.iter_mut().filter(|el| el.src == src) {
            el.width = width;
            el.height = height;
        }
    }
}

#[async_trait]
impl Page for MemoryPage {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(PageSnapshot {
            images: self.images.lock().unwrap().clone(),
        })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<InsertionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[tokio::test]
    async fn snapshot_preserves_document_order() {
        let page = MemoryPage::new(vec![
            element("https://a.test/1.png", 300, 200),
            element("https://a.test/2.png", 300, 200),
        ]);
        page.insert(vec![element("https://a.test/3.png", 300, 200)]);

        let snap = page.snapshot().await.unwrap();
        let srcs: Vec<&str> = snap.images.iter().map(|el| el.src.as_str()).collect();
        assert_eq!(
            srcs,
            ["https://a.test/1.png", "https://a.test/2.png", "https://a.test/3.png"]
        );
    }

    #[tokio::test]
    async fn insert_notifies_every_subscriber() {
        let page = MemoryPage::new(Vec::new());
        let mut rx1 = page.subscribe();
        let mut rx2 = page.subscribe();

        page.insert(vec![element("https://a.test/new.png", 400, 300)]);

        let ev1 = rx1.recv().await.unwrap();
        let ev2 = rx2.recv().await.unwrap();
        assert_eq!(ev1.images.len(), 1);
        assert_eq!(ev2.images[0].src, "https://a.test/new.png");
    }

    #[tokio::test]
    async fn resize_updates_snapshot_measurement() {
        let page = MemoryPage::new(vec![element("https://a.test/grow.png", 0, 0)]);
        page.resize("https://a.test/grow.png", 640, 480);

        let snap = page.snapshot().await.unwrap();
        let el = snap.by_src("https://a.test/grow.png").unwrap();
        assert_eq!((el.width, el.height), (640, 480));
    }

    #[test]
    fn from_json_file_rejects_malformed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        let err = MemoryPage::from_json_file(&path).unwrap_err();
        assert!(matches!(err, AisError::Page(_)));
    }
}
