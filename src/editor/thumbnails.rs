use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::browser::ModelEntry;
use super::EditorResult;

/// Renders a model offscreen into an encoded image.
pub trait ThumbnailRenderer: Send + Sync {
    fn render(&self, model: &ModelEntry) -> BoxFuture<'static, EditorResult<Bytes>>;
}

type PendingThumbnail = Shared<BoxFuture<'static, EditorResult<Bytes>>>;

/// Thumbnails keyed by [`ModelEntry::key`]. Concurrent requests for one
/// model share a single render; a failed render is retried on the next call.
pub struct ThumbnailCache<R> {
    renderer: R,
    entries: Mutex<HashMap<String, PendingThumbnail>>,
}

impl<R: ThumbnailRenderer> ThumbnailCache<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, model: &ModelEntry) -> EditorResult<Bytes> {
        let key = model.key().to_string();
        let pending = self
            .entries
            .lock()
            .entry(key.clone())
            .or_insert_with(|| self.renderer.render(model).shared())
            .clone();

        let result = pending.await;
        if let Err(e) = &result {
            tracing::warn!("Thumbnail for {key} failed: {e}");
            let mut entries = self.entries.lock();
            let failed = entries
                .get(&key)
                .and_then(|f| f.peek())
                .is_some_and(|r| r.is_err());
            if failed {
                entries.remove(&key);
            }
        }
        result
    }

    /// The finished thumbnail, if one is ready.
    pub fn ready(&self, model: &ModelEntry) -> Option<Bytes> {
        self.entries
            .lock()
            .get(model.key())
            .and_then(|f| f.peek())
            .and_then(|r| r.as_ref().ok())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
