//! Searchable model grid.
//!
//! Keystrokes arm a debounce timer; the host calls [`ModelBrowser::poll`] on
//! its timer tick and runs whatever [`SearchRequest`] comes out. Each request
//! carries a generation number, and only results for the newest generation
//! are applied.

use serde::Deserialize;
use std::time::{Duration, Instant};

use super::{EditorError, EditorResult};
use crate::util::encode_component;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    /// Asset store id for search results; `None` for built-in models.
    pub id: Option<String>,
    /// URL of the model's GLB.
    pub url: String,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            url: url.into(),
        }
    }

    /// A search hit, served through the server's object proxy.
    pub fn from_search(server_base: &str, name: String, id: String) -> Self {
        let url = format!(
            "{}/objects/{}/glb",
            server_base.trim_end_matches('/'),
            encode_component(&id)
        );
        Self {
            name,
            id: Some(id),
            url,
        }
    }

    /// Stable key for caching per-model data such as thumbnails.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }

    /// Case-insensitive match on name or URL; `term` must be lowercase.
    fn matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term) || self.url.to_lowercase().contains(term)
    }
}

/// Built-in models shown before any search, served from `asset_base`.
pub fn default_models(asset_base: &str) -> Vec<ModelEntry> {
    let base = asset_base.trim_end_matches('/');
    [("Hat", "hat"), ("Duck", "duck"), ("Bot", "bot")]
        .into_iter()
        .map(|(name, file)| ModelEntry::new(name, format!("{base}/assets/models/{file}.glb")))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum GridView {
    /// A search is in flight.
    Loading,
    Models(Vec<ModelEntry>),
    /// The search failed; previously loaded models filtered locally.
    Fallback {
        models: Vec<ModelEntry>,
        error: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
}

pub struct ModelBrowser {
    defaults: Vec<ModelEntry>,
    available: Vec<ModelEntry>,
    view: GridView,
    query: String,
    deadline: Option<Instant>,
    generation: u64,
}

impl ModelBrowser {
    pub fn new(defaults: Vec<ModelEntry>) -> Self {
        Self {
            available: defaults.clone(),
            view: GridView::Models(defaults.clone()),
            defaults,
            query: String::new(),
            deadline: None,
            generation: 0,
        }
    }

    pub fn view(&self) -> &GridView {
        &self.view
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Models currently clickable in the grid.
    pub fn visible(&self) -> &[ModelEntry] {
        match &self.view {
            GridView::Loading => &[],
            GridView::Models(models) | GridView::Fallback { models, .. } => models.as_slice(),
        }
    }

    pub fn model_at(&self, index: usize) -> Option<&ModelEntry> {
        self.visible().get(index)
    }

    /// Records a keystroke and restarts the debounce timer.
    pub fn input(&mut self, query: impl Into<String>, now: Instant) {
        self.query = query.into();
        self.deadline = Some(now + SEARCH_DEBOUNCE);
    }

    /// When the host should next call [`poll`](Self::poll).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fires the debounced search once its deadline has passed. A blank
    /// query restores the built-in models without a request.
    pub fn poll(&mut self, now: Instant) -> Option<SearchRequest> {
        match self.deadline {
            Some(deadline) if deadline <= now => self.deadline = None,
            _ => return None,
        }
        self.generation += 1;

        let query = self.query.trim();
        if query.is_empty() {
            self.available = self.defaults.clone();
            self.view = GridView::Models(self.defaults.clone());
            return None;
        }
        self.view = GridView::Loading;
        Some(SearchRequest {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// Applies the outcome of a search. Results for a superseded generation
    /// are dropped and `false` is returned.
    pub fn apply_results(
        &mut self,
        generation: u64,
        result: EditorResult<Vec<ModelEntry>>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Dropping stale search results (generation {generation}, current {})",
                self.generation
            );
            return false;
        }
        match result {
            Ok(models) => {
                self.available = models.clone();
                self.view = GridView::Models(models);
            }
            Err(e) => {
                tracing::warn!("Model search failed: {e}");
                let term = self.query.trim().to_lowercase();
                let models = self
                    .available
                    .iter()
                    .filter(|m| m.matches(&term))
                    .cloned()
                    .collect();
                self.view = GridView::Fallback {
                    models,
                    error: e.to_string(),
                };
            }
        }
        true
    }

    /// Disarms the timer and orphans any in-flight search.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.generation += 1;
    }
}

#[derive(Deserialize)]
struct SearchHit {
    name: String,
    id: String,
}

/// Runs a search against the server's `/search` endpoint.
pub async fn fetch_models(
    client: &reqwest::Client,
    server_base: &str,
    query: &str,
) -> EditorResult<Vec<ModelEntry>> {
    let base = server_base.trim_end_matches('/');
    let url = format!("{base}/search?q={}", encode_component(query));
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| EditorError::Search(e.to_string()))?;
    if !response.status().is_success() {
        return Err(EditorError::Search(format!(
            "Bad status code: {}",
            response.status().as_u16()
        )));
    }
    let hits: Vec<SearchHit> = response
        .json()
        .await
        .map_err(|e| EditorError::Search(e.to_string()))?;
    Ok(hits
        .into_iter()
        .map(|hit| ModelEntry::from_search(base, hit.name, hit.id))
        .collect())
}
