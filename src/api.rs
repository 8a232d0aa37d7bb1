use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::extract::extract_page_config;
use crate::upstream::{Upstream, UpstreamRequest};

/// One world instance as listed by the hosting API.
#[derive(Clone, Debug, Deserialize)]
pub struct WorldSummary {
    pub id: String,
}

#[derive(Deserialize)]
struct WorldList {
    #[serde(default)]
    worlds: Vec<WorldSummary>,
}

#[derive(Deserialize)]
struct CreatedWorld {
    id: Option<String>,
}

#[derive(Deserialize)]
struct DownloadDescriptor {
    url: Option<String>,
}

/// A search candidate as returned by the asset API.
#[derive(Clone, Debug, Deserialize)]
pub struct AssetCandidate {
    pub name: String,
    pub id: String,
}

/// Typed calls against the world-hosting and asset APIs.
#[derive(Clone)]
pub struct ApiClient {
    upstream: Arc<dyn Upstream>,
    settings: Arc<Settings>,
}

impl ApiClient {
    pub fn new(upstream: Arc<dyn Upstream>, settings: Arc<Settings>) -> Self {
        Self { upstream, settings }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: UpstreamRequest) -> Result<T> {
        let url = request.url.clone();
        let body = self.upstream.send(request).await?;
        serde_json::from_slice(&body)
            .map_err(|e| AppError::upstream(&url, format!("Invalid JSON response: {e}")))
    }

    async fn fetch_text(&self, request: UpstreamRequest) -> Result<String> {
        let body = self.upstream.send(request).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    // ── World hosting ───────────────────────────────────────────────────────

    fn worlds_request(&self, request: UpstreamRequest) -> Result<UpstreamRequest> {
        let key = self.settings.require_worlds_api_key()?;
        Ok(request.bearer(key))
    }

    pub async fn list_worlds(&self) -> Result<Vec<WorldSummary>> {
        let request = self.worlds_request(UpstreamRequest::get(self.settings.world_instances_url()))?;
        let list: WorldList = self.fetch_json(request).await?;
        Ok(list.worlds)
    }

    /// Creates a world instance and returns its id.
    pub async fn create_world(&self, name: &str) -> Result<String> {
        let url = self.settings.world_instances_url();
        let request = self.worlds_request(UpstreamRequest::post(&url, json!({ "name": name })))?;
        let created: CreatedWorld = self.fetch_json(request).await?;
        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::upstream(&url, "No ID in response from world creation API"))
    }

    pub async fn fetch_world_config(&self, world_id: &str) -> Result<Value> {
        let request =
            self.worlds_request(UpstreamRequest::get(self.settings.world_instance_url(world_id)))?;
        self.fetch_json(request).await
    }

    pub async fn update_world_config(&self, world_id: &str, config: &Value) -> Result<()> {
        let request = self.worlds_request(UpstreamRequest::post(
            self.settings.world_instance_url(world_id),
            config.clone(),
        ))?;
        self.upstream.send(request).await?;
        Ok(())
    }

    /// Fetches the hosted world page and pulls out its embedded config.
    pub async fn fetch_page_config(&self, world_id: &str) -> Result<Value> {
        let html = self
            .fetch_text(UpstreamRequest::get(self.settings.world_page_url(world_id)))
            .await?;
        Ok(extract_page_config(&html)?)
    }

    // ── Asset store ─────────────────────────────────────────────────────────

    fn assets_request(&self, request: UpstreamRequest) -> Result<UpstreamRequest> {
        let key = self.settings.require_assets_api_key()?;
        Ok(request.header("x-api-key", key))
    }

    /// Resolves an object id to its download URL, if the store has one.
    pub async fn download_url(&self, object_id: &str) -> Result<Option<String>> {
        let url = format!("{}/data/{}/download", self.settings.assets_api_base, object_id);
        let descriptor: DownloadDescriptor =
            self.fetch_json(self.assets_request(UpstreamRequest::get(url))?).await?;
        Ok(descriptor.url.filter(|u| !u.is_empty()))
    }

    /// Runs a text search and returns the first result set.
    pub async fn search(&self, prompt: &str) -> Result<Vec<AssetCandidate>> {
        let url = format!("{}/search", self.settings.assets_api_base);
        let body = json!({
            "queries": [{ "prompt": prompt, "k": self.settings.search_result_limit }]
        });
        let response: Value = self
            .fetch_json(self.assets_request(UpstreamRequest::post(url, body))?)
            .await?;

        // `results` is keyed by query; we only ever send one.
        let Some(first) = response
            .get("results")
            .and_then(Value::as_object)
            .and_then(|results| results.values().next())
        else {
            return Ok(Vec::new());
        };
        let Some(items) = first.as_array() else {
            tracing::warn!("Search results is not an array: {first}");
            return Ok(Vec::new());
        };
        Ok(items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect())
    }

    /// Downloads a binary asset. No auth header: download URLs are pre-signed.
    pub async fn fetch_binary(&self, url: &str) -> Result<Bytes> {
        self.upstream.send(UpstreamRequest::get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::MockUpstream;
    use reqwest::Method;

    fn client() -> (Arc<MockUpstream>, ApiClient) {
        let mock = Arc::new(MockUpstream::default());
        let api = ApiClient::new(mock.clone(), Arc::new(Settings::for_tests()));
        (mock, api)
    }

    #[tokio::test]
    async fn test_create_world_sends_bearer() {
        let (mock, api) = client();
        let url = "https://api.test/v1/worlds/proj/web-world-instances/";
        mock.reply_json(Method::POST, url, json!({ "id": "w-1" }));

        assert_eq!(api.create_world("my-world").await.unwrap(), "w-1");
        let call = &mock.calls()[0];
        assert_eq!(call.body, Some(json!({ "name": "my-world" })));
        assert!(call
            .headers
            .iter()
            .any(|(k, v)| *k == "Authorization" && v == "Bearer world-key"));
    }

    #[tokio::test]
    async fn test_create_world_without_id() {
        let (mock, api) = client();
        let url = "https://api.test/v1/worlds/proj/web-world-instances/";
        mock.reply_json(Method::POST, url, json!({ "name": "x" }));
        assert!(matches!(
            api.create_world("x").await,
            Err(AppError::UpstreamFetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let mock = Arc::new(MockUpstream::default());
        let mut settings = Settings::for_tests();
        settings.worlds_api_key = None;
        let api = ApiClient::new(mock.clone(), Arc::new(settings));
        assert!(matches!(
            api.list_worlds().await,
            Err(AppError::Configuration(_))
        ));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_search_takes_first_result_set() {
        let (mock, api) = client();
        mock.reply_json(
            Method::POST,
            "https://assets.test/api/search",
            json!({ "results": { "duck": [
                { "name": "Duck", "id": "d1" },
                { "name": "Broken" },
                { "name": "Drake", "id": "d2" }
            ] } }),
        );
        let found = api.search("duck").await.unwrap();
        let ids: Vec<_> = found.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["d1", "d2"]);
        assert_eq!(
            mock.calls()[0].body,
            Some(json!({ "queries": [{ "prompt": "duck", "k": 15 }] }))
        );
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let (mock, api) = client();
        mock.reply_json(Method::POST, "https://assets.test/api/search", json!({}));
        assert!(api.search("x").await.unwrap().is_empty());
        mock.reply_json(
            Method::POST,
            "https://assets.test/api/search",
            json!({ "results": { "x": "nope" } }),
        );
        assert!(api.search("x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_url_empty_is_none() {
        let (mock, api) = client();
        mock.reply_json(
            Method::GET,
            "https://assets.test/api/data/o1/download",
            json!({ "url": "" }),
        );
        assert_eq!(api.download_url("o1").await.unwrap(), None);
    }
}
