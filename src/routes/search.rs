use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::api::AssetCandidate;
use crate::error::{ApiError, OrRespond};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub name: String,
    pub id: String,
}

/// Keeps a candidate only if the asset store can actually hand out its binary.
async fn validate(state: &AppState, candidate: AssetCandidate) -> Option<SearchResult> {
    match state.api.download_url(&candidate.id).await {
        Ok(Some(_)) => Some(SearchResult {
            name: candidate.name,
            id: candidate.id,
        }),
        Ok(None) => {
            tracing::warn!("Dropping search result {} without download URL", candidate.id);
            None
        }
        Err(e) => {
            tracing::warn!("Dropping search result {}: {e}", candidate.id);
            None
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let term = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Search term is required. Use ?q=searchTerm",
            )
        })?;

    let candidates = state
        .api
        .search(term)
        .await
        .or_respond("Failed to search assets")?;
    let total = candidates.len();

    let results: Vec<SearchResult> = join_all(
        candidates
            .into_iter()
            .map(|candidate| validate(&state, candidate)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    tracing::info!("Search for {term:?}: {} of {total} results usable", results.len());
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::router;
    use crate::state::testing::{self, get, send};
    use reqwest::Method;
    use serde_json::json;

    const SEARCH_URL: &str = "https://assets.test/api/search";

    #[tokio::test]
    async fn test_search_requires_term() {
        let (mock, state) = testing::state();
        let app = router(state);
        for uri in ["/search", "/search?q=", "/search?q=%20%20"] {
            let response = send(app.clone(), get(uri)).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(response.json()["error"].is_string());
        }
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_search_drops_unusable_candidates() {
        let (mock, state) = testing::state();
        mock.reply_json(
            Method::POST,
            SEARCH_URL,
            json!({ "results": { "duck": [
                { "name": "Duck", "id": "d1" },
                { "name": "Broken", "id": "d2" },
                { "name": "Missing", "id": "d3" },
                { "bogus": true }
            ] } }),
        );
        mock.reply_json(
            Method::GET,
            "https://assets.test/api/data/d1/download",
            json!({ "url": "https://cdn.test/d1.glb" }),
        );
        mock.fail(Method::GET, "https://assets.test/api/data/d2/download", 500);
        mock.reply_json(
            Method::GET,
            "https://assets.test/api/data/d3/download",
            json!({}),
        );

        let response = send(router(state), get("/search?q=duck")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json(), json!([{ "name": "Duck", "id": "d1" }]));

        let query = mock
            .calls()
            .into_iter()
            .find(|c| c.url == SEARCH_URL)
            .and_then(|c| c.body)
            .unwrap();
        assert_eq!(query, json!({ "queries": [{ "prompt": "duck", "k": 15 }] }));
    }

    #[tokio::test]
    async fn test_search_upstream_failure() {
        let (mock, state) = testing::state();
        mock.fail(Method::POST, SEARCH_URL, 502);
        let response = send(router(state), get("/search?q=duck")).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.json()["error"], "Failed to search assets");
    }
}
