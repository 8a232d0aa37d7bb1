use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use super::world::validate_world_id;
use crate::cache::GlbKey;
use crate::error::{ApiError, OrRespond};
use crate::state::AppState;
use crate::templates;
use crate::util::{base_url, encode_component};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{object_id}/mml", get(object_mml))
        .route("/{object_id}/glb", get(object_glb))
}

fn glb_response(data: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("model/gltf-binary")),
            (header::CONTENT_LENGTH, HeaderValue::from(data.len())),
        ],
        data,
    )
        .into_response()
}

async fn object_mml(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
    headers: HeaderMap,
) -> Html<String> {
    let base = base_url(&state.settings, &headers);
    let glb = format!("{base}/objects/{}/glb", encode_component(&object_id));
    Html(templates::model_document(&glb))
}

async fn object_glb(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> Result<Response, ApiError> {
    let key = GlbKey::Object(object_id.clone());
    if let Some(data) = state.glb_cache.get(&key) {
        tracing::debug!("Serving GLB from cache for object {object_id}");
        return Ok(glb_response(data));
    }

    let download = state
        .api
        .download_url(&object_id)
        .await
        .or_respond("Failed to fetch GLB file")?;
    let Some(url) = download else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "No download URL found for object ID",
        ));
    };
    let data = state
        .api
        .fetch_binary(&url)
        .await
        .or_respond("Failed to fetch GLB file")?;

    tracing::info!("Cached GLB for object {object_id} ({} bytes)", data.len());
    Ok(glb_response(state.glb_cache.insert_if_absent(key, data)))
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Wraps a catalog model URL in a document whose GLB is served through
/// this world's cache.
pub async fn world_object_mml(
    State(state): State<AppState>,
    Path((world_id, object_url)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    validate_world_id(&world_id)?;
    let base = base_url(&state.settings, &headers);
    let glb = format!(
        "{base}/world/{}/object/{}/glb",
        encode_component(&world_id),
        encode_component(&object_url)
    );
    Ok(Html(templates::model_document(&glb)))
}

/// Catalog GLBs go to their own bounded cache so arbitrary URLs cannot grow
/// the object cache.
pub async fn world_object_glb(
    State(state): State<AppState>,
    Path((world_id, object_url)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    validate_world_id(&world_id)?;
    if !is_http_url(&object_url) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Object URL must be an http(s) URL",
        ));
    }

    let key = GlbKey::WorldObject {
        world_id,
        url: object_url.clone(),
    };
    if let Some(data) = state.world_object_cache.get(&key) {
        return Ok(glb_response(data));
    }
    let data = state
        .api
        .fetch_binary(&object_url)
        .await
        .or_respond("Failed to fetch GLB file")?;
    Ok(glb_response(
        state.world_object_cache.insert_if_absent(key, data),
    ))
}

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::routes::router;
    use crate::state::testing::{self, get, send};
    use axum::http::StatusCode;
    use reqwest::Method;
    use serde_json::json;

    const DOWNLOAD_URL: &str = "https://assets.test/api/data/o1/download";
    const BINARY_URL: &str = "https://cdn.test/o1.glb";

    #[tokio::test]
    async fn test_object_mml_uses_request_host() {
        let (_, state) = testing::state();
        let request = axum::http::Request::get("/objects/o1/mml")
            .header("host", "example.org")
            .header("x-forwarded-proto", "https")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = send(router(state), request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.text(),
            r#"<m-model src="https://example.org/objects/o1/glb"></m-model>"#
        );
    }

    #[tokio::test]
    async fn test_object_glb_is_cached() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::GET, DOWNLOAD_URL, json!({ "url": BINARY_URL }));
        mock.reply(Method::GET, BINARY_URL, &b"glTF\x02\x00\x00\x00"[..]);

        let app = router(state);
        for _ in 0..2 {
            let response = send(app.clone(), get("/objects/o1/glb")).await;
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.headers["content-type"], "model/gltf-binary");
            assert_eq!(response.headers["content-length"], "8");
            assert_eq!(&response.body[..4], b"glTF");
        }
        assert_eq!(mock.calls_to(DOWNLOAD_URL), 1);
        assert_eq!(mock.calls_to(BINARY_URL), 1);
    }

    #[tokio::test]
    async fn test_object_glb_without_download_url() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::GET, DOWNLOAD_URL, json!({ "url": "" }));
        let response = send(router(state), get("/objects/o1/glb")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.json()["error"].is_string());
    }

    #[tokio::test]
    async fn test_object_glb_upstream_failure() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::GET, DOWNLOAD_URL, json!({ "url": BINARY_URL }));
        mock.fail(Method::GET, BINARY_URL, 500);
        let response = send(router(state), get("/objects/o1/glb")).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.json()["error"], "Failed to fetch GLB file");
    }

    #[tokio::test]
    async fn test_world_object_routes() {
        let (mock, state) = testing::state();
        mock.reply(Method::GET, BINARY_URL, &b"glTF"[..]);
        let app = router(state);

        let encoded = "https%3A%2F%2Fcdn.test%2Fo1.glb";
        let response = send(app.clone(), get(&format!("/world/w1/object/{encoded}/mml"))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response
            .text()
            .contains(&format!("http://localhost:3000/world/w1/object/{encoded}/glb")));

        let response = send(app.clone(), get(&format!("/world/w1/object/{encoded}/glb"))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"glTF");

        let response = send(app.clone(), get("/world/w1/object/file%3A%2F%2Fetc/glb")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = send(app, get(&format!("/world/w%401/object/{encoded}/mml"))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_world_object_cache_is_bounded() {
        let mut settings = Settings::for_tests();
        settings.world_object_cache_max_entries = 1;
        let (mock, state) = testing::state_with(settings);
        let other = "https://cdn.test/o2.glb";
        mock.reply(Method::GET, BINARY_URL, &b"one"[..]);
        mock.reply(Method::GET, other, &b"two"[..]);
        let app = router(state.clone());

        for path in [
            "/world/w1/object/https%3A%2F%2Fcdn.test%2Fo1.glb/glb",
            "/world/w1/object/https%3A%2F%2Fcdn.test%2Fo2.glb/glb",
            "/world/w1/object/https%3A%2F%2Fcdn.test%2Fo1.glb/glb",
        ] {
            let response = send(app.clone(), get(path)).await;
            assert_eq!(response.status, StatusCode::OK);
        }
        assert_eq!(mock.calls_to(BINARY_URL), 2);
        assert_eq!(mock.calls_to(other), 1);
        assert_eq!(state.world_object_cache.len(), 1);
        assert!(state.glb_cache.is_empty());
    }
}
