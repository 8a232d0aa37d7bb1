use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::error::{ApiError, OrRespond};
use crate::state::AppState;
use crate::templates;
use crate::util::base_url;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_page))
        .route("/create", post(create_world))
}

async fn admin_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let base = base_url(&state.settings, &headers);
    let worlds = match state.api.list_worlds().await {
        Ok(worlds) => Some(worlds.into_iter().map(|w| w.id).collect::<Vec<_>>()),
        Err(e) => {
            tracing::error!("Failed to fetch worlds from API: {e}");
            None
        }
    };
    Html(templates::admin(&base, worlds.as_deref()))
}

#[derive(Deserialize)]
struct CreateWorldForm {
    name: Option<String>,
}

async fn create_world(
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<CreateWorldForm>, ApiError>,
) -> Result<Redirect, ApiError> {
    let name = form
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "World name is required"))?;

    let id = state
        .api
        .create_world(&name)
        .await
        .or_respond("Failed to create world on external API")?;
    tracing::info!("Created world {name} with ID {id}");
    Ok(Redirect::to("/admin"))
}

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::routes::router;
    use crate::state::testing::{self, get, post_form, send};
    use axum::http::StatusCode;
    use reqwest::Method;
    use serde_json::json;

    const INSTANCES_URL: &str = "https://api.test/v1/worlds/proj/web-world-instances/";

    #[tokio::test]
    async fn test_admin_lists_worlds() {
        let (mock, state) = testing::state();
        mock.reply_json(
            Method::GET,
            INSTANCES_URL,
            json!({ "worlds": [{ "id": "w1" }, { "id": "w2" }] }),
        );
        let response = send(router(state), get("/admin")).await;
        assert_eq!(response.status, StatusCode::OK);
        let body = response.text();
        assert!(body.contains("http://localhost:3000/world/w1/web"));
        assert!(body.contains("http://localhost:3000/world/w2/web"));
    }

    #[tokio::test]
    async fn test_admin_renders_upstream_failure() {
        let (mock, state) = testing::state();
        mock.fail(Method::GET, INSTANCES_URL, 500);
        let response = send(router(state), get("/admin")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.text().contains("Failed to load worlds from API"));
    }

    #[tokio::test]
    async fn test_create_world() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::POST, INSTANCES_URL, json!({ "id": "new-id" }));
        let app = router(state);

        let response = send(app.clone(), post_form("/admin/create", "name=my-world")).await;
        assert!(response.status.is_redirection());
        assert_eq!(response.location(), Some("/admin"));

        let response = send(app.clone(), post_form("/admin/create", "name=")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let request = axum::http::Request::post("/admin/create")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let response = send(app, request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json()["error"].is_string());
    }

    #[tokio::test]
    async fn test_create_world_failures() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::POST, INSTANCES_URL, json!({ "name": "no id" }));
        let response = send(router(state), post_form("/admin/create", "name=x")).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);

        let mut settings = Settings::for_tests();
        settings.worlds_api_key = None;
        let (_, state) = testing::state_with(settings);
        let response = send(router(state), post_form("/admin/create", "name=x")).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json()["error"], "API key not configured");
    }
}
