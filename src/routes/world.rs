use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::{json, Map, Value};

use super::objects;
use crate::document::DocumentDescriptor;
use crate::error::{ApiError, AppError, OrRespond, Result};
use crate::state::AppState;
use crate::templates::{self, WorldPage};

/// Top-level world config fields we forward to the browser and back upstream.
pub const FORWARDED_CONFIG_FIELDS: &[&str] = &[
    "name",
    "description",
    "enableChat",
    "allowOrbitalCamera",
    "mmlDocumentsConfiguration",
    "environmentConfiguration",
    "spawnConfiguration",
    "avatarConfiguration",
    "displayNameConfiguration",
    "loadingConfiguration",
];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{world_id}/web", get(world_web))
        .route("/{world_id}/objects", post(world_objects))
        .route("/{world_id}/config", post(world_config))
        .route(
            "/{world_id}/object/{object_url}/mml",
            get(objects::world_object_mml),
        )
        .route(
            "/{world_id}/object/{object_url}/glb",
            get(objects::world_object_glb),
        )
}

/// World ids are spliced into upstream hosts and paths, so only
/// `[A-Za-z0-9_-]` is accepted.
pub fn validate_world_id(world_id: &str) -> Result<()> {
    let valid = !world_id.is_empty()
        && world_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid world ID".into()))
    }
}

/// Keeps only the allow-listed top-level fields.
pub fn sanitize_world_config(config: &Value) -> Value {
    let mut sanitized = Map::new();
    if let Some(fields) = config.as_object() {
        for name in FORWARDED_CONFIG_FIELDS {
            if let Some(value) = fields.get(*name) {
                sanitized.insert(name.to_string(), value.clone());
            }
        }
    }
    Value::Object(sanitized)
}

/// Replaces the world's placed documents with `documents`, keyed by index.
pub fn fold_documents(config: &Value, documents: &[DocumentDescriptor]) -> Result<Value> {
    let mut placed = Map::new();
    for (index, document) in documents.iter().enumerate() {
        placed.insert(index.to_string(), serde_json::to_value(document)?);
    }

    let mut sanitized = sanitize_world_config(config);
    if let Value::Object(fields) = &mut sanitized {
        let section = fields
            .entry("mmlDocumentsConfiguration")
            .or_insert_with(|| json!({}));
        if !section.is_object() {
            *section = json!({});
        }
        section["mmlDocuments"] = Value::Object(placed);
    }
    Ok(sanitized)
}

fn page_field<'a>(page: &'a Value, name: &str) -> &'a str {
    page.get(name).and_then(Value::as_str).unwrap_or_default()
}

async fn world_web(
    State(state): State<AppState>,
    Path(world_id): Path<String>,
) -> std::result::Result<Html<String>, ApiError> {
    validate_world_id(&world_id)?;
    state
        .settings
        .require_worlds_api_key()
        .or_respond("API key not configured")?;

    let (world, page) = tokio::try_join!(
        state.api.fetch_world_config(&world_id),
        state.api.fetch_page_config(&world_id),
    )
    .or_respond("Failed to retrieve connection details")?;

    let world = sanitize_world_config(&world);
    Ok(Html(templates::world_page(&WorldPage {
        world_id: &world_id,
        session_token: page_field(&page, "sessionToken"),
        network_url: page_field(&page, "networkUrl"),
        world: &world,
        page: &page,
    })))
}

async fn world_objects(
    State(state): State<AppState>,
    Path(world_id): Path<String>,
    WithRejection(Json(documents), _): WithRejection<Json<Vec<DocumentDescriptor>>, ApiError>,
) -> std::result::Result<Json<Value>, ApiError> {
    validate_world_id(&world_id)?;
    state
        .settings
        .require_worlds_api_key()
        .or_respond("API key not configured")?;

    let current = state
        .api
        .fetch_world_config(&world_id)
        .await
        .or_respond("Failed to fetch world config")?;
    let updated = fold_documents(&current, &documents).or_respond("Failed to build world config")?;
    state
        .api
        .update_world_config(&world_id, &updated)
        .await
        .or_respond("Failed to update world config")?;

    tracing::info!("Updated {} documents for world {world_id}", documents.len());
    Ok(Json(updated))
}

async fn world_config(
    Path(world_id): Path<String>,
    WithRejection(Json(config), _): WithRejection<Json<Value>, ApiError>,
) -> std::result::Result<Json<Value>, ApiError> {
    validate_world_id(&world_id)?;
    Ok(Json(json!({ "id": world_id, "config": config })))
}
