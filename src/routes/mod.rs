use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod admin;
pub mod objects;
pub mod search;
pub mod user;
pub mod world;

pub fn router(state: AppState) -> Router {
    let client_build_dir = state.settings.client_build_dir.clone();
    let assets_dir = state.settings.assets_dir.clone();

    Router::new()
        .merge(user::routes())
        .nest("/admin", admin::routes())
        .nest("/world", world::routes())
        .nest("/objects", objects::routes())
        .route("/search", get(search::search))
        .nest_service("/web-client", ServeDir::new(client_build_dir))
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
