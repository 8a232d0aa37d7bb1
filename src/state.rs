use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::cache::{bounded_glb_cache, glb_cache, GlbCache};
use crate::config::Settings;
use crate::store::{SessionStore, Stores, UserStore};
use crate::upstream::Upstream;

/// Shared state handed to every handler. Everything here is owned by the
/// state and injected; nothing lives in module-level statics.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub api: ApiClient,
    pub glb_cache: Arc<GlbCache>,
    pub world_object_cache: Arc<GlbCache>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, upstream: Arc<dyn Upstream>, stores: Stores) -> Self {
        Self {
            api: ApiClient::new(upstream, settings.clone()),
            glb_cache: Arc::new(glb_cache(settings.glb_cache_max_entries)),
            world_object_cache: Arc::new(bounded_glb_cache(
                settings.world_object_cache_max_entries,
            )),
            users: stores.users,
            sessions: stores.sessions,
            // Settings guarantees the secret is long enough for key derivation.
            cookie_key: Key::derive_from(settings.session_secret.as_bytes()),
            settings,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
