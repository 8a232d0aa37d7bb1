//! Users and login sessions.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

use crate::config::Settings;
use crate::error::Result;

pub mod memory;
pub mod postgres;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub world_id: Option<String>,
    pub subscribed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub world_id: Option<String>,
}

/// What we keep per browser session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
}

pub trait UserStore: Send + Sync {
    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<Option<User>>>;
    fn find_by_id(&self, id: i32) -> BoxFuture<'_, Result<Option<User>>>;
    fn create(&self, user: NewUser) -> BoxFuture<'_, Result<User>>;
    fn update_subscription(&self, id: i32, subscribed: bool) -> BoxFuture<'_, Result<User>>;
}

pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired sessions.
    fn load<'a>(&'a self, sid: &'a str) -> BoxFuture<'a, Result<Option<SessionData>>>;
    fn save<'a>(
        &'a self,
        sid: &'a str,
        data: &'a SessionData,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<()>>;
    fn destroy<'a>(&'a self, sid: &'a str) -> BoxFuture<'a, Result<()>>;
}

pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
}

/// `memory://` keeps everything in process; anything else is a Postgres URL.
pub async fn connect(settings: &Settings) -> Result<Stores> {
    if settings.database_url.starts_with("memory://") {
        tracing::warn!("Using in-memory user and session storage; data is lost on restart");
        let store = Arc::new(memory::MemoryStore::default());
        return Ok(Stores {
            users: store.clone(),
            sessions: store,
        });
    }

    let store = Arc::new(postgres::PgStore::connect_lazy(&settings.database_url)?);
    if let Err(e) = store.ensure_schema().await {
        // The server still comes up; user routes fail until the database is reachable.
        tracing::warn!("Could not initialize database schema: {e}");
    }
    Ok(Stores {
        users: store.clone(),
        sessions: store,
    })
}
