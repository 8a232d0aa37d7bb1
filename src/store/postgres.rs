use futures_util::future::BoxFuture;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use time::OffsetDateTime;

use super::{NewUser, SessionData, SessionStore, User, UserStore};
use crate::error::{AppError, Result};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        world_id TEXT,
        subscribed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "session" (
        sid VARCHAR NOT NULL PRIMARY KEY,
        sess JSON NOT NULL,
        expire TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "IDX_session_expire" ON "session" (expire)"#,
];

/// Postgres-backed users and sessions.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds the pool without connecting; the first query opens a connection.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .map_err(|e| AppError::Configuration(format!("Invalid DATABASE_URL: {e}")))?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA.iter().copied() {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl UserStore for PgStore {
    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(async move {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            Ok(user)
        })
    }

    fn find_by_id(&self, id: i32) -> BoxFuture<'_, Result<Option<User>>> {
        Box::pin(async move {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(user)
        })
    }

    fn create(&self, user: NewUser) -> BoxFuture<'_, Result<User>> {
        Box::pin(async move {
            let created = sqlx::query_as::<_, User>(
                "INSERT INTO users (email, password_hash, world_id) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.world_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(created)
        })
    }

    fn update_subscription(&self, id: i32, subscribed: bool) -> BoxFuture<'_, Result<User>> {
        Box::pin(async move {
            let updated = sqlx::query_as::<_, User>(
                "UPDATE users SET subscribed = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
            )
            .bind(subscribed)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            updated.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
        })
    }
}

impl SessionStore for PgStore {
    fn load<'a>(&'a self, sid: &'a str) -> BoxFuture<'a, Result<Option<SessionData>>> {
        Box::pin(async move {
            let row = sqlx::query_scalar::<_, Json<SessionData>>(
                r#"SELECT sess FROM "session" WHERE sid = $1 AND expire > CURRENT_TIMESTAMP"#,
            )
            .bind(sid)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(|Json(data)| data))
        })
    }

    fn save<'a>(
        &'a self,
        sid: &'a str,
        data: &'a SessionData,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let expire = OffsetDateTime::now_utc() + ttl;
            sqlx::query(
                r#"INSERT INTO "session" (sid, sess, expire) VALUES ($1, $2, $3)
                   ON CONFLICT (sid) DO UPDATE SET sess = EXCLUDED.sess, expire = EXCLUDED.expire"#,
            )
            .bind(sid)
            .bind(Json(data))
            .bind(expire)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn destroy<'a>(&'a self, sid: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            sqlx::query(r#"DELETE FROM "session" WHERE sid = $1"#)
                .bind(sid)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }
}
