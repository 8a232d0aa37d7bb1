use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

use super::{NewUser, SessionData, SessionStore, User, UserStore};
use crate::error::{AppError, Result};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: HashMap<String, (SessionData, Instant)>,
}

/// Process-local users and sessions, for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl UserStore for MemoryStore {
    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
        let found = self
            .tables
            .lock()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned();
        Box::pin(future::ready(Ok(found)))
    }

    fn find_by_id(&self, id: i32) -> BoxFuture<'_, Result<Option<User>>> {
        let found = self.tables.lock().users.iter().find(|u| u.id == id).cloned();
        Box::pin(future::ready(Ok(found)))
    }

    fn create(&self, user: NewUser) -> BoxFuture<'_, Result<User>> {
        let mut tables = self.tables.lock();
        let result = if tables.users.iter().any(|u| u.email == user.email) {
            Err(AppError::Custom(format!("Duplicate email: {}", user.email)))
        } else {
            let now = OffsetDateTime::now_utc();
            let created = User {
                id: tables.users.len() as i32 + 1,
                email: user.email,
                password_hash: user.password_hash,
                world_id: user.world_id,
                subscribed: false,
                created_at: now,
                updated_at: now,
            };
            tables.users.push(created.clone());
            Ok(created)
        };
        Box::pin(future::ready(result))
    }

    fn update_subscription(&self, id: i32, subscribed: bool) -> BoxFuture<'_, Result<User>> {
        let mut tables = self.tables.lock();
        let result = match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.subscribed = subscribed;
                user.updated_at = OffsetDateTime::now_utc();
                Ok(user.clone())
            }
            None => Err(AppError::NotFound(format!("User {id} not found"))),
        };
        Box::pin(future::ready(result))
    }
}

impl SessionStore for MemoryStore {
    fn load<'a>(&'a self, sid: &'a str) -> BoxFuture<'a, Result<Option<SessionData>>> {
        let mut tables = self.tables.lock();
        let entry = tables.sessions.get(sid).cloned();
        let data = match entry {
            Some((data, expires)) if expires > Instant::now() => Some(data),
            Some(_) => {
                tables.sessions.remove(sid);
                None
            }
            None => None,
        };
        Box::pin(future::ready(Ok(data)))
    }

    fn save<'a>(
        &'a self,
        sid: &'a str,
        data: &'a SessionData,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<()>> {
        self.tables
            .lock()
            .sessions
            .insert(sid.to_string(), (data.clone(), Instant::now() + ttl));
        Box::pin(future::ready(Ok(())))
    }

    fn destroy<'a>(&'a self, sid: &'a str) -> BoxFuture<'a, Result<()>> {
        self.tables.lock().sessions.remove(sid);
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            world_id: Some("w1".into()),
        }
    }

    #[tokio::test]
    async fn test_users() {
        let store = MemoryStore::default();
        let user = store.create(new_user("a@b.c")).await.unwrap();
        assert_eq!(user.id, 1);
        assert!(!user.subscribed);
        assert!(store.create(new_user("a@b.c")).await.is_err());

        let found = store.find_by_email("a@b.c").await.unwrap().unwrap();
        assert_eq!(found.world_id.as_deref(), Some("w1"));
        assert!(store.find_by_id(2).await.unwrap().is_none());

        let updated = store.update_subscription(1, true).await.unwrap();
        assert!(updated.subscribed);
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let store = MemoryStore::default();
        let data = SessionData { user_id: Some(7) };
        store.save("s1", &data, Duration::from_secs(60)).await.unwrap();
        store.save("s2", &data, Duration::ZERO).await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), Some(data));
        assert_eq!(store.load("s2").await.unwrap(), None);
        store.destroy("s1").await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), None);
    }
}
