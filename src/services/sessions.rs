//! Server-side sessions keyed by an opaque cookie value

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::{AppError, AppResult},
    models::{Identity, SessionData, User},
};

/// Backend holding session payloads until they expire
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn put(&self, id: &str, data: &SessionData, ttl: Duration) -> AppResult<()>;

    /// `None` when unknown or expired
    async fn get(&self, id: &str) -> AppResult<Option<SessionData>>;

    /// True if a live session was removed
    async fn remove(&self, id: &str) -> AppResult<bool>;
}

/// Redis-backed sessions, expiry handled by `SET EX`
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
}

impl RedisSessionStore {
    /// Create a new Redis session store and check the connection
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, id: &str, data: &SessionData, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(data)
            .map_err(|e| AppError::Internal(format!("Failed to serialize session: {}", e)))?;

        conn.set_ex::<_, _, ()>(Self::key(id), payload, ttl.as_secs())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store session in Redis: {}", e)))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<SessionData>> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn
            .get(Self::key(id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get session from Redis: {}", e)))?;

        match payload {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| AppError::Internal(format!("Corrupt session payload: {}", e))),
            None => Ok(None),
        }
    }

    async fn remove(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn
            .del(Self::key(id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete session from Redis: {}", e)))?;
        Ok(removed > 0)
    }
}

/// Process-local sessions for tests and single-node development
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<HashMap<String, (SessionData, Instant)>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, id: &str, data: &SessionData, ttl: Duration) -> AppResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        // Sweep sessions that expired without being looked up again
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(id.to_string(), (data.clone(), now + ttl));
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<SessionData>> {
        let mut entries = self.entries.lock().await;
        match entries.get(id) {
            Some((data, expires_at)) if *expires_at > Instant::now() => Ok(Some(data.clone())),
            Some(_) => {
                entries.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, id: &str) -> AppResult<bool> {
        let removed = self.entries.lock().await.remove(id);
        Ok(matches!(removed, Some((_, expires_at)) if expires_at > Instant::now()))
    }
}

/// Creates, resolves and ends login sessions
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn secure_cookie(&self) -> bool {
        self.config.secure_cookie
    }

    /// Start a session for a freshly authenticated user, returning its id
    pub async fn create(&self, user: &User) -> AppResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let ttl = Duration::from_secs(self.config.ttl_seconds);
        self.store.put(&id, &SessionData::for_user(user), ttl).await?;
        tracing::debug!(user_id = user.id, "Session created");
        Ok(id)
    }

    /// Resolve the caller behind an optional session id
    pub async fn identity(&self, session_id: Option<&str>) -> AppResult<Identity> {
        let data = match session_id {
            Some(id) => self.store.get(id).await?,
            None => None,
        };
        Identity::from_session(data)
    }

    /// End a session. Fails when there is nothing to log out of.
    pub async fn destroy(&self, session_id: Option<&str>) -> AppResult<()> {
        let removed = match session_id {
            Some(id) => self.store.remove(id).await?,
            None => false,
        };

        if !removed {
            return Err(AppError::Unauthenticated(
                "Cannot log out without an active session".to_string(),
            ));
        }
        Ok(())
    }
}
