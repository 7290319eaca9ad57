//! Server-side sessions keyed by an opaque cookie id.
//!
//! A session holds at most one pending OAuth2 state token and at most one
//! [`Principal`]. The [`SessionStore`] owns all of it; handlers go through
//! the typed [`Session`] facade and never cache a principal themselves.
//!
//! ## Lifecycle
//!
//! - A request without a live session gets a fresh id (see [`layer`])
//! - Nothing is persisted until a slot is written
//! - Records expire a fixed lifetime after creation, regardless of activity

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::auth::Principal;
use crate::types::{SessionId, StateToken};

pub mod layer;
mod memory;

pub use layer::{SessionLayerConfig, session_middleware};
pub use memory::MemorySessionStore;

/// Everything stored for one session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub pending_state: Option<StateToken>,
    pub principal: Option<Principal>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Empty record expiring `lifetime` from now.
    pub fn new(lifetime: Duration) -> Self {
        let created_at = Utc::now();
        let lifetime = chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::MAX);
        Self {
            pending_state: None,
            principal: None,
            created_at,
            expires_at: created_at.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Session storage errors.
#[derive(Debug, Clone)]
pub enum SessionError {
    /// The backing store failed
    Backend(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(msg) => write!(f, "Session store error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// Persistence for session records.
///
/// Implementations must be safe for concurrent use from independent
/// sessions, and must report an expired record as absent.
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a live record.
    fn load(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Option<SessionRecord>, SessionError>> + Send;

    /// Insert or replace a record.
    fn save(
        &self,
        id: &SessionId,
        record: SessionRecord,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Remove a record. Removing a missing record is not an error.
    fn delete(&self, id: &SessionId) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Request-scoped, strongly typed view of one session.
pub struct Session<S> {
    id: SessionId,
    store: Arc<S>,
    lifetime: Duration,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            store: self.store.clone(),
            lifetime: self.lifetime,
        }
    }
}

impl<S: SessionStore> Session<S> {
    pub fn new(id: SessionId, store: Arc<S>, lifetime: Duration) -> Self {
        Self {
            id,
            store,
            lifetime,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The pending login state, if a login is in flight.
    pub async fn pending_state(&self) -> Result<Option<StateToken>, SessionError> {
        Ok(self
            .store
            .load(&self.id)
            .await?
            .and_then(|r| r.pending_state))
    }

    /// Record a new pending login, replacing any earlier one.
    pub async fn set_pending_state(&self, token: StateToken) -> Result<(), SessionError> {
        self.update(|record| record.pending_state = Some(token)).await
    }

    /// Remove and return the pending state so it can be checked only once.
    pub async fn take_pending_state(&self) -> Result<Option<StateToken>, SessionError> {
        let Some(mut record) = self.store.load(&self.id).await? else {
            return Ok(None);
        };
        let token = record.pending_state.take();
        if token.is_some() {
            self.store.save(&self.id, record).await?;
        }
        Ok(token)
    }

    /// The logged-in principal, if any.
    pub async fn principal(&self) -> Result<Option<Principal>, SessionError> {
        Ok(self.store.load(&self.id).await?.and_then(|r| r.principal))
    }

    pub async fn set_principal(&self, principal: Principal) -> Result<(), SessionError> {
        self.update(|record| record.principal = Some(principal))
            .await
    }

    /// Clear the principal slot. No-op when the session holds none.
    pub async fn remove_principal(&self) -> Result<(), SessionError> {
        let Some(mut record) = self.store.load(&self.id).await? else {
            return Ok(());
        };
        if record.principal.take().is_some() {
            self.store.save(&self.id, record).await?;
        }
        Ok(())
    }

    async fn update<F>(&self, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionRecord) + Send,
    {
        let mut record = match self.store.load(&self.id).await? {
            Some(record) => record,
            None => SessionRecord::new(self.lifetime),
        };
        apply(&mut record);
        self.store.save(&self.id, record).await
    }
}
