//! Page Sessions
//!
//! Server-side state of one visitor: the visitor's identity gateway
//! instance, its session projection, and the referrer code captured from
//! the last page load. Addressed by a signed cookie.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use kernel::id::PageSessionId;
use tokio::sync::RwLock;

use crate::application::projection::SessionProjection;
use crate::domain::gateway::{GatewayFactory, IdentityGateway};
use crate::domain::repository::ProfileRepository;
use crate::domain::value_object::referral_code::ReferrerCode;

/// One visitor's session
pub struct PageSession<G> {
    id: PageSessionId,
    gateway: Arc<G>,
    projection: SessionProjection,
    referrer: RwLock<Option<ReferrerCode>>,
    last_seen_ms: AtomicI64,
}

impl<G> PageSession<G>
where
    G: IdentityGateway,
{
    pub fn id(&self) -> PageSessionId {
        self.id
    }

    pub fn gateway(&self) -> Arc<G> {
        self.gateway.clone()
    }

    pub fn projection(&self) -> &SessionProjection {
        &self.projection
    }

    pub async fn referrer(&self) -> Option<ReferrerCode> {
        self.referrer.read().await.clone()
    }

    /// Replace the referrer code; a page load without `ref` clears it
    pub async fn set_referrer(&self, referrer: Option<ReferrerCode>) {
        *self.referrer.write().await = referrer;
    }

    fn touch(&self, now_ms: i64) {
        self.last_seen_ms.store(now_ms, Ordering::Relaxed);
    }

    fn is_idle(&self, now_ms: i64, ttl_ms: i64, anonymous_ttl_ms: i64) -> bool {
        // Nobody signed in: only the referrer would be lost
        let ttl_ms = if self.projection.current().is_some() {
            ttl_ms
        } else {
            anonymous_ttl_ms.min(ttl_ms)
        };
        now_ms - self.last_seen_ms.load(Ordering::Relaxed) >= ttl_ms
    }
}

/// Registry of live page sessions
pub struct PageSessions<F, P>
where
    F: GatewayFactory,
{
    factory: F,
    profiles: Arc<P>,
    ttl_ms: i64,
    anonymous_ttl_ms: i64,
    sessions: RwLock<HashMap<PageSessionId, Arc<PageSession<F::Gateway>>>>,
}

impl<F, P> PageSessions<F, P>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    /// Sessions idle longer than `ttl_ms` are evicted; `anonymous_ttl_ms`
    /// applies while nobody is signed in.
    pub fn new(factory: F, profiles: Arc<P>, ttl_ms: i64, anonymous_ttl_ms: i64) -> Self {
        Self {
            factory,
            profiles,
            ttl_ms,
            anonymous_ttl_ms,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new session with its own gateway and projection
    pub async fn open(&self) -> Arc<PageSession<F::Gateway>> {
        let gateway = Arc::new(self.factory.open());
        let projection = SessionProjection::start(gateway.as_ref(), self.profiles.clone());
        let session = Arc::new(PageSession {
            id: PageSessionId::new(),
            gateway,
            projection,
            referrer: RwLock::new(None),
            last_seen_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        });

        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());

        tracing::debug!(page_session = %session.id, "Page session opened");

        session
    }

    /// Live session by id; idle sessions are treated as gone
    pub async fn get(&self, id: &PageSessionId) -> Option<Arc<PageSession<F::Gateway>>> {
        let now_ms = Utc::now().timestamp_millis();
        let session = self.sessions.read().await.get(id).cloned()?;
        if session.is_idle(now_ms, self.ttl_ms, self.anonymous_ttl_ms) {
            return None;
        }
        session.touch(now_ms);
        Some(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove idle sessions and stop their projections
    pub async fn evict_idle(&self) -> usize {
        let now_ms = Utc::now().timestamp_millis();
        let evicted: Vec<_> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<PageSessionId> = sessions
                .values()
                .filter(|s| s.is_idle(now_ms, self.ttl_ms, self.anonymous_ttl_ms))
                .map(|s| s.id)
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &evicted {
            session.projection.shutdown().await;
        }

        if !evicted.is_empty() {
            tracing::info!(sessions_evicted = evicted.len(), "Evicted idle page sessions");
        }

        evicted.len()
    }

    /// Stop every session (server shutdown)
    pub async fn shutdown_all(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &sessions {
            session.projection.shutdown().await;
        }
        tracing::info!(sessions_closed = sessions.len(), "Page sessions closed");
    }
}
