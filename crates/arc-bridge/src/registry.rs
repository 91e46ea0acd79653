//! Live session tracking and shutdown fan-out.
//!
//! Every session gets a child of the registry's root [`CancellationToken`];
//! cancelling the root tears down all sessions at once.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier for a bridge session (`session_<uuid v7>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new identifier.
    pub fn new() -> Self {
        Self(format!("session_{}", Uuid::now_v7()))
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracks live sessions and owns the root shutdown token.
#[derive(Debug)]
pub struct SessionRegistry {
    /// Admission time of each live session.
    sessions: DashMap<SessionId, Instant>,
    active: AtomicUsize,
    total: AtomicU64,
    root: CancellationToken,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            active: AtomicUsize::new(0),
            total: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    /// Admit a new session unless `limit` is reached or shutdown has begun.
    ///
    /// The slot is held until the returned guard is dropped.
    pub fn try_open(
        self: &Arc<Self>,
        peer: Option<SocketAddr>,
        limit: Option<usize>,
    ) -> Option<SessionGuard> {
        if self.root.is_cancelled() {
            return None;
        }
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match limit {
                Some(max) if n >= max => None,
                _ => Some(n + 1),
            })
            .ok()?;

        let id = SessionId::new();
        let token = self.root.child_token();
        let _ = self.sessions.insert(id.clone(), Instant::now());
        let _ = self.total.fetch_add(1, Ordering::Relaxed);

        Some(SessionGuard {
            id,
            peer,
            token,
            registry: Arc::clone(self),
        })
    }

    /// Sessions currently open.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Sessions admitted since startup.
    pub fn total_started(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Admission time of the longest-running live session.
    pub fn oldest_started_at(&self) -> Option<Instant> {
        self.sessions.iter().map(|entry| *entry.value()).min()
    }

    /// Cancel every session and refuse new ones.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Clone of the root token, cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }

    fn release(&self, id: &SessionId) {
        if self.sessions.remove(id).is_some() {
            let _ = self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// An admitted session's slot. Dropping it deregisters the session.
#[derive(Debug)]
pub struct SessionGuard {
    id: SessionId,
    peer: Option<SocketAddr>,
    token: CancellationToken,
    registry: Arc<SessionRegistry>,
}

impl SessionGuard {
    /// The session's ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Remote address of the client, when known.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// The session's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the whole server is shutting down.
    pub fn server_shutting_down(&self) -> bool {
        self.registry.is_shutting_down()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
