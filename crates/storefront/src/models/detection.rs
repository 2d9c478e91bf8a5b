//! Location detection shared by every request of a session.
//!
//! A session record is read once per request and written back whole when the
//! response goes out, so two overlapping requests for the same visitor each
//! hold their own copy of the detection bookkeeping. Ordering detections on
//! those copies lets a slow, stale lookup win. The registry keeps one
//! [`DetectionState`] per session id that all requests lock; the session copy
//! is a snapshot used to seed the registry after eviction or a restart.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::Session;
use tower_sessions::session::Id;

use oja_core::{DetectionState, DetectionTicket, LocationInfo};

use super::session::{load_detection, save_detection};
use crate::error::{AppError, Result};

/// How long an idle session's state stays in memory.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Maximum number of sessions tracked at once.
const MAX_SESSIONS: u64 = 100_000;

type SharedState = Arc<Mutex<DetectionState>>;

/// A detection that has been started but not yet applied.
#[derive(Debug)]
pub struct PendingDetection {
    state: SharedState,
    ticket: DetectionTicket,
}

/// Detection state per session id.
#[derive(Clone)]
pub struct DetectionRegistry {
    states: Cache<Id, SharedState>,
}

impl Default for DetectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Cache::builder()
                .max_capacity(MAX_SESSIONS)
                .time_to_idle(IDLE_TIMEOUT)
                .build(),
        }
    }

    /// The shared state for `session`, creating the session if it has no id
    /// yet.
    async fn shared(&self, session: &Session) -> Result<SharedState> {
        // Loading first makes `id()` reflect whether the record exists.
        let seed = load_detection(session).await?;
        if session.id().is_none() {
            session.save().await?;
        }
        let id = session
            .id()
            .ok_or_else(|| AppError::Internal("session has no id after save".to_string()))?;

        Ok(self
            .states
            .get_with(id, async move { Arc::new(Mutex::new(seed)) })
            .await)
    }

    /// Current detection state for `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn current(&self, session: &Session) -> Result<DetectionState> {
        let stored = load_detection(session).await?;
        match session.id() {
            Some(id) => match self.states.get(&id).await {
                Some(state) => Ok(state.lock().await.clone()),
                None => Ok(stored),
            },
            None => Ok(stored),
        }
    }

    /// Start a detection for `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn begin(&self, session: &Session) -> Result<PendingDetection> {
        let state = self.shared(session).await?;
        let (ticket, snapshot) = {
            let mut guard = state.lock().await;
            (guard.begin(), guard.clone())
        };
        save_detection(session, &snapshot).await?;
        Ok(PendingDetection { state, ticket })
    }

    /// Apply the outcome of `pending`, unless a newer request was applied
    /// first. Returns whether the outcome was applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn complete(
        &self,
        session: &Session,
        pending: PendingDetection,
        outcome: Option<LocationInfo>,
    ) -> Result<bool> {
        let (applied, snapshot) = {
            let mut guard = pending.state.lock().await;
            (guard.complete(pending.ticket, outcome), guard.clone())
        };
        if !applied {
            tracing::debug!(ticket = ?pending.ticket, "Discarding stale detection result");
        }
        save_detection(session, &snapshot).await?;
        Ok(applied)
    }

    /// Record a manual choice, superseding any detection still in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_manual(&self, session: &Session, location: LocationInfo) -> Result<()> {
        let state = self.shared(session).await?;
        let snapshot = {
            let mut guard = state.lock().await;
            guard.set_manual(location);
            guard.clone()
        };
        save_detection(session, &snapshot).await
    }
}
