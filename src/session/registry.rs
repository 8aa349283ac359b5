use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use super::events::{SessionEmitter, SessionEvent};
use super::types::{validate_session_id, AgentSession, ModeState, SessionError, SessionMode};
use crate::process::ProcessHandle;

/// Reverse lookup from a process handle to the session that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessIndexEntry {
    pub session_id: String,
    pub role: String,
}

/// Snapshot row returned by [`SessionRegistry::list_active`]
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub mode: SessionMode,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Result of removing a session from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub session_id: String,
    pub duration_ms: i64,
}

/// Owns every active session plus the process index
pub struct SessionRegistry {
    sessions: HashMap<String, AgentSession>,
    process_index: HashMap<String, ProcessIndexEntry>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            process_index: HashMap::new(),
            max_sessions,
        }
    }

    /// Allocate and store a session. A caller-supplied id that is already active is
    /// rejected and the registry is left untouched.
    pub fn create_session(
        &mut self,
        requested_id: Option<String>,
        mode_state: ModeState,
        broadcast: broadcast::Sender<SessionEvent>,
    ) -> Result<(String, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        let id = requested_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        validate_session_id(&id)?;

        if self.sessions.contains_key(&id) {
            tracing::warn!("Rejecting duplicate session id {}", id);
            return Err(SessionError::AlreadyExists(id));
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(SessionError::TooManySessions(self.max_sessions));
        }

        let (emitter, rx) = SessionEmitter::new(id.clone(), broadcast);
        let session = AgentSession::new(id.clone(), mode_state, emitter)?;
        tracing::info!("Created {} session {}", session.mode().as_str(), id);
        self.sessions.insert(id.clone(), session);

        Ok((id, rx))
    }

    /// Check a session is fit to operate on. Only a missing or malformed id is fatal;
    /// stale index entries pointing at the session are repaired with a warning.
    pub fn validate(&mut self, session_id: &str) -> bool {
        let Some(session) = self.sessions.get(session_id) else {
            return false;
        };
        if validate_session_id(session.id()).is_err() {
            tracing::warn!("Session {} has a malformed id", session_id);
            return false;
        }

        let owned: Vec<&str> = session.process_handles.iter().map(|h| h.id.as_str()).collect();
        let before = self.process_index.len();
        self.process_index
            .retain(|handle_id, entry| entry.session_id != session_id || owned.contains(&handle_id.as_str()));
        let repaired = before - self.process_index.len();
        if repaired > 0 {
            tracing::warn!("Dropped {} stale process index entries for session {}", repaired, session_id);
        }
        true
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<&AgentSession> {
        self.sessions.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn emitter(&self, session_id: &str) -> Option<SessionEmitter> {
        self.sessions.get(session_id).map(|s| s.emitter.clone())
    }

    /// Apply `f` to a session's mode payload
    pub fn update_mode_state<R>(&mut self, session_id: &str, f: impl FnOnce(&mut ModeState) -> R) -> Option<R> {
        self.sessions.get_mut(session_id).map(|s| f(&mut s.mode_state))
    }

    /// Record a freshly spawned process as owned by the session
    pub fn attach_process(&mut self, session_id: &str, handle: ProcessHandle) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        self.process_index.insert(
            handle.id.clone(),
            ProcessIndexEntry {
                session_id: session_id.to_string(),
                role: handle.role.clone(),
            },
        );
        session.process_handles.push(handle);
        Ok(())
    }

    pub fn process_owner(&self, handle_id: &str) -> Option<&ProcessIndexEntry> {
        self.process_index.get(handle_id)
    }

    pub fn process_index_len(&self) -> usize {
        self.process_index.len()
    }

    /// Terminate every owned process, then clean up. Unknown ids fail without
    /// touching the registry.
    pub fn stop(&mut self, session_id: &str) -> Result<CompletedSession, SessionError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        for handle in &session.process_handles {
            if handle.terminate() {
                tracing::info!("Terminated process {} of session {}", handle.id, session_id);
            } else {
                tracing::debug!("Process {} of session {} already exited", handle.id, session_id);
            }
        }

        self.cleanup(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Remove the session and its index entries, then emit its completion notice.
    /// Returns `None` if the session was already gone, so the notice fires once.
    pub fn cleanup(&mut self, session_id: &str) -> Option<CompletedSession> {
        let mut session = self.sessions.remove(session_id)?;
        session.end_time = Some(Utc::now());
        let duration_ms = session.duration_ms();

        self.process_index.retain(|_, entry| entry.session_id != session_id);
        session.emitter.complete(duration_ms);
        tracing::info!("Session {} finished after {}ms", session_id, duration_ms);

        Some(CompletedSession {
            session_id: session_id.to_string(),
            duration_ms,
        })
    }

    /// Snapshot of active sessions, oldest first
    pub fn list_active(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id().to_string(),
                mode: s.mode(),
                start_time: s.start_time(),
                duration_ms: s.duration_ms(),
            })
            .collect();
        summaries.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(10)
    }
}
