use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

/// Notification delivered to whoever started a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// One classified or attributed chunk of text, ANSI-colored
    Output { session_id: String, text: String },
    /// Sent exactly once, after which the session emits nothing else
    SessionComplete { session_id: String, duration_ms: i64 },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Output { session_id, .. } => session_id,
            SessionEvent::SessionComplete { session_id, .. } => session_id,
        }
    }
}

/// Fans a session's events out to its own channel and the global broadcast
#[derive(Clone)]
pub struct SessionEmitter {
    session_id: String,
    tx: mpsc::UnboundedSender<SessionEvent>,
    broadcast: broadcast::Sender<SessionEvent>,
    /// Held across each send so nothing can follow the completion notice
    closed: Arc<Mutex<bool>>,
}

impl SessionEmitter {
    pub fn new(
        session_id: String,
        broadcast: broadcast::Sender<SessionEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Self {
            session_id,
            tx,
            broadcast,
            closed: Arc::new(Mutex::new(false)),
        };
        (emitter, rx)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Emit output text. Dropped silently once the session has completed.
    pub fn output(&self, text: impl Into<String>) {
        let closed = self.closed.lock();
        if *closed {
            return;
        }
        self.send(SessionEvent::Output {
            session_id: self.session_id.clone(),
            text: text.into(),
        });
    }

    /// Emit the completion notice. Only the first call has any effect.
    pub fn complete(&self, duration_ms: i64) -> bool {
        let mut closed = self.closed.lock();
        if *closed {
            return false;
        }
        *closed = true;
        self.send(SessionEvent::SessionComplete {
            session_id: self.session_id.clone(),
            duration_ms,
        });
        true
    }

    fn send(&self, event: SessionEvent) {
        // The caller may have dropped its receiver; broadcast has no
        // subscribers when nobody listens. Neither is an error.
        let _ = self.tx.send(event.clone());
        let _ = self.broadcast.send(event);
    }
}
