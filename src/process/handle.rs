use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn command: {0}")]
    SpawnError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One unit of subprocess output, in arrival order per stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// Always the last event. `code` is `None` when the process was killed by a signal.
    Exited { code: Option<i32> },
}

/// Shared termination signal for one subprocess.
///
/// Terminating a process that already exited is a no-op.
#[derive(Clone, Default)]
pub struct KillSwitch {
    signal: Arc<Notify>,
    exited: Arc<AtomicBool>,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination. Returns false if the process had already exited.
    pub fn terminate(&self) -> bool {
        if self.has_exited() {
            return false;
        }
        // notify_one stores a permit, so a request made before the
        // supervisor starts waiting is not lost
        self.signal.notify_one();
        true
    }

    pub async fn requested(&self) {
        self.signal.notified().await
    }

    pub fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }
}

/// A spawned subprocess owned by exactly one session
#[derive(Clone, Serialize)]
pub struct ProcessHandle {
    pub id: String,
    pub role: String,
    #[serde(skip)]
    kill_switch: KillSwitch,
}

impl ProcessHandle {
    pub fn new(id: String, role: String, kill_switch: KillSwitch) -> Self {
        Self { id, role, kill_switch }
    }

    pub fn terminate(&self) -> bool {
        self.kill_switch.terminate()
    }

    pub fn has_exited(&self) -> bool {
        self.kill_switch.has_exited()
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("exited", &self.has_exited())
            .finish()
    }
}
