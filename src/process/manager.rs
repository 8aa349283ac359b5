use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::handle::{ProcessError, ProcessEvent, ProcessHandle};
use super::launcher::ProcessLauncher;
use crate::cli::BuiltCommand;

/// Spawns one subprocess per unit of work and keeps the live ones addressable by id
pub struct ProcessManager {
    launcher: Arc<dyn ProcessLauncher>,
    running: Arc<RwLock<HashMap<String, ProcessHandle>>>,
    next_seq: AtomicU64,
}

impl ProcessManager {
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            running: Arc::new(RwLock::new(HashMap::new())),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Spawn a subprocess for `session_id`. The returned receiver ends with
    /// [`ProcessEvent::Exited`].
    pub fn spawn(
        &self,
        session_id: &str,
        role: &str,
        command: &BuiltCommand,
    ) -> Result<(ProcessHandle, mpsc::UnboundedReceiver<ProcessEvent>), ProcessError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}-{}-{}", session_id, role, seq);

        let launched = self.launcher.launch(command).map_err(|e| {
            tracing::error!("Failed to spawn {} for session {}: {}", role, session_id, e);
            e
        })?;
        tracing::info!("Spawned process {} (pid {:?})", id, launched.pid);

        let handle = ProcessHandle::new(id.clone(), role.to_string(), launched.kill_switch);
        self.running.write().insert(id, handle.clone());

        Ok((handle, launched.events))
    }

    /// Forget a process once its exit has been observed
    pub fn release(&self, id: &str) {
        self.running.write().remove(id);
    }

    pub fn kill_all(&self) {
        let running = self.running.read();
        for handle in running.values() {
            handle.terminate();
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.read().len()
    }
}
