use std::time::Duration;

use colored::Colorize;
use tokio::time::Instant;

use super::Orchestrator;
use crate::cli::BuiltCommand;
use crate::process::ProcessEvent;

/// How one subprocess step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// `None` when the process was killed by a signal
    Exited(Option<i32>),
    /// Killed after outliving the configured step timeout
    TimedOut,
    /// The subprocess never started; an error banner has been emitted
    SpawnFailed,
    /// The session was stopped before the step could start
    Cancelled,
}

impl Orchestrator {
    /// Run one subprocess to completion on behalf of `session_id`.
    ///
    /// Spawning and attaching happen under the registry lock, so a concurrent
    /// stop either prevents the spawn or sees the handle and terminates it.
    /// `on_event` receives every stdout/stderr line in arrival order.
    pub(crate) async fn run_step(
        &self,
        session_id: &str,
        role: &str,
        command: &BuiltCommand,
        mut on_event: impl FnMut(&ProcessEvent),
    ) -> StepOutcome {
        let spawned = {
            let mut registry = self.registry.write();
            if !registry.contains(session_id) {
                return StepOutcome::Cancelled;
            }
            self.processes.spawn(session_id, role, command).map(|(handle, events)| {
                let attached = registry.attach_process(session_id, handle.clone());
                (handle, events, attached)
            })
        };

        let (handle, mut events) = match spawned {
            Ok((handle, events, Ok(()))) => (handle, events),
            Ok((handle, _, Err(e))) => {
                tracing::warn!("Could not attach {}: {}", handle.id, e);
                handle.terminate();
                self.processes.release(&handle.id);
                return StepOutcome::Cancelled;
            }
            Err(e) => {
                if let Some(emitter) = self.emitter(session_id) {
                    let text = format!("❌ [SPAWN-ERROR] Failed to start {}: {}", role, e);
                    emitter.output(format!("{}\n", text.red().bold()));
                }
                return StepOutcome::SpawnFailed;
            }
        };

        let timeout = self.settings.step_timeout_secs;
        let deadline = timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
        let mut timed_out = false;

        let code = loop {
            let event = match deadline {
                Some(deadline) => tokio::select! {
                    event = events.recv() => event,
                    _ = tokio::time::sleep_until(deadline), if !timed_out => {
                        timed_out = true;
                        tracing::warn!("Process {} exceeded the step timeout, killing it", handle.id);
                        handle.terminate();
                        if let Some(emitter) = self.emitter(session_id) {
                            let text = format!("⏱️ [TIMEOUT] {} did not finish within {}s", role, timeout.unwrap_or_default());
                            emitter.output(format!("{}\n", text.yellow().bold()));
                        }
                        continue;
                    }
                },
                None => events.recv().await,
            };

            match event {
                Some(ProcessEvent::Exited { code }) => break code,
                Some(event) => on_event(&event),
                // launcher went away without an exit notice
                None => break None,
            }
        };

        self.processes.release(&handle.id);
        tracing::debug!("Process {} finished with {:?}", handle.id, code);

        if timed_out {
            StepOutcome::TimedOut
        } else {
            StepOutcome::Exited(code)
        }
    }
}

/// Closing line for a step's exit
pub(crate) fn exit_banner(label: &str, code: Option<i32>) -> String {
    let text = match code {
        Some(0) => format!("✅ {} finished (exit code 0)", label),
        Some(code) => format!("⚠️ {} finished (exit code {})", label, code),
        None => format!("⚠️ {} terminated by signal", label),
    };
    match code {
        Some(0) => format!("{}\n", text.green().bold()),
        _ => format!("{}\n", text.yellow().bold()),
    }
}
