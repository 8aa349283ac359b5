//! Scripted stand-in for the assistant CLI used by unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::handle::{KillSwitch, ProcessError, ProcessEvent};
use super::launcher::{LaunchedProcess, ProcessLauncher};
use crate::cli::BuiltCommand;

/// Output replayed by one launch
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedRun {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: Option<i32>,
    pub spawn_error: Option<String>,
    /// Keep running until the kill switch fires
    pub hang: bool,
}

impl ScriptedRun {
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            stdout: lines.iter().map(|l| l.to_string()).collect(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn with_stderr(mut self, lines: &[&str]) -> Self {
        self.stderr = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn spawn_failure(message: &str) -> Self {
        Self {
            spawn_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }
}

/// Replays [`ScriptedRun`]s in order and records every command it was asked to launch.
/// Once the script is exhausted each launch exits 0 with no output.
#[derive(Default)]
pub(crate) struct ScriptedLauncher {
    runs: Mutex<VecDeque<ScriptedRun>>,
    launched: Mutex<Vec<BuiltCommand>>,
}

impl ScriptedLauncher {
    pub fn new(runs: Vec<ScriptedRun>) -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(runs.into()),
            launched: Mutex::new(Vec::new()),
        })
    }

    pub fn launched(&self) -> Vec<BuiltCommand> {
        self.launched.lock().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.launched
            .lock()
            .iter()
            .filter_map(|c| c.prompt().map(str::to_string))
            .collect()
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(&self, command: &BuiltCommand) -> Result<LaunchedProcess, ProcessError> {
        self.launched.lock().push(command.clone());
        let run = self.runs.lock().pop_front().unwrap_or_else(|| ScriptedRun::lines(&[]));

        if let Some(message) = run.spawn_error {
            return Err(ProcessError::SpawnError(message));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for line in run.stdout {
            let _ = tx.send(ProcessEvent::Stdout(line));
        }
        for line in run.stderr {
            let _ = tx.send(ProcessEvent::Stderr(line));
        }

        let kill_switch = KillSwitch::new();
        if run.hang {
            let switch = kill_switch.clone();
            tokio::spawn(async move {
                switch.requested().await;
                switch.mark_exited();
                let _ = tx.send(ProcessEvent::Exited { code: None });
            });
        } else {
            kill_switch.mark_exited();
            let _ = tx.send(ProcessEvent::Exited { code: run.exit_code });
        }

        Ok(LaunchedProcess { events: rx, kill_switch, pid: None })
    }
}
