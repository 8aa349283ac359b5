use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::handle::{KillSwitch, ProcessError, ProcessEvent};
use crate::cli::BuiltCommand;

/// How long a killed process's output may keep draining before the exit is reported
const KILL_DRAIN: Duration = Duration::from_millis(500);

/// A freshly started subprocess: its event stream plus the means to stop it
pub struct LaunchedProcess {
    pub events: mpsc::UnboundedReceiver<ProcessEvent>,
    pub kill_switch: KillSwitch,
    pub pid: Option<u32>,
}

/// Starts subprocesses. The orchestrator only ever talks to this trait, so tests
/// can replay scripted output instead of running the real assistant.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &BuiltCommand) -> Result<LaunchedProcess, ProcessError>;
}

/// Launches the configured assistant CLI with piped stdout/stderr.
/// Must be called from within a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliLauncher;

impl ProcessLauncher for CliLauncher {
    fn launch(&self, command: &BuiltCommand) -> Result<LaunchedProcess, ProcessError> {
        tracing::info!("Spawning process: command={} args={:?} cwd={:?}", command.command, command.args, command.cwd);

        let mut cmd = Command::new(&command.command);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if command.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);

        if let Some(ref dir) = command.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::SpawnError(format!("{}: {}", command.command, e)))?;
        let pid = child.id();

        if let (Some(input), Some(mut stdin)) = (command.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::warn!("Failed to write prompt to stdin: {}", e);
                }
                // dropping stdin closes the pipe
            });
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (tx, rx) = mpsc::unbounded_channel();
        let kill_switch = KillSwitch::new();
        let switch = kill_switch.clone();

        tokio::spawn(async move {
            let mut pumps = tokio::spawn({
                let tx = tx.clone();
                async move {
                    futures::future::join(
                        pump_lines(stdout, tx.clone(), ProcessEvent::Stdout),
                        pump_lines(stderr, tx, ProcessEvent::Stderr),
                    )
                    .await;
                }
            });

            let (code, killed) = tokio::select! {
                status = child.wait() => (status.ok().and_then(|s| s.code()), false),
                _ = switch.requested() => {
                    tracing::info!("Killing process {:?}", pid);
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to kill process {:?}: {}", pid, e);
                    }
                    (child.wait().await.ok().and_then(|s| s.code()), true)
                }
            };
            switch.mark_exited();

            // A killed child's own children may still hold the pipes open
            if killed {
                if tokio::time::timeout(KILL_DRAIN, &mut pumps).await.is_err() {
                    tracing::warn!("Output of process {:?} still open after kill, abandoning it", pid);
                    pumps.abort();
                    let _ = pumps.await;
                }
            } else {
                let _ = pumps.await;
            }

            tracing::debug!("Process {:?} exited with {:?}", pid, code);
            let _ = tx.send(ProcessEvent::Exited { code });
        });

        Ok(LaunchedProcess { events: rx, kill_switch, pid })
    }
}

async fn pump_lines<R>(
    reader: Option<R>,
    tx: mpsc::UnboundedSender<ProcessEvent>,
    wrap: fn(String) -> ProcessEvent,
) where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(wrap(line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Stopped reading process output: {}", e);
                break;
            }
        }
    }
}
