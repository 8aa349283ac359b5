//! Mode orchestrators.
//!
//! Every `start_*` call registers a session synchronously and then hands the
//! session to a dedicated tokio task. That task is the only thing that spawns
//! subprocesses for the session, and it awaits each subprocess's exit before
//! taking the next step, so steps within a session never overlap. Before each
//! step the task re-checks that the session is still registered, which is how
//! a concurrent [`Orchestrator::stop_session`] ends the run.

mod delegation;
mod hivemind;
mod refinement;
mod step;
mod supervision;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use colored::Colorize;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::agents::{self, AgentDescriptor};
use crate::cli::{CliRegistry, RegistryError};
use crate::config::{AppConfig, OrchestrationConfig};
use crate::process::{ProcessHandle, ProcessLauncher, ProcessManager};
use crate::prompts::PromptSynthesizer;
use crate::session::{
    LoopState, ModeState, PhaseState, ProcessIndexEntry, SessionEmitter, SessionError, SessionEvent,
    SessionMode, SessionRegistry, SessionSummary,
};

pub use refinement::{PlaceholderScorer, QualityScorer};
pub(crate) use step::StepOutcome;

const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session already active: {0}")]
    SessionExists(String),
    #[error("Malformed session: {0}")]
    MalformedSession(String),
    #[error("Maximum number of sessions ({0}) reached")]
    TooManySessions(usize),
    #[error("Unknown CLI: {0}")]
    UnknownCli(String),
}

impl From<SessionError> for OrchestratorError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => OrchestratorError::NotFound(id),
            SessionError::AlreadyExists(id) => OrchestratorError::SessionExists(id),
            SessionError::Malformed(msg) => OrchestratorError::MalformedSession(msg),
            SessionError::TooManySessions(max) => OrchestratorError::TooManySessions(max),
        }
    }
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownCli(name) => OrchestratorError::UnknownCli(name),
        }
    }
}

/// Returned by every `start_*` call. `events` yields the session's output and
/// ends after its single completion notice.
pub struct SessionHandle {
    pub id: String,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Roster selection for parallel delegation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParallelOptions {
    pub preset: Option<String>,
    #[serde(default)]
    pub agents: Vec<String>,
}

/// Full view of one active session
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub id: String,
    pub mode: SessionMode,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub state: ModeState,
    pub processes: Vec<ProcessHandle>,
}

/// Owns the session registry and drives the four collaboration modes
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<RwLock<SessionRegistry>>,
    processes: Arc<ProcessManager>,
    clis: Arc<CliRegistry>,
    settings: OrchestrationConfig,
    events: broadcast::Sender<SessionEvent>,
    scorer: Arc<dyn QualityScorer>,
    prompts: Arc<PromptSynthesizer>,
}

impl Orchestrator {
    pub fn new(config: &AppConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            registry: Arc::new(RwLock::new(SessionRegistry::new(config.orchestration.max_sessions))),
            processes: Arc::new(ProcessManager::new(launcher)),
            clis: Arc::new(CliRegistry::new(config)),
            settings: config.orchestration.clone(),
            events,
            scorer: Arc::new(PlaceholderScorer),
            prompts: Arc::new(PromptSynthesizer::new()),
        }
    }

    /// Replace the refinement loop's quality scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Receive every session's events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// One verbose subprocess whose lines are classified as they stream
    pub fn start_supervision(
        &self,
        prompt: &str,
        session_id: Option<String>,
    ) -> Result<SessionHandle, OrchestratorError> {
        let command = self.clis.build_default(prompt, true)?;
        let handle = self.register(session_id, ModeState::Supervision)?;
        tokio::spawn(supervision::run(self.clone(), handle.id.clone(), command));
        Ok(handle)
    }

    /// One subprocess asked to answer as every persona of the selected roster
    pub fn start_parallel_agents(
        &self,
        prompt: &str,
        session_id: Option<String>,
        options: ParallelOptions,
    ) -> Result<SessionHandle, OrchestratorError> {
        let roster = agents::select_roster(prompt, options.preset.as_deref(), &options.agents);
        let command = self
            .clis
            .build_default(&self.prompts.delegation_prompt(prompt, &roster), false)?;

        // Only a preset that actually resolved is recorded
        let preset = options.preset.filter(|name| agents::preset(name).is_some());
        let handle = self.register(
            session_id,
            ModeState::ParallelDelegation {
                roster: roster.clone(),
                preset,
            },
        )?;
        tokio::spawn(delegation::run(self.clone(), handle.id.clone(), roster, command));
        Ok(handle)
    }

    /// Iterative self-refinement until the scorer is satisfied or the budget runs out
    pub fn start_infinite_loop(
        &self,
        prompt: &str,
        session_id: Option<String>,
    ) -> Result<SessionHandle, OrchestratorError> {
        self.ensure_default_cli()?;
        let state = LoopState::new(
            self.settings.max_iterations.max(1),
            self.settings.quality_threshold,
        );
        let handle = self.register(session_id, ModeState::InfiniteLoop(state))?;
        tokio::spawn(refinement::run(self.clone(), handle.id.clone(), prompt.to_string()));
        Ok(handle)
    }

    /// Architect, implementer and reviewer phases, each fed the previous phase's output
    pub fn start_hivemind(
        &self,
        prompt: &str,
        session_id: Option<String>,
    ) -> Result<SessionHandle, OrchestratorError> {
        self.ensure_default_cli()?;
        let handle = self.register(session_id, ModeState::Hivemind(PhaseState::new()))?;
        tokio::spawn(hivemind::run(self.clone(), handle.id.clone(), prompt.to_string()));
        Ok(handle)
    }

    /// Terminate every process the session owns and remove it
    pub fn stop_session(&self, session_id: &str) -> Result<(), OrchestratorError> {
        let completed = self.registry.write().stop(session_id)?;
        tracing::info!(
            "Stopped session {} after {}ms",
            completed.session_id,
            completed.duration_ms
        );
        Ok(())
    }

    pub fn list_active_sessions(&self) -> Vec<SessionSummary> {
        self.registry.read().list_active()
    }

    pub fn get_session(&self, session_id: &str) -> Option<SessionDetail> {
        let registry = self.registry.read();
        let session = registry.get(session_id)?;
        Some(SessionDetail {
            id: session.id().to_string(),
            mode: session.mode(),
            start_time: session.start_time(),
            duration_ms: session.duration_ms(),
            state: session.mode_state.clone(),
            processes: session.process_handles.clone(),
        })
    }

    /// Which session and role a process handle belongs to
    pub fn process_owner(&self, handle_id: &str) -> Option<ProcessIndexEntry> {
        self.registry.read().process_owner(handle_id).cloned()
    }

    /// Stop every active session. Returns how many were stopped.
    pub fn shutdown(&self) -> usize {
        let ids = self.registry.read().active_ids();
        let mut stopped = 0;
        for id in ids {
            match self.stop_session(&id) {
                Ok(()) => stopped += 1,
                // finished on its own in the meantime
                Err(OrchestratorError::NotFound(_)) => {}
                Err(e) => tracing::warn!("Failed to stop session {}: {}", id, e),
            }
        }
        let lingering = self.processes.running_count();
        if lingering > 0 {
            tracing::warn!("Killing {} processes still running at shutdown", lingering);
        }
        self.processes.kill_all();
        tracing::info!("Orchestrator shut down, {} sessions stopped", stopped);
        stopped
    }

    fn ensure_default_cli(&self) -> Result<(), OrchestratorError> {
        self.clis.build_command(self.clis.default_cli(), false)?;
        Ok(())
    }

    fn register(&self, session_id: Option<String>, state: ModeState) -> Result<SessionHandle, OrchestratorError> {
        let (id, events) = self
            .registry
            .write()
            .create_session(session_id, state, self.events.clone())?;
        Ok(SessionHandle { id, events })
    }

    pub(crate) fn is_active(&self, session_id: &str) -> bool {
        self.registry.write().validate(session_id)
    }

    pub(crate) fn emitter(&self, session_id: &str) -> Option<SessionEmitter> {
        self.registry.read().emitter(session_id)
    }

    pub(crate) fn update_mode_state<R>(&self, session_id: &str, f: impl FnOnce(&mut ModeState) -> R) -> Option<R> {
        self.registry.write().update_mode_state(session_id, f)
    }

    /// Natural end of a session. A no-op if it was stopped already.
    pub(crate) fn finish(&self, session_id: &str) {
        if self.registry.write().cleanup(session_id).is_none() {
            tracing::debug!("Session {} was already cleaned up", session_id);
        }
    }

    /// Pause between loop iterations and hivemind phases
    pub(crate) async fn step_delay(&self) {
        if self.settings.step_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.settings.step_delay_ms)).await;
        }
    }
}

/// Banner line shared by the modes
pub(crate) fn banner(text: &str) -> String {
    format!("{}\n", text.bold())
}

pub(crate) fn roster_line(roster: &[AgentDescriptor]) -> String {
    roster
        .iter()
        .map(|agent| format!("{} {}", agent.emoji_tag, agent.display_name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests;
