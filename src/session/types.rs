use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use super::events::SessionEmitter;
use crate::agents::AgentDescriptor;
use crate::process::ProcessHandle;

/// Regex for validating session IDs - only alphanumeric, dash, and underscore allowed
static SESSION_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid session ID validation regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session already active: {0}")]
    AlreadyExists(String),
    #[error("Malformed session: {0}")]
    Malformed(String),
    #[error("Maximum number of sessions ({0}) reached")]
    TooManySessions(usize),
}

/// Validate a caller-supplied session ID.
/// Session IDs must contain only alphanumeric characters, dashes, and underscores.
pub fn validate_session_id(session_id: &str) -> Result<(), SessionError> {
    if session_id.is_empty() {
        return Err(SessionError::Malformed("Session ID cannot be empty".to_string()));
    }

    if !SESSION_ID_REGEX.is_match(session_id) {
        return Err(SessionError::Malformed(
            "Session ID must contain only alphanumeric characters, dashes, and underscores".to_string(),
        ));
    }

    // UUID is 36 chars, allow some buffer
    if session_id.len() > 128 {
        return Err(SessionError::Malformed("Session ID is too long".to_string()));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Supervision,
    ParallelDelegation,
    InfiniteLoop,
    Hivemind,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Supervision => "supervision",
            SessionMode::ParallelDelegation => "parallel_delegation",
            SessionMode::InfiniteLoop => "infinite_loop",
            SessionMode::Hivemind => "hivemind",
        }
    }
}

/// A hivemind pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Architect,
    Implementer,
    Reviewer,
}

impl Phase {
    pub const PIPELINE: [Phase; 3] = [Phase::Architect, Phase::Implementer, Phase::Reviewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Architect => "architect",
            Phase::Implementer => "implementer",
            Phase::Reviewer => "reviewer",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Phase::Architect => "design the overall approach, components and interfaces for the request below.",
            Phase::Implementer => "implement the design above. Produce the complete code changes it calls for.",
            Phase::Reviewer => "review the implementation above for bugs, gaps and risks, and give the corrected final result.",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Phase::Architect => "🏗️",
            Phase::Implementer => "🔨",
            Phase::Reviewer => "🔍",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopState {
    pub iteration: u32,
    pub max_iterations: u32,
    pub quality_threshold: f64,
    pub last_output: String,
    pub last_quality: Option<f64>,
}

impl LoopState {
    pub fn new(max_iterations: u32, quality_threshold: f64) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            quality_threshold,
            last_output: String::new(),
            last_quality: None,
        }
    }

    /// Loop stops once the threshold is met or the iteration budget is spent
    pub fn converged(&self, quality: f64) -> bool {
        quality >= self.quality_threshold || self.iteration >= self.max_iterations
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseState {
    pub phases: Vec<Phase>,
    pub current_phase_index: usize,
    /// Output of the previous phase only
    pub accumulated_context: String,
}

impl PhaseState {
    pub fn new() -> Self {
        Self {
            phases: Phase::PIPELINE.to_vec(),
            current_phase_index: 0,
            accumulated_context: String::new(),
        }
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.phases.get(self.current_phase_index).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.current_phase_index >= self.phases.len()
    }

    /// Record a finished phase: its output replaces the context and the index moves by one
    pub fn advance(&mut self, output: String) {
        self.accumulated_context = output;
        self.current_phase_index += 1;
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-mode payload. The mode itself is derived from this, so the two can never disagree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeState {
    Supervision,
    ParallelDelegation {
        roster: Vec<AgentDescriptor>,
        preset: Option<String>,
    },
    InfiniteLoop(LoopState),
    Hivemind(PhaseState),
}

impl ModeState {
    pub fn mode(&self) -> SessionMode {
        match self {
            ModeState::Supervision => SessionMode::Supervision,
            ModeState::ParallelDelegation { .. } => SessionMode::ParallelDelegation,
            ModeState::InfiniteLoop(_) => SessionMode::InfiniteLoop,
            ModeState::Hivemind(_) => SessionMode::Hivemind,
        }
    }
}

/// One orchestration run of a single collaboration mode
pub struct AgentSession {
    id: String,
    start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Owned subprocesses, in spawn order
    pub process_handles: Vec<ProcessHandle>,
    pub mode_state: ModeState,
    pub(crate) emitter: SessionEmitter,
}

impl AgentSession {
    /// Validated factory: a session without a well-formed id cannot be built
    pub fn new(id: String, mode_state: ModeState, emitter: SessionEmitter) -> Result<Self, SessionError> {
        validate_session_id(&id)?;
        if emitter.session_id() != id {
            return Err(SessionError::Malformed(format!(
                "emitter bound to {} used for session {}",
                emitter.session_id(),
                id
            )));
        }

        Ok(Self {
            id,
            start_time: Utc::now(),
            end_time: None,
            process_handles: Vec::new(),
            mode_state,
            emitter,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode_state.mode()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Elapsed time, measured to `end_time` when set and to now otherwise
    pub fn duration_ms(&self) -> i64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds().max(0)
    }
}
