mod events;
mod registry;
mod types;

pub use events::{SessionEmitter, SessionEvent};
pub use registry::{CompletedSession, ProcessIndexEntry, SessionRegistry, SessionSummary};
pub use types::{validate_session_id, AgentSession, LoopState, ModeState, Phase, PhaseState, SessionError, SessionMode};
