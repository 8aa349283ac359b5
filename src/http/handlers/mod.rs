pub mod events;
pub mod health;
pub mod presets;
pub mod sessions;

use crate::http::error::ApiError;

/// Reject ids that could never name a session before touching the orchestrator
pub fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    crate::session::validate_session_id(session_id)
        .map_err(|e| ApiError::bad_request(format!("Invalid session ID: {}", e)))
}

/// Prompts must carry some text
pub fn validate_prompt(prompt: &str) -> Result<(), ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt must not be empty"));
    }
    Ok(())
}
