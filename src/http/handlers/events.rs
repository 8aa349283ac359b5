use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;

use crate::http::state::AppState;
use crate::session::SessionEvent;

/// GET /api/events - Every session's `output` and `sessionComplete` events
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.orchestrator.subscribe()).filter_map(|item| async move {
        match item {
            Ok(event) => {
                let name = match &event {
                    SessionEvent::Output { .. } => "output",
                    SessionEvent::SessionComplete { .. } => "sessionComplete",
                };
                match Event::default().event(name).json_data(&event) {
                    Ok(sse_event) => Some(Ok(sse_event)),
                    Err(e) => {
                        tracing::warn!("Failed to encode event: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Event subscriber fell behind: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
