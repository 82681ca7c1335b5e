//! Server-sent history events for one artifact.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::errors::AppError;
use crate::AppState;

/// GET /api/artifacts/:id/events - Stream history changes of an artifact.
pub async fn artifact_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.repo.get_artifact(&id).await?.is_none() {
        return Err(AppError::artifact_not_found(&id));
    }

    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(move |received| {
        let event = match received {
            Ok(event) if event.artifact_id() == id => event,
            Ok(_) => return None,
            Err(lagged) => {
                tracing::debug!(artifact_id = %id, "Event subscriber lagged: {}", lagged);
                return None;
            }
        };

        match Event::default().event(event.kind()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::warn!("Failed to encode history event: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
