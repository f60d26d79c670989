//! SSE progress streaming endpoint
//!
//! Subscribers get the current task snapshot immediately, then every
//! published snapshot in order. The stream ends after the terminal snapshot.
//! A subscriber that falls behind the bounded buffer receives a `lagged`
//! event and continues with the newest snapshots.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::stream::{self, BoxStream, StreamExt};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use video_text_orchestrator::Task;

use crate::ApiState;

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

/// Subscribe to live task snapshots over SSE
pub async fn task_events(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> Result<Sse<KeepAliveStream<EventStream>>, (StatusCode, String)> {
    // Unknown identifiers fail immediately; no channel is opened
    state
        .store
        .get(&task_id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, format!("Task not found: {task_id}")))?;

    // Subscribe first, then re-read, so no update between the two is lost
    let rx = state.hub.subscribe(&task_id).await;
    let snapshot = state
        .store
        .get(&task_id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, format!("Task not found: {task_id}")))?;

    let terminal = snapshot.status.is_terminal();
    let initial = stream::once(async move { Ok::<_, Infallible>(snapshot_event(&snapshot)) });

    let events: EventStream = if terminal {
        // Already settled: deliver the terminal snapshot and close
        initial.boxed()
    } else {
        let updates = BroadcastStream::new(rx).filter_map(|result| async move {
            match result {
                Ok(snapshot) => Some(Ok(snapshot_event(&snapshot))),
                Err(BroadcastStreamRecvError::Lagged(missed)) => Some(Ok(Event::default()
                    .event("lagged")
                    .data(missed.to_string()))),
            }
        });
        initial.chain(updates).boxed()
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn snapshot_event(snapshot: &Task) -> Event {
    match Event::default().event("status").json_data(snapshot) {
        Ok(event) => event,
        Err(_) => Event::default().event("status").data("{}"),
    }
}
