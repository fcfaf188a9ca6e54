use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use uuid::Uuid;

use super::error_response;
use crate::{
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::timer::TimerEvent,
    services::{screen_service::ScreenService, AppState},
};

/// SSE endpoint for countdown events
/// GET /api/v1/screens/{id}/stream
pub async fn screen_stream(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = ScreenService::new(state);
    let receiver = service
        .subscribe_timer(screen_id)
        .await
        .map_err(error_response)?;

    tracing::info!("Client connected to SSE stream: screen={}", screen_id);
    Ok(Sse::new(create_timer_stream(screen_id, receiver)).keep_alive(KeepAlive::default()))
}

struct ConnectionGauge;

impl ConnectionGauge {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ConnectionGauge {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Forwards timer events until the expiry event has been sent or the session ends.
fn create_timer_stream(
    screen_id: Uuid,
    receiver: Receiver<TimerEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (receiver, false, ConnectionGauge::open()),
        move |(mut receiver, final_sent, gauge)| async move {
            if final_sent {
                return None;
            }

            loop {
                match receiver.recv().await {
                    Ok(timer_event) => {
                        let is_final = matches!(timer_event, TimerEvent::TimeExpired(_));
                        let event = Event::default()
                            .event(timer_event.event_name())
                            .data(timer_event.to_sse_data());
                        if is_final {
                            tracing::info!("Timer expired: screen={}", screen_id);
                        }
                        return Some((Ok(event), (receiver, is_final, gauge)));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("SSE stream for screen {} skipped {} ticks", screen_id, skipped);
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Attempt session closed, ending SSE stream: screen={}", screen_id);
                        return None;
                    }
                }
            }
        },
    )
}
