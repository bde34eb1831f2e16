//! Server-Sent Events stream of published snapshot lists.
//!
//! A client first receives the current list of each profile, then every
//! list published afterwards. Events are named after the profile
//! (`securities` / `indices`) and carry the list as JSON. Lagging clients
//! skip the lists they missed. Streams end when the server shuts down.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use super::HttpServerState;
use crate::domain::instrument::{ProfileKind, SnapshotList};

pub(super) async fn stream_handler(
    State(state): State<Arc<HttpServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Receivers first, so nothing published after the initial lists is lost.
    let securities_rx = state.hub.receiver(ProfileKind::Securities);
    let indices_rx = state.hub.receiver(ProfileKind::Indices);

    let initial: Vec<Result<Event, Infallible>> = [
        (ProfileKind::Securities, state.securities.snapshot()),
        (ProfileKind::Indices, state.indices.snapshot()),
    ]
    .iter()
    .filter_map(|(profile, snapshots)| snapshot_event(*profile, snapshots))
    .map(Ok)
    .collect();

    let live = BroadcastStream::new(securities_rx)
        .merge(BroadcastStream::new(indices_rx))
        .filter_map(|received| match received {
            Ok(broadcast) => snapshot_event(broadcast.profile, &broadcast.snapshots).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SSE client lagged, skipping snapshot lists");
                None
            }
        });

    tracing::debug!("SSE client connected");

    let events = tokio_stream::iter(initial).chain(live);
    let shutdown = state.shutdown.clone().cancelled_owned();
    let events = futures::StreamExt::take_until(events, shutdown);

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn snapshot_event(profile: ProfileKind, snapshots: &SnapshotList) -> Option<Event> {
    match Event::default()
        .event(profile.as_str())
        .json_data(snapshots.as_ref())
    {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::warn!(profile = %profile, error = %error, "Failed to serialize SSE event");
            None
        }
    }
}
