use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::constants::STREAM_DONE_SENTINEL;
use crate::models::StreamEvent;

/// Render one stream event as an SSE frame
pub fn to_event(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Delta(content) => {
            let data = serde_json::json!({ "content": content });
            Event::default().data(data.to_string())
        }
        StreamEvent::End => Event::default().data(STREAM_DONE_SENTINEL),
    }
}

/// Convert a chunk channel into an SSE response.
///
/// The response owns the receiver: when the client disconnects axum drops
/// the body, the channel closes and the upstream request is abandoned.
pub fn to_sse_response(rx: mpsc::Receiver<StreamEvent>) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let events = ReceiverStream::new(rx).map(|event| Ok(to_event(event)));
    Sse::new(events).keep_alive(KeepAlive::default())
}
