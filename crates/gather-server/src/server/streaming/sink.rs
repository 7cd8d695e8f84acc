use super::guard::InflightGuard;
use crate::server::telemetry::{increment_items_emitted, increment_stream_errors};
use axum::body::Body;
use bytes::Bytes;
use futures::{Stream, StreamExt, future};
use gather::Item;

/// Encodes `item` as one line of newline-delimited JSON.
///
/// # Errors
///
/// Returns [`gather::Error::Serialization`] if the item cannot be encoded.
pub fn encode_line(item: &Item) -> gather::Result<Bytes> {
    let mut line = serde_json::to_vec(item)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Builds a response body that writes each item as soon as it is pulled from
/// `stream`, encoded by `encode` (normally [`encode_line`]).
///
/// The first encoding failure ends the body with that error and nothing after
/// it is written. Lines already written stay written: the status line went out
/// before the first item. Dropping the body (client disconnect) drops
/// `stream`, which cancels the run.
pub fn ndjson_body<S, F>(stream: S, mut guard: InflightGuard, mut encode: F) -> Body
where
    S: Stream<Item = Item> + Send + 'static,
    F: FnMut(&Item) -> gather::Result<Bytes> + Send + 'static,
{
    let lines = stream.scan(false, move |failed, item| {
        if *failed {
            return future::ready(None);
        }

        let line = encode(&item);
        match &line {
            Ok(_) => {
                guard.record_item();
                increment_items_emitted(1);
            }
            Err(e) => {
                *failed = true;
                increment_stream_errors();
                tracing::error!(
                    id = item.id(),
                    written = guard.items(),
                    "Abandoning stream: {e}"
                );
            }
        }
        future::ready(Some(line))
    });

    Body::from_stream(lines)
}
