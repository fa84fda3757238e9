// Chunked NDJSON streaming of view snapshots
use crate::application::device_view::ViewSnapshot;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use std::sync::Arc;
use tokio::sync::watch;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Yields the current snapshot, then one per change, until the view is torn down.
pub fn snapshot_stream(
    mut rx: watch::Receiver<Arc<ViewSnapshot>>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    async_stream::stream! {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            yield serialize_chunk(&snapshot);

            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// One JSON document followed by a newline
fn serialize_chunk<T: serde::Serialize>(value: &T) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(value).map_err(std::io::Error::other)?;
    let mut chunk = BytesMut::with_capacity(json.len() + 1);
    chunk.put_slice(&json);
    chunk.put_u8(b'\n');
    Ok(chunk.freeze())
}

pub fn ndjson_response<S>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
{
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
