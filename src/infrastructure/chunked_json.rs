// Chunked JSON streaming utilities
use crate::infrastructure::http_response::brotli_compress;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Create a chunked JSON streaming response
pub fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = Arc<T>> + Send + 'static,
    T: Serialize + Send + Sync + 'static,
{
    let byte_stream =
        stream.then(move |msg| async move { serialize_chunk(&*msg, compress).await });

    let body = Body::from_stream(byte_stream);

    // Chunks are compressed individually, so no Content-Encoding on the response.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// One frame: 4-byte big-endian length, then the (optionally Brotli) JSON payload.
pub async fn serialize_chunk<T: Serialize + ?Sized>(msg: &T, compress: bool) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(msg).map_err(std::io::Error::other)?;

    let payload = if compress { brotli_compress(json).await? } else { json };

    let length = u32::try_from(payload.len()).map_err(std::io::Error::other)?;
    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(length);
    chunk.put_slice(&payload);

    Ok(chunk.freeze())
}

/// Stream the current value, then every broadcast update. Lagged updates are skipped.
pub fn stream_from_broadcast<T>(
    initial: T,
    rx: broadcast::Receiver<Arc<T>>,
    compress: bool,
) -> impl IntoResponse
where
    T: Serialize + Send + Sync + 'static,
{
    let mut updates = BroadcastStream::new(rx);
    let stream = async_stream::stream! {
        yield Arc::new(initial);
        while let Some(update) = updates.next().await {
            match update {
                Ok(view) => yield view,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!("Dashboard stream lagged, skipped {} updates", skipped);
                }
            }
        }
    };

    match chunked_json_stream(stream, compress) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Buf;
    use serde_json::{json, Value};

    fn decode_frames(mut bytes: Bytes) -> Vec<Value> {
        let mut frames = Vec::new();
        while bytes.has_remaining() {
            let len = bytes.get_u32() as usize;
            let payload = bytes.split_to(len);
            frames.push(serde_json::from_slice(&payload).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_chunk_is_length_prefixed() {
        let chunk = serialize_chunk(&json!({"a": 1}), false).await.unwrap();
        assert_eq!(&chunk[..4], &[0, 0, 0, 7]);
        assert_eq!(&chunk[4..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_broadcast_stream_sends_initial_then_updates() {
        let (tx, rx) = broadcast::channel(4);
        let response = stream_from_broadcast(json!({"n": 0}), rx, false).into_response();

        tx.send(Arc::new(json!({"n": 1}))).unwrap();
        tx.send(Arc::new(json!({"n": 2}))).unwrap();
        drop(tx);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let frames = decode_frames(body);
        let ns: Vec<i64> = frames.iter().map(|f| f["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2]);
    }
}
