// Websocket transport - live feed over tokio-tungstenite with JSON text frames
use crate::application::live_transport::{LiveSession, LiveTransport, TransportError};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    url: String,
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl LiveTransport for WsTransport {
    async fn connect(&self) -> Result<Box<dyn LiveSession>, TransportError> {
        let handshake = tokio_tungstenite::connect_async(self.url.as_str());
        let (socket, _) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Connect {
                url: self.url.clone(),
                reason: format!("timed out after {:?}", self.connect_timeout),
            })?
            .map_err(|e| TransportError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!("Websocket handshake with {} complete", self.url);

        let (sink, stream) = socket.split();
        Ok(Box::new(WsSession { sink, stream }))
    }
}

pub struct WsSession {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
}

/// Outbound events go out as `[event, payload]` text frames.
pub fn encode_event(event: &str, payload: Value) -> String {
    Value::Array(vec![Value::String(event.to_string()), payload]).to_string()
}

#[async_trait]
impl LiveSession for WsSession {
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => {
                        tracing::warn!("Dropping non-UTF-8 binary frame: {}", e);
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!("Peer closed websocket: {:?}", frame);
                    return None;
                }
                // tungstenite answers pings itself
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Read(e.to_string()))),
            }
        }
    }

    async fn emit(&mut self, event: &str, payload: Value) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(encode_event(event, payload)))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!("Websocket close: {}", e);
        }
    }
}
