//! WebSocket Transport
//!
//! `tokio-tungstenite` adapter behind the [`StreamConnector`] port. Opens a
//! TLS WebSocket to the resolved endpoint and exposes the split halves as
//! [`StreamSink`] / [`StreamSource`].

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::endpoint::Endpoint;
use crate::application::ports::{
    Frame, StreamConnector, StreamSink, StreamSource, TransportError,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens real WebSocket connections to the feed.
#[derive(Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<(Box<dyn StreamSink>, Box<dyn StreamSource>), TransportError> {
        let url = endpoint.url();
        debug!(%url, "opening websocket");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let (write, read) = ws_stream.split();
        Ok((Box::new(WsSink { write }), Box::new(WsSource { read })))
    }
}

struct WsSink {
    write: SplitSink<WsStream, Message>,
}

#[async_trait]
impl StreamSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.write
            .send(Message::Ping(vec![].into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.write
            .send(Message::Pong(payload.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        // Close errors are irrelevant here: the connection is being
        // abandoned either way.
        let _ = self.write.send(Message::Close(None)).await;
    }
}

struct WsSource {
    read: SplitStream<WsStream>,
}

#[async_trait]
impl StreamSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        let message = self.read.next().await?;
        Some(match message {
            Ok(Message::Text(text)) => Ok(Frame::Text(text.to_string())),
            Ok(Message::Binary(data)) => Ok(Frame::Binary(data.to_vec())),
            Ok(Message::Ping(data)) => Ok(Frame::Ping(data.to_vec())),
            Ok(Message::Pong(_)) => Ok(Frame::Pong),
            Ok(Message::Close(frame)) => {
                Ok(Frame::Close(frame.map(|f| f.reason.to_string())))
            }
            Ok(Message::Frame(_)) => Ok(Frame::Unsupported),
            Err(e) => Err(TransportError::Closed(e.to_string())),
        })
    }
}
