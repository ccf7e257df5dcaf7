//! WebSocket source for a live depth sensor

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};
use url::Url;

use crate::config::StreamConfig;
use crate::source::MessageSource;
use crate::types::StreamMessage;
use crate::{Result, StreamError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reads wire messages from the sensor's WebSocket endpoint.
pub struct WebSocketSource {
    socket: Socket,
    url: Url,
    closed: bool,
}

impl WebSocketSource {
    /// Open the socket described by `config`.
    ///
    /// Fails with a configuration error before any network activity if host
    /// or token are missing, and with [`StreamError::Timeout`] if the
    /// handshake does not finish within the configured connect timeout.
    pub async fn connect(config: &StreamConfig) -> Result<Self> {
        let url = config.endpoint_url()?;
        let timeout = config.connect_timeout();
        info!(host = %config.host, port = config.port, path = %config.path, "Opening depth socket");

        let (socket, response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| StreamError::Timeout { duration: timeout })??;

        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Self { socket, url, closed: false })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl MessageSource for WebSocketSource {
    async fn next_message(&mut self) -> Result<Option<StreamMessage>> {
        if self.closed {
            return Ok(None);
        }

        while let Some(message) = self.socket.next().await {
            match message? {
                WsMessage::Text(text) => {
                    return Ok(Some(StreamMessage::Text(text.as_str().to_owned())));
                }
                WsMessage::Binary(bytes) => return Ok(Some(StreamMessage::Binary(bytes))),
                WsMessage::Close(frame) => {
                    debug!(?frame, "Peer closed the socket");
                    self.closed = true;
                    return Ok(None);
                }
                other => trace!(len = other.len(), "Ignoring control frame"),
            }
        }

        self.closed = true;
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.socket.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn describe(&self) -> String {
        // Keep the token out of logs
        let mut url = self.url.clone();
        url.set_query(None);
        format!("websocket {url}")
    }
}
