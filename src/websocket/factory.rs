use crate::types::Result;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type RtSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket factory for creating WebSocket connections
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Performs the WebSocket handshake
    pub async fn create(url: &str) -> Result<RtSocket> {
        tracing::debug!("Creating WebSocket connection to: {}", url);
        let (stream, response) = connect_async(url).await?;
        tracing::debug!("WebSocket handshake completed with status {}", response.status());
        Ok(stream)
    }
}
