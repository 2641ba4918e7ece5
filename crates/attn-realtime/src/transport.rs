//! Push transport seam.
//!
//! A channel only needs `connect(url)` yielding a frame stream; dropping the
//! stream tears the connection down.

use crate::error::{RealtimeError, RealtimeResult};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tracing::{debug, info, warn};

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Frame delivered by a push connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// Text payload (JSON tick).
    Text(String),
    /// Control traffic (ping/pong); counts for liveness only.
    Heartbeat,
}

/// Stream of frames. Ends when the peer goes away; a close frame or read
/// failure is reported as an error item.
pub type FrameStream = BoxStream<'static, RealtimeResult<PushFrame>>;

/// Opens push connections.
pub trait PushTransport: Send + Sync {
    fn connect(&self, url: &str) -> BoxFuture<'_, RealtimeResult<FrameStream>>;
}

/// WebSocket transport over `tokio-tungstenite`.
#[derive(Debug, Default, Clone)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self
    }
}

impl PushTransport for TungsteniteTransport {
    fn connect(&self, url: &str) -> BoxFuture<'_, RealtimeResult<FrameStream>> {
        let url = url.to_string();
        Box::pin(async move {
            info!(url = %url, "Connecting to WebSocket");

            // TCP_NODELAY on
            let (ws_stream, _response) = connect_async_tls_with_config(&url, None, true, None)
                .await
                .map_err(|e| RealtimeError::ConnectionFailed(format!("{url}: {e}")))?;

            let frames = ws_stream.filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => Some(Ok(PushFrame::Text(text))),
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => Some(Ok(PushFrame::Heartbeat)),
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (f.code.into(), f.reason.to_string()))
                            .unwrap_or((1000, "Normal close".to_string()));
                        warn!(code, %reason, "WebSocket closed by server");
                        Some(Err(RealtimeError::ConnectionClosed { code, reason }))
                    }
                    Ok(Message::Binary(_)) | Ok(Message::Frame(_)) => {
                        debug!("Ignoring non-text frame");
                        Some(Ok(PushFrame::Heartbeat))
                    }
                    Err(e) => Some(Err(e.into())),
                }
            });

            Ok(frames.boxed())
        })
    }
}
