//! Live price/attention channels for the dashboard.
//!
//! Provides:
//! - One push channel per data kind with capped exponential backoff
//! - Idle-based liveness detection and an immediate-reconnect signal
//! - A single derived pair status (`PairStatus`) over both channels
//! - REST polling fallback while a channel is down
//! - One update stream carrying push and poll values

pub mod backoff;
pub mod error;
pub mod fallback;
pub mod manager;
pub mod mock;
pub mod status;
pub mod transport;
pub mod update;

pub use backoff::BackoffConfig;
pub use error::{RealtimeError, RealtimeResult};
pub use fallback::{ApiFallback, FallbackSource};
pub use manager::{validate_push_url, ConnectionManager, RealtimeConfig, Subscription};
pub use mock::{MockFallback, MockPushTransport, MockSession};
pub use status::{ChannelKind, ConnectionSnapshot, ConnectionStatus, PairStatus};
pub use transport::{BoxFuture, FrameStream, PushFrame, PushTransport, TungsteniteTransport};
pub use update::{LiveEvent, LiveUpdate, UpdateSource};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
