//! Scripted push transport and fallback source for tests.

use crate::error::{RealtimeError, RealtimeResult};
use crate::fallback::FallbackSource;
use crate::status::ChannelKind;
use crate::transport::{BoxFuture, FrameStream, PushFrame, PushTransport};
use crate::update::LiveUpdate;
use attn_gateway::{GatewayError, GatewayResult};
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

enum Scripted {
    Fail(String),
    Hang,
    Accept(mpsc::UnboundedReceiver<RealtimeResult<PushFrame>>),
}

/// Feeds frames into an accepted mock connection. Dropping it ends the stream.
#[derive(Debug, Clone)]
pub struct MockSession {
    tx: mpsc::UnboundedSender<RealtimeResult<PushFrame>>,
}

impl MockSession {
    /// Returns false once the connection has been dropped by the client.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.tx.send(Ok(PushFrame::Text(text.into()))).is_ok()
    }

    pub fn send_heartbeat(&self) -> bool {
        self.tx.send(Ok(PushFrame::Heartbeat)).is_ok()
    }

    /// Report a server close on the stream.
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.tx
            .send(Err(RealtimeError::ConnectionClosed {
                code,
                reason: reason.to_string(),
            }))
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Mock push transport.
///
/// Connection attempts consume the script per URL in order; an empty script
/// fails the attempt.
#[derive(Default)]
pub struct MockPushTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    attempts: Mutex<Vec<String>>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next attempt on `url` fail.
    pub fn fail_next(&self, url: &str, reason: &str) {
        self.push(url, Scripted::Fail(reason.to_string()));
    }

    /// Make the next attempt on `url` never complete.
    pub fn hang_next(&self, url: &str) {
        self.push(url, Scripted::Hang);
    }

    /// Make the next attempt on `url` succeed; frames are fed via the session.
    pub fn accept_next(&self, url: &str) -> MockSession {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(url, Scripted::Accept(rx));
        MockSession { tx }
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.attempts.lock().iter().filter(|u| *u == url).count()
    }

    fn push(&self, url: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(scripted);
    }
}

impl PushTransport for MockPushTransport {
    fn connect(&self, url: &str) -> BoxFuture<'_, RealtimeResult<FrameStream>> {
        self.attempts.lock().push(url.to_string());
        let next = self
            .scripts
            .lock()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());

        Box::pin(async move {
            match next {
                Some(Scripted::Accept(rx)) => {
                    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|item| (item, rx))
                    });
                    Ok(stream.boxed())
                }
                Some(Scripted::Hang) => std::future::pending().await,
                Some(Scripted::Fail(reason)) => Err(RealtimeError::ConnectionFailed(reason)),
                None => Err(RealtimeError::ConnectionFailed(
                    "connection refused".to_string(),
                )),
            }
        })
    }
}

/// Fallback source answering from fixed values and counting polls.
#[derive(Default)]
pub struct MockFallback {
    replies: Mutex<HashMap<ChannelKind, Option<LiveUpdate>>>,
    failing: Mutex<HashMap<ChannelKind, bool>>,
    polls: Mutex<HashMap<ChannelKind, usize>>,
    gates: Mutex<HashMap<ChannelKind, Arc<Notify>>>,
}

impl MockFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reply(&self, kind: ChannelKind, update: Option<LiveUpdate>) {
        self.replies.lock().insert(kind, update);
    }

    pub fn set_failing(&self, kind: ChannelKind, failing: bool) {
        self.failing.lock().insert(kind, failing);
    }

    /// Hold polls for `kind` until the returned gate is notified, one poll
    /// per permit.
    pub fn gate(&self, kind: ChannelKind) -> Arc<Notify> {
        self.gates.lock().entry(kind).or_default().clone()
    }

    pub fn poll_count(&self, kind: ChannelKind) -> usize {
        self.polls.lock().get(&kind).copied().unwrap_or(0)
    }
}

impl FallbackSource for MockFallback {
    fn poll(&self, kind: ChannelKind) -> BoxFuture<'_, GatewayResult<Option<LiveUpdate>>> {
        Box::pin(async move {
            *self.polls.lock().entry(kind).or_insert(0) += 1;
            let gate = self.gates.lock().get(&kind).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.failing.lock().get(&kind).copied().unwrap_or(false) {
                return Err(GatewayError::Network("mock poll failure".to_string()));
            }
            Ok(self.replies.lock().get(&kind).cloned().flatten())
        })
    }
}
