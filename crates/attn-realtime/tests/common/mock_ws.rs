//! Local WebSocket server that replays scripted text frames.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// What a session does once its frames are sent.
#[derive(Debug, Clone, Copy)]
pub enum AfterFrames {
    /// Answer pings until the client goes away.
    Hold,
    /// Send a going-away close frame immediately.
    Close,
}

pub struct MockWsServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    stop: CancellationToken,
}

impl MockWsServer {
    /// Bind an ephemeral port and serve every connection with `frames`.
    pub async fn start(frames: Vec<String>, after: AfterFrames) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let stop = CancellationToken::new();

        let script = Arc::new(frames);
        let counter = accepted.clone();
        let token = stop.clone();
        tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    () = token.cancelled() => return,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(_) => return,
                    },
                };
                tokio::spawn(serve(stream, script.clone(), after, counter.clone()));
            }
        });

        Self {
            addr,
            accepted,
            stop,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Completed handshakes so far.
    pub fn connection_count(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn shutdown(self) {
        self.stop.cancel();
    }
}

async fn serve(
    stream: TcpStream,
    frames: Arc<Vec<String>>,
    after: AfterFrames,
    accepted: Arc<AtomicUsize>,
) {
    let Ok(socket) = accept_async(stream).await else {
        return;
    };
    accepted.fetch_add(1, Ordering::SeqCst);

    let (mut sink, mut incoming) = socket.split();
    for text in frames.iter() {
        if sink.send(Message::Text(text.clone())).await.is_err() {
            return;
        }
    }

    match after {
        AfterFrames::Close => {
            let frame = CloseFrame {
                code: CloseCode::Away,
                reason: "restarting".into(),
            };
            let _ = sink.send(Message::Close(Some(frame))).await;
        }
        AfterFrames::Hold => {
            while let Some(Ok(message)) = incoming.next().await {
                match message {
                    Message::Ping(payload) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Message::Close(_) => return,
                    _ => {}
                }
            }
        }
    }
}
