//! Channel session lifecycle over WebSocket.
//!
//! A [`ChannelSession`] owns exactly one persistent connection: it
//! splits the socket into spawned read and write tasks, queues outbound
//! frames, and forwards inbound frames to the owning dispatcher. Two
//! instances run concurrently per client, one for the lobby channel and
//! one for the per-table game channel.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use log::warn;
use open_blackjack::messages::GameClientCommand;
use open_blackjack::net::codec;
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// What a session surfaces to its dispatcher.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// One raw text frame, not yet decoded.
    Frame(String),
    /// The connection dropped without a local `close()`. Reconnection is
    /// deliberately left to the surrounding application.
    Disconnected { reason: String },
}

/// One persistent connection's lifecycle.
pub struct ChannelSession {
    outbound: mpsc::UnboundedSender<String>,
    deliberate_close: Arc<AtomicBool>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl ChannelSession {
    /// Connect and start pumping frames into `events`.
    pub async fn open(url: &str, events: mpsc::UnboundedSender<SessionEvent>) -> Result<Self> {
        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {url}"))?;
        let (mut write, mut read) = ws_stream.split();

        let (outbound, mut rx_outbound) = mpsc::unbounded_channel::<String>();
        let deliberate_close = Arc::new(AtomicBool::new(false));

        let write_task = tokio::spawn(async move {
            while let Some(frame) = rx_outbound.recv().await {
                if write.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let closing = Arc::clone(&deliberate_close);
        let read_task = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let _ = events.send(SessionEvent::Frame(text.to_string()));
                    }
                    Ok(Message::Close(_)) => {
                        if !closing.load(Ordering::SeqCst) {
                            let _ = events.send(SessionEvent::Disconnected {
                                reason: "server closed the connection".to_string(),
                            });
                        }
                        break;
                    }
                    Err(e) => {
                        if !closing.load(Ordering::SeqCst) {
                            let _ = events.send(SessionEvent::Disconnected {
                                reason: e.to_string(),
                            });
                        }
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            outbound,
            deliberate_close,
            read_task,
            write_task,
        })
    }

    /// Open a game-channel session. The first outbound frame is always
    /// the snapshot request; the server pushes nothing on a bare
    /// connection.
    pub async fn open_game(
        url: &str,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        let session = Self::open(url, events).await?;
        session.send(&GameClientCommand::InitGame);
        Ok(session)
    }

    /// Encode and queue one command. Never raises to the caller: if the
    /// socket is gone the command is logged and dropped.
    pub fn send<T: Serialize>(&self, command: &T) {
        match codec::encode(command) {
            Ok(frame) => {
                if self.outbound.send(frame).is_err() {
                    warn!("socket is closed, dropping outbound command");
                }
            }
            Err(e) => warn!("{e}"),
        }
    }

    /// Deliberate shutdown. Frames still queued are dropped with the
    /// socket, and no disconnected notification is raised.
    pub fn close(&self) {
        self.deliberate_close.store(true, Ordering::SeqCst);
        self.read_task.abort();
        self.write_task.abort();
    }
}
