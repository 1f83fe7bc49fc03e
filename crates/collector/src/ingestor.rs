//! Game WebSocket ingestion.
//!
//! A reader task keeps one connection open to the game instance, sends the
//! subscribe frame on every connect, and pushes typed [`StreamEvent`]s onto
//! a channel. A consumer task applies those events to the [`Monitor`].
//! Reconnection is unbounded with a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::frames::{GameFrame, SubscribeFrame};
use crate::monitor::Monitor;

/// Default delay before reconnecting after a failure or disconnect.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the reader -> consumer channel.
const EVENT_BUFFER: usize = 256;

type GameSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection settings for the game stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    pub channels: Vec<String>,
    pub reconnect_delay: Duration,
}

/// Events produced by the reader task.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Frame(GameFrame),
    Disconnected,
}

/// Spawn the reader and consumer tasks.
///
/// The returned handle completes once `cancel` fires and both tasks have
/// wound down.
pub fn spawn_ingestor(
    config: StreamConfig,
    monitor: Arc<Monitor>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let consumer = tokio::spawn(apply_events(monitor, rx));
        run(config, tx, cancel).await;
        // `tx` was moved into `run` and is dropped by now, which ends the consumer.
        if let Err(e) = consumer.await {
            tracing::error!(error = %e, "Stream consumer task failed");
        }
    })
}

/// Apply stream events to the monitor until the channel closes.
pub async fn apply_events(monitor: Arc<Monitor>, mut events: mpsc::Receiver<StreamEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Connected => monitor.set_stream_connected(true).await,
            StreamEvent::Disconnected => monitor.set_stream_connected(false).await,
            StreamEvent::Frame(frame) => {
                tracing::trace!(kind = frame.kind(), "Applying game frame");
                monitor.record_frame(frame).await;
            }
        }
    }
}

/// Why a game stream connection ended.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to connect: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("WebSocket protocol error: {0}")]
    Protocol(#[from] tungstenite::Error),

    #[error("failed to encode subscribe frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Keep a connection open until `cancel` fires, reconnecting after
/// `reconnect_delay` whenever it drops or fails to establish.
pub async fn run(config: StreamConfig, events: mpsc::Sender<StreamEvent>, cancel: CancellationToken) {
    loop {
        tracing::info!(url = %config.url, "Connecting to game WebSocket");

        tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect(&config.url) => {
                match result {
                    Ok(ws_stream) => {
                        tracing::info!(url = %config.url, "Game WebSocket connected");
                        if events.send(StreamEvent::Connected).await.is_err() {
                            break;
                        }
                        if let Err(e) = run_session(ws_stream, &config, &events, &cancel).await {
                            tracing::error!(error = %e, "Game WebSocket session failed");
                        }
                        if events.send(StreamEvent::Disconnected).await.is_err() {
                            break;
                        }
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::warn!("Game WebSocket session ended, reconnecting");
                    }
                    Err(e) => {
                        tracing::error!(url = %config.url, error = %e, "Game WebSocket connection failed");
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    tracing::info!("Game stream ingestor stopped");
}

async fn connect(url: &str) -> Result<GameSocket, StreamError> {
    let (ws_stream, _response) = connect_async(url).await.map_err(StreamError::Connect)?;
    Ok(ws_stream)
}

/// Drive one connection: subscribe, then forward recognised frames until
/// the socket closes, errors, or `cancel` fires.
async fn run_session(
    ws_stream: GameSocket,
    config: &StreamConfig,
    events: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
) -> Result<(), StreamError> {
    let (mut sink, mut stream) = ws_stream.split();

    let subscribe = serde_json::to_string(&SubscribeFrame::new(&config.channels))?;
    sink.send(Message::Text(subscribe)).await?;
    tracing::debug!(channels = ?config.channels, "Subscribed to game channels");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(());
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match GameFrame::parse(&text) {
                        Some(frame) => {
                            if events.send(StreamEvent::Frame(frame)).await.is_err() {
                                return Ok(());
                            }
                        }
                        None => {
                            tracing::debug!(raw = %text, "Ignoring unrecognised game frame");
                        }
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Game instance closed WebSocket");
                        return Ok(());
                    }
                    Some(Ok(_)) => {
                        // Binary / Frame -- ignore.
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        tracing::info!("Game WebSocket stream exhausted");
                        return Ok(());
                    }
                }
            }
        }
    }
}
