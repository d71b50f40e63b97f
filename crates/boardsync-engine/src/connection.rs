//! Channel connection: owns the WebSocket to the board server.
//!
//! One background task holds the socket, decodes inbound frames into
//! [`ServerEvent`]s, drains outbound [`ClientCommand`]s, and reconnects with
//! exponential backoff on unexpected drops. After the attempt ceiling is
//! reached it parks in [`ConnectionState::Error`] instead of retrying
//! silently forever. No task semantics live here.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use boardsync_core::{ClientCommand, ServerEvent};

use crate::config::ChannelConfig;

/// Connectivity of the event channel, observable by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Handshake failure or exhausted reconnection attempts.
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawn the connection task.
///
/// Inbound events flow out through `events_tx`; outbound commands are drained
/// from `outbound_rx`. The task exits when the shutdown flag flips or its
/// sender is dropped.
pub(crate) fn spawn(
    config: ChannelConfig,
    outbound_rx: mpsc::Receiver<ClientCommand>,
    events_tx: mpsc::Sender<ServerEvent>,
    shutdown_rx: watch::Receiver<bool>,
) -> (watch::Receiver<ConnectionState>, JoinHandle<()>) {
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let handle = tokio::spawn(run(config, state_tx, outbound_rx, events_tx, shutdown_rx));
    (state_rx, handle)
}

async fn run(
    config: ChannelConfig,
    state_tx: watch::Sender<ConnectionState>,
    mut outbound_rx: mpsc::Receiver<ClientCommand>,
    events_tx: mpsc::Sender<ServerEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut failed_attempts: u32 = 0;
    let mut delay = config.reconnect_initial_delay;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let _ = state_tx.send(ConnectionState::Connecting);
        info!(url = %config.url, "connecting to board server");

        let attempt = timeout(config.connect_timeout, connect_async(&config.url));
        let result = tokio::select! {
            _ = shutdown_rx.changed() => break,
            result = attempt => result,
        };

        match result {
            Ok(Ok((ws, _response))) => {
                info!(url = %config.url, "connected to board server");
                failed_attempts = 0;
                delay = config.reconnect_initial_delay;
                let _ = state_tx.send(ConnectionState::Connected);

                let reason = session(ws, &mut outbound_rx, &events_tx, &mut shutdown_rx).await;
                if *shutdown_rx.borrow() || events_tx.is_closed() {
                    break;
                }
                warn!(reason = %reason, "connection lost");
                let _ = state_tx.send(ConnectionState::Disconnected);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "connection failed");
                let _ = state_tx.send(ConnectionState::Error(e.to_string()));
            }
            Err(_) => {
                warn!(timeout = ?config.connect_timeout, "connection attempt timed out");
                let _ = state_tx.send(ConnectionState::Error("handshake timed out".to_string()));
            }
        }

        failed_attempts += 1;
        if failed_attempts > config.reconnect_attempts {
            error!(
                attempts = config.reconnect_attempts,
                "reconnection attempts exhausted, giving up"
            );
            let _ = state_tx.send(ConnectionState::Error(
                "reconnection attempts exhausted".to_string(),
            ));
            return;
        }

        debug!(delay = ?delay, attempt = failed_attempts, "waiting before reconnect");
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = sleep(delay) => {}
        }
        delay = (delay * 2).min(config.reconnect_max_delay);
    }

    let _ = state_tx.send(ConnectionState::Disconnected);
    debug!("connection task stopped");
}

/// Run one connected session until the socket drops or shutdown fires.
/// Returns the reason the session ended, for logging.
async fn session(
    ws: WsStream,
    outbound_rx: &mut mpsc::Receiver<ClientCommand>,
    events_tx: &mpsc::Sender<ServerEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> String {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return "shutdown".to_string();
            }
            command = outbound_rx.recv() => match command {
                Some(command) => {
                    debug!(command = command.name(), "sending command");
                    match command.encode() {
                        Ok(frame) => {
                            if let Err(e) = sink.send(Message::Text(frame)).await {
                                return format!("send failed: {}", e);
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to encode command, dropping"),
                    }
                }
                None => return "command channel closed".to_string(),
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // Malformed frames are dropped at decode, never propagated.
                    if let Some(event) = ServerEvent::decode(&text) {
                        if events_tx.send(event).await.is_err() {
                            return "event channel closed".to_string();
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "server closed the connection".to_string());
                    return reason;
                }
                Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                Some(Err(e)) => return format!("stream error: {}", e),
                None => return "stream ended".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(
            ConnectionState::Error("boom".to_string()).to_string(),
            "error: boom"
        );
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
    }

    #[tokio::test]
    async fn test_unreachable_server_parks_in_error() {
        let config = ChannelConfig {
            // Port 1 on loopback: refused immediately, no server listens there.
            url: "ws://127.0.0.1:1/ws".to_string(),
            connect_timeout: std::time::Duration::from_millis(500),
            reconnect_initial_delay: std::time::Duration::from_millis(1),
            reconnect_max_delay: std::time::Duration::from_millis(5),
            reconnect_attempts: 2,
        };
        let (_outbound_tx, outbound_rx) = mpsc::channel(8);
        let (events_tx, _events_rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let (state_rx, handle) = spawn(config, outbound_rx, events_tx, shutdown_rx);
        timeout(std::time::Duration::from_secs(10), handle)
            .await
            .expect("connection task should give up")
            .unwrap();
        assert!(matches!(*state_rx.borrow(), ConnectionState::Error(_)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_connection_task() {
        let config = ChannelConfig {
            url: "ws://127.0.0.1:1/ws".to_string(),
            connect_timeout: std::time::Duration::from_millis(500),
            reconnect_initial_delay: std::time::Duration::from_secs(60),
            reconnect_max_delay: std::time::Duration::from_secs(60),
            reconnect_attempts: 100,
        };
        let (_outbound_tx, outbound_rx) = mpsc::channel(8);
        let (events_tx, _events_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (state_rx, handle) = spawn(config, outbound_rx, events_tx, shutdown_rx);
        // Let it fail once and park in the backoff sleep, then shut down.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("connection task should stop on shutdown")
            .unwrap();
        assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);
    }
}
