//! WebSocket transport - authority connection
//!
//! Decodes `{type, data}` frames into authority messages for the driver
//! queue, sends requests from the driver, and turns connection changes into
//! `ConnectionLost` / `ConnectionRestored` events. Reconnection mechanics live
//! here; the core only sees their effects.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use sl_protocol::{OutboundRequest, ProtocolFrame};
use sl_reveal::RevealEvent;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::config::{ConnectionState, ConnectorConfig};
use crate::driver::DriverEvent;
use crate::error::{ConnectorError, ConnectorResult};
use crate::tasks::TaskGuard;

/// Authority connection running in a background task
pub struct WsTransport {
    /// Connection configuration
    config: ConnectorConfig,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Connection task
    task: Option<TaskGuard>,

    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

/// Why a connection stopped pumping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    Closed,
    Shutdown,
}

impl WsTransport {
    pub fn new(config: ConnectorConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            task: None,
            shutdown_tx,
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Spawn the connection task
    pub fn start(
        &mut self,
        events: mpsc::Sender<DriverEvent>,
        requests: mpsc::Receiver<OutboundRequest>,
    ) -> ConnectorResult<()> {
        if self.task.is_some() {
            return Err(ConnectorError::ConnectionFailed("Already started".into()));
        }

        // Validate URL format
        let parsed = url::Url::parse(&self.config.url)
            .map_err(|e| ConnectorError::ConnectionFailed(format!("Invalid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ConnectorError::ConnectionFailed(format!(
                "Unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let config = self.config.clone();
        let state = Arc::clone(&self.state);
        let shutdown_rx = self.shutdown_tx.subscribe();

        self.task = Some(TaskGuard::spawn(run_connection(
            config,
            state,
            events,
            requests,
            shutdown_rx,
        )));
        Ok(())
    }

    /// Close the connection and stop reconnecting
    pub fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());
        self.task = None;
        *self.state.write() = ConnectionState::Disconnected;
    }
}

async fn run_connection(
    config: ConnectorConfig,
    state: Arc<RwLock<ConnectionState>>,
    events: mpsc::Sender<DriverEvent>,
    mut requests: mpsc::Receiver<OutboundRequest>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        *state.write() = ConnectionState::Connecting;

        let connected = tokio::time::timeout(config.timeout(), connect_async(config.url.as_str())).await;
        match connected {
            Ok(Ok((ws_stream, _))) => {
                log::info!("[Connector] Connected to {}", config.url);
                *state.write() = ConnectionState::Connected;
                if send_event(&events, RevealEvent::ConnectionRestored).await.is_err() {
                    return;
                }

                let exit = pump(ws_stream, &events, &mut requests, &mut shutdown_rx).await;

                *state.write() = ConnectionState::Disconnected;
                let _ = send_event(&events, RevealEvent::ConnectionLost).await;
                if exit == PumpExit::Shutdown {
                    return;
                }
            }
            Ok(Err(e)) => {
                log::error!("[Connector] WebSocket error: {}", e);
                *state.write() = ConnectionState::Error;
            }
            Err(_) => {
                log::error!("[Connector] Connection timeout after {:?}", config.timeout());
                *state.write() = ConnectionState::Error;
            }
        }

        if !config.auto_reconnect {
            return;
        }

        *state.write() = ConnectionState::Reconnecting;
        log::info!("[Connector] Reconnecting in {:?}", config.reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = shutdown_rx.recv() => return,
        }
    }
}

async fn pump(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::Sender<DriverEvent>,
    requests: &mut mpsc::Receiver<OutboundRequest>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> PumpExit {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            // Receive from WebSocket
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = decode_frame(text.as_str()) {
                            if send_event(events, event).await.is_err() {
                                return PumpExit::Shutdown;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return PumpExit::Closed,
                    Some(Err(e)) => {
                        log::error!("[Connector] WebSocket error: {}", e);
                        return PumpExit::Closed;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Send requests
            request = requests.recv() => {
                let Some(request) = request else {
                    return PumpExit::Shutdown;
                };
                match ProtocolFrame::request(&request).and_then(|f| f.encode()) {
                    Ok(json) => {
                        if write.send(Message::Text(json.into())).await.is_err() {
                            log::warn!("[Connector] Failed to send {}", request.name());
                            return PumpExit::Closed;
                        }
                    }
                    Err(e) => log::warn!("[Connector] Could not encode {}: {}", request.name(), e),
                }
            }

            // Shutdown signal
            _ = shutdown_rx.recv() => {
                let _ = write.send(Message::Close(None)).await;
                return PumpExit::Shutdown;
            }
        }
    }
}

/// Decode one text frame. Unknown or malformed frames are logged and dropped.
pub fn decode_frame(text: &str) -> Option<RevealEvent> {
    let frame = match ProtocolFrame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            log::warn!("[Connector] Invalid frame ({}): {}", e, text);
            return None;
        }
    };

    let event_type = frame.frame_type.clone();
    match frame.into_message() {
        Ok(msg) => Some(RevealEvent::Inbound(msg)),
        Err(e) => {
            log::warn!("[Connector] Dropping {} frame: {}", event_type, e);
            None
        }
    }
}

async fn send_event(events: &mpsc::Sender<DriverEvent>, event: RevealEvent) -> ConnectorResult<()> {
    events
        .send(DriverEvent::Reveal(event))
        .await
        .map_err(|_| ConnectorError::SendFailed)
}
