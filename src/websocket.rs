use crate::error::{AppError, AppResult};
use crate::models::MarketSnapshot;
use crate::services::{CollectionReport, MarketDataService};
use crate::state_manager::MarketEvent;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Requests a presentation client may send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Refresh,
    GetCurrent,
    TestIndicator { name: String },
}

/// Messages pushed to presentation clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { client_id: String, message: String },
    DataUpdated { snapshot: MarketSnapshot },
    CollectionReport { report: Box<CollectionReport> },
    Snapshot { snapshot: MarketSnapshot },
    IndicatorProbe { name: String, value: Option<f64> },
    Error { message: String },
}

impl From<MarketEvent> for ServerMessage {
    fn from(event: MarketEvent) -> Self {
        match event {
            MarketEvent::DataUpdated { snapshot } => ServerMessage::DataUpdated { snapshot },
        }
    }
}

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(100);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Delay before the next `accept` after `failures` consecutive errors
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}

type WsSender = Arc<Mutex<SplitSink<WebSocketStream<TcpStream>, Message>>>;

async fn send_message(sender: &WsSender, client_id: Uuid, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message: {}", e);
            return true;
        }
    };

    let mut sink = sender.lock().await;
    if let Err(e) = sink.send(Message::Text(json)).await {
        warn!("Failed to send message to client {}: {}", client_id, e);
        return false;
    }
    true
}

/// WebSocket feed exposing the engine to dashboard clients
#[derive(Clone)]
pub struct WebSocketServer {
    service: Arc<MarketDataService>,
}

impl WebSocketServer {
    pub fn new(service: Arc<MarketDataService>) -> Self {
        Self { service }
    }

    /// Accept connections forever, backing off while `accept` keeps failing
    pub async fn serve(self, listener: TcpListener) {
        let mut failures = 0u32;
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    failures = 0;
                    info!("New WebSocket connection from {}", addr);
                    let ws = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = ws.handle_connection(stream).await {
                            error!("WebSocket connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    error!("WebSocket accept error: {} (retrying in {:?})", e, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Handle a new WebSocket connection
    pub async fn handle_connection(&self, stream: TcpStream) -> AppResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| AppError::WebSocket(format!("handshake failed: {}", e)))?;

        let (ws_sender, mut ws_receiver) = ws_stream.split();
        let ws_sender: WsSender = Arc::new(Mutex::new(ws_sender));
        let mut events = self.service.state().subscribe_events();
        let client_id = Uuid::new_v4();

        info!("New WebSocket client: {}", client_id);

        let welcome = ServerMessage::Connected {
            client_id: client_id.to_string(),
            message: "Connected to CSPI data feed".to_string(),
        };
        send_message(&ws_sender, client_id, &welcome).await;

        // Incoming requests
        let service = self.service.clone();
        let sender_for_requests = ws_sender.clone();
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(request) => {
                            handle_request(request, &service, &sender_for_requests, client_id).await
                        }
                        Err(_) => {
                            warn!("Failed to parse message from client {}: {}", client_id, text);
                            let err = ServerMessage::Error {
                                message: "Invalid message format".to_string(),
                            };
                            send_message(&sender_for_requests, client_id, &err).await;
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("WebSocket connection closed: {}", client_id);
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        // Cycle notifications
        let sender_for_events = ws_sender;
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let message = ServerMessage::from(event);
                        if !send_message(&sender_for_events, client_id, &message).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, skipped {} updates", client_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(())
    }
}

async fn handle_request(
    request: ClientMessage,
    service: &Arc<MarketDataService>,
    sender: &WsSender,
    client_id: Uuid,
) {
    match request {
        ClientMessage::Refresh => {
            // Run the cycle off the read loop so the client stays responsive
            let service = service.clone();
            let sender = sender.clone();
            tokio::spawn(async move {
                let reply = match service.collect_all().await {
                    Ok(report) => ServerMessage::CollectionReport {
                        report: Box::new(report),
                    },
                    Err(e) => ServerMessage::Error {
                        message: e.to_string(),
                    },
                };
                send_message(&sender, client_id, &reply).await;
            });
        }
        ClientMessage::GetCurrent => {
            let reply = ServerMessage::Snapshot {
                snapshot: service.get_current(),
            };
            send_message(sender, client_id, &reply).await;
        }
        ClientMessage::TestIndicator { name } => {
            let value = service.test_indicator(&name).await;
            let reply = ServerMessage::IndicatorProbe { name, value };
            send_message(sender, client_id, &reply).await;
        }
    }
}
