//! BroadcastSink - live fan-out to websocket subscribers
//!
//! Each publication is serialized once and pushed into a bounded
//! `tokio::sync::broadcast` channel. Every connected websocket owns its own
//! receiver, so a slow subscriber only loses its own backlog.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use contracts::{ContractError, Publication, Sink};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, trace, warn};

/// Shared broadcast channel between the sink and the websocket server
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<Arc<str>>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns how many subscribers the message was queued for
    fn publish(&self, message: Arc<str>) -> usize {
        // Err only means nobody is listening right now
        self.tx.send(message).unwrap_or(0)
    }
}

pub struct BroadcastSink {
    name: String,
    hub: BroadcastHub,
}

impl BroadcastSink {
    pub fn new(hub: BroadcastHub) -> Self {
        Self {
            name: "broadcast".to_string(),
            hub,
        }
    }
}

impl Sink for BroadcastSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, publication: &Publication<'_>) -> Result<(), ContractError> {
        let message = serde_json::to_string(&publication.to_record())
            .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}")))?;

        let receivers = self.hub.publish(Arc::from(message));
        trace!(tag_id = %publication.tag_id(), receivers, "broadcast");
        Ok(())
    }
}

/// Bind `addr` and serve `GET /ws` until the task is dropped
pub async fn serve_websockets(addr: SocketAddr, hub: BroadcastHub) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Websocket broadcast endpoint listening on /ws");
    serve_websockets_on(listener, hub).await
}

/// Serve websocket subscribers on an already bound listener
pub async fn serve_websockets_on(listener: TcpListener, hub: BroadcastHub) -> io::Result<()> {
    let app = Router::new()
        .route("/ws", get(upgrade_subscriber))
        .with_state(hub);
    axum::serve(listener, app).await
}

async fn upgrade_subscriber(ws: WebSocketUpgrade, State(hub): State<BroadcastHub>) -> Response {
    let rx = hub.subscribe();
    ws.on_upgrade(move |socket| forward_to_subscriber(socket, rx))
}

async fn forward_to_subscriber(socket: WebSocket, mut rx: broadcast::Receiver<Arc<str>>) {
    let (mut outgoing, mut incoming) = socket.split();
    debug!("Websocket subscriber connected");

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Ok(text) => {
                    if outgoing.send(Message::Text(text.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Websocket subscriber lagging, messages dropped");
                }
                Err(RecvError::Closed) => break,
            },
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Websocket subscriber disconnected");
}
