//! WebSocket transport
//!
//! Accepts TCP connections, performs the WebSocket handshake and feeds each
//! session into the [`ConnectionLifecycle`]. One reader and one writer task
//! per connection.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::client::Connection;
use crate::error::{BroadcasterError, Result};
use crate::lifecycle::ConnectionLifecycle;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const WRITER_DRAIN: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on
    pub address: String,

    /// 0 picks a free port
    pub port: u16,

    /// Subprotocol echoed to clients that offer it
    pub subprotocol: Option<String>,

    /// Outbound queue capacity per connection
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8887,
            subprotocol: Some("Tobii.Interaction".to_string()),
            outbound_queue: 1024,
        }
    }
}

/// WebSocket server for eye-tracking clients
pub struct GazeServer {
    config: Arc<ServerConfig>,
    lifecycle: Arc<ConnectionLifecycle>,
    accept_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    running: Arc<RwLock<bool>>,
    shutdown: watch::Sender<bool>,
    local_addr: parking_lot::Mutex<Option<SocketAddr>>,
}

impl GazeServer {
    pub fn new(config: ServerConfig, lifecycle: Arc<ConnectionLifecycle>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config: Arc::new(config),
            lifecycle,
            accept_task: Arc::new(Mutex::new(None)),
            running: Arc::new(RwLock::new(false)),
            shutdown,
            local_addr: parking_lot::Mutex::new(None),
        }
    }

    /// Bind and start accepting clients. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.write().await;
        if *running {
            return Err(BroadcasterError::AlreadyRunning);
        }

        let bind_addr = format!("{}:{}", self.config.address, self.config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| BroadcasterError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        // Device state changes go to every connection from now on
        self.lifecycle.start();

        self.shutdown.send_replace(false);
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.config),
            self.shutdown.subscribe(),
        ));

        *self.accept_task.lock().await = Some(task);
        *self.local_addr.lock() = Some(local_addr);
        *running = true;

        tracing::info!("🚀 Gaze server listening on ws://{}", local_addr);
        Ok(local_addr)
    }

    /// Stop accepting and close every open connection
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.write().await;
        if !*running {
            return Err(BroadcasterError::NotStarted);
        }

        self.shutdown.send_replace(true);
        if let Some(task) = self.accept_task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::warn!("Accept task ended abnormally: {}", e);
            }
        }

        *self.local_addr.lock() = None;
        *running = false;

        tracing::info!("Gaze server stopped");
        Ok(())
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

impl Drop for GazeServer {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        if let Ok(mut task) = self.accept_task.try_lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    lifecycle: Arc<ConnectionLifecycle>,
    config: Arc<ServerConfig>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        Arc::clone(&lifecycle),
                        Arc::clone(&config),
                        shutdown.clone(),
                    ));
                }
                Err(e) => {
                    tracing::error!("Failed to accept client: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
    tracing::info!("Client acceptance task stopped");
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    lifecycle: Arc<ConnectionLifecycle>,
    config: Arc<ServerConfig>,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
    }

    let mut negotiated: Option<String> = None;
    let callback = |request: &Request, mut response: Response| -> std::result::Result<Response, ErrorResponse> {
        if let Some(protocol) = config.subprotocol.as_deref() {
            if offers_protocol(request, protocol) {
                if let Ok(value) = HeaderValue::from_str(protocol) {
                    response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                    negotiated = Some(protocol.to_string());
                }
            }
        }
        Ok(response)
    };

    let ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let (connection, mut outbound) = Connection::channel(Some(peer), config.outbound_queue);
    let (mut sink, mut source) = ws.split();

    let id = connection.id();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                tracing::debug!("Write to {} failed: {}", id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    tracing::info!(
        "{} opened from {} (subprotocol: {})",
        id,
        peer,
        negotiated.as_deref().unwrap_or("none")
    );
    lifecycle.on_connect(Arc::clone(&connection));

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("{} sent: {}", id, text.as_str());
                    lifecycle.on_message(&connection, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    lifecycle.on_error(&connection, &e);
                    break;
                }
            }
        }
    }

    lifecycle.on_disconnect(&connection);
    drop(connection);

    // The writer exits once every handle to the connection is gone
    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_DRAIN, writer).await.is_err() {
        abort.abort();
    }
    tracing::info!("{} from {} closed", id, peer);
}

/// Whether the handshake request lists `protocol` in Sec-WebSocket-Protocol
fn offers_protocol(request: &Request, protocol: &str) -> bool {
    request
        .headers()
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|offered| offered.trim() == protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(protocols: &[&str]) -> Request {
        let mut builder = Request::builder().uri("ws://127.0.0.1:8887/");
        for protocol in protocols {
            builder = builder.header(SEC_WEBSOCKET_PROTOCOL, *protocol);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 8887);
        assert_eq!(config.subprotocol.as_deref(), Some("Tobii.Interaction"));
        assert_eq!(config.outbound_queue, 1024);
    }

    #[test]
    fn test_offers_protocol() {
        assert!(offers_protocol(&request(&["Tobii.Interaction"]), "Tobii.Interaction"));
        assert!(offers_protocol(&request(&["chat, Tobii.Interaction"]), "Tobii.Interaction"));
        assert!(offers_protocol(&request(&["chat", "Tobii.Interaction"]), "Tobii.Interaction"));
        assert!(!offers_protocol(&request(&["chat"]), "Tobii.Interaction"));
        assert!(!offers_protocol(&request(&[]), "Tobii.Interaction"));
    }
}
