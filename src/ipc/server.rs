//! Unix domain socket server for IPC
//!
//! Provides request-response communication for the start/stop toggle and
//! status queries, and pushes listening events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::controller::{ControllerHandle, ControllerStatus};
use crate::events::ListeningEvent;

use super::protocol::{ListenerStatus, Notification, Request, Response};

/// Largest accepted message body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    controller: ControllerHandle,
    /// Source of notifications for subscribed clients
    events: broadcast::Sender<ListeningEvent>,
}

/// Shared server state
struct ServerState {
    status: ListenerStatus,
    start_time: std::time::Instant,
}

/// What a client connection woke up for
enum Incoming {
    Request(Option<Result<Request, String>>),
    Event(Option<ListeningEvent>),
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        controller: ControllerHandle,
        events: broadcast::Sender<ListeningEvent>,
        initial: ControllerStatus,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: ListenerStatus::from(initial),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            controller,
            events,
        })
    }

    /// Fold a controller event into the status served to clients
    pub async fn apply_event(&self, event: &ListeningEvent) {
        let mut server_state = self.state.write().await;
        let old_state = server_state.status.state;
        server_state.status.apply(event);

        if old_state != server_state.status.state {
            debug!(
                from = %old_state,
                to = %server_state.status.state,
                "IPC server: state updated"
            );
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let controller = self.controller.clone();
                    let events = self.events.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, controller, events) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        controller: ControllerHandle,
        events: broadcast::Sender<ListeningEvent>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));
        let mut subscription: Option<broadcast::Receiver<ListeningEvent>> = None;

        let result = loop {
            let incoming = tokio::select! {
                request = request_rx.recv() => Incoming::Request(request),
                event = next_event(&mut subscription) => Incoming::Event(event),
            };

            match incoming {
                Incoming::Request(None) => break Ok(()),
                Incoming::Request(Some(Err(message))) => {
                    let response = Response::Error {
                        code: "bad_request".into(),
                        message,
                    };
                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }
                Incoming::Request(Some(Ok(request))) => {
                    debug!(?request, "received request");
                    let response = Self::process_request(request, &state, &controller).await;
                    if response == Response::Subscribed && subscription.is_none() {
                        subscription = Some(events.subscribe());
                        debug!("client subscribed to notifications");
                    }
                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }
                Incoming::Event(Some(event)) => {
                    let notification = Notification::Event { event };
                    if let Err(e) = Self::send_message(&mut writer, &notification).await {
                        break Err(e);
                    }
                }
                Incoming::Event(None) => subscription = None,
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until the client disconnects
    async fn read_requests<R: AsyncRead + Unpin>(
        mut reader: R,
        requests: mpsc::Sender<Result<Request, String>>,
    ) {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return;
                }
                Err(e) => {
                    warn!(?e, "client read error");
                    return;
                }
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return;
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            if let Err(e) = reader.read_exact(&mut msg_buf).await {
                warn!(?e, "client read error");
                return;
            }

            let request = serde_json::from_slice::<Request>(&msg_buf)
                .map_err(|e| format!("failed to parse request: {e}"));
            if requests.send(request).await.is_err() {
                return;
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        controller: &ControllerHandle,
    ) -> Response {
        if let Some(command) = request.command() {
            return match controller.send(command) {
                Ok(()) => {
                    info!(?command, "command received via IPC");
                    Response::Accepted
                }
                Err(e) => Response::Error {
                    code: "controller_closed".into(),
                    message: e.to_string(),
                },
            };
        }

        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                Response::Status(state.status.clone())
            }

            Request::Subscribe => Response::Subscribed,

            Request::StartListening | Request::StopListening | Request::ToggleListening => {
                Response::Error {
                    code: "internal".into(),
                    message: "command request without command".into(),
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; pends forever without a subscription
async fn next_event(
    subscription: &mut Option<broadcast::Receiver<ListeningEvent>>,
) -> Option<ListeningEvent> {
    let Some(rx) = subscription.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
