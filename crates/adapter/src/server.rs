//! TCP server for the adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::runtime::{ClientCommand, InboundCommand, OutboundMessage};
use crate::types::ItemKind;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_pending_commands: usize,
    /// Append every line sent or received to this file.
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_pending_commands: 16,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from `CUBE_BLAST_AI_*` environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("CUBE_BLAST_AI_HOST").unwrap_or(defaults.host);
        let port = env::var("CUBE_BLAST_AI_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let max_pending_commands = env::var("CUBE_BLAST_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        let log_path = env::var("CUBE_BLAST_AI_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            max_pending_commands,
            log_path,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}

/// Shared server state
pub struct ServerState {
    clients: RwLock<Vec<ClientHandle>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
        }
    }

    /// Check if the adapter is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("CUBE_BLAST_AI_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn is_handshaken(&self, client_id: usize) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    /// Record `seq` for the client. False when it does not increase.
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }

    async fn send_to(&self, client_id: usize, line: String) {
        let clients = self.clients.read().await;
        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
            let _ = c.tx.send(line);
        }
    }

    async fn broadcast(&self, line: String) {
        let clients = self.clients.read().await;
        for c in clients.iter().filter(|c| c.handshaken) {
            let _ = c.tx.send(line.clone());
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: usize,
    pub addr: SocketAddr,
    pub name: Option<String>,
    pub handshaken: bool,
    /// Declared in `hello`; reports goal collection animations.
    pub presentation: bool,
    pub last_seq: Option<u64>,
    /// Serialized lines for this client, without the newline.
    pub tx: mpsc::UnboundedSender<String>,
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let listener = TcpListener::bind(config.socket_addr()?).await?;
    let bound = listener.local_addr()?;
    log::info!("adapter listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new());
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match msg {
                    OutboundMessage::ToClient { client_id, line } => {
                        state.send_to(client_id, line).await
                    }
                    OutboundMessage::Broadcast { line } => state.broadcast(line).await,
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        log::info!("client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_client(socket, addr, client_id, state, command_tx, wire_log_tx).await
            {
                log::warn!("client {} error: {}", client_id, e);
            }
            log::info!("client {} disconnected", client_id);
        });
    }
}

/// Append raw lines to `path` until every sender is gone.
fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                log::warn!("cannot open wire log {}: {}", path, e);
                return;
            }
        };

        while let Some(mut bytes) = rx.recv().await {
            bytes.push(b'\n');
            if file.write_all(&bytes).await.is_err() {
                break;
            }
        }
        let _ = file.flush().await;
    });
    tx
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    {
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            addr,
            name: None,
            handshaken: false,
            presentation: false,
            last_seq: None,
            tx: tx.clone(),
        });
    }

    let wire_log_out = wire_log_tx.clone();
    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            let mut bytes = line.into_bytes();
            if let Some(log_tx) = wire_log_out.as_ref() {
                let _ = log_tx.send(bytes.clone());
            }
            bytes.push(b'\n');
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let reply = |line: Option<String>| {
        if let Some(line) = line {
            let _ = tx.send(line);
        }
    };

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("client {} read failed: {}", client_id, e);
                break;
            }
        }

        let raw_line = line.trim_end_matches(['\n', '\r']);
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(log_tx) = wire_log_tx.as_ref() {
            let _ = log_tx.send(raw_line.as_bytes().to_vec());
        }

        let msg = match parse_message(trimmed) {
            Ok(ParsedMessage::Client(msg)) => msg,
            Ok(ParsedMessage::Unknown(unknown)) => {
                reply(to_line(&create_error(
                    unknown.seq,
                    ErrorCode::InvalidCommand,
                    "unknown message type",
                )));
                continue;
            }
            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                reply(to_line(&create_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {}", e),
                )));
                continue;
            }
        };

        let seq = msg.seq();
        let handshaken = state.is_handshaken(client_id).await;
        let is_hello = matches!(msg, ClientMessage::Hello { .. });

        if !handshaken && !is_hello {
            reply(to_line(&create_error(
                seq,
                ErrorCode::HandshakeRequired,
                "send hello first",
            )));
            continue;
        }

        // Sequencing: enforce monotonic seq per sender.
        if !state.check_and_update_seq(client_id, seq).await {
            reply(to_line(&create_error(
                seq,
                ErrorCode::StaleSeq,
                "seq must be strictly increasing",
            )));
            continue;
        }

        let command = match map_message(msg) {
            Ok(MappedMessage::Hello { name, presentation }) => {
                {
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.name = name;
                        client.presentation = presentation;
                    }
                }
                if presentation {
                    log::info!("client {} attached as presentation", client_id);
                }
                reply(to_line(&create_welcome(seq, client_id)));
                ClientCommand::Handshake { presentation }
            }
            Ok(MappedMessage::Command(command)) => command,
            Err(message) => {
                reply(to_line(&create_error(seq, ErrorCode::InvalidCommand, &message)));
                continue;
            }
        };

        // Backpressure: bounded queue. The game loop acks after applying.
        match command_tx.try_send(InboundCommand {
            client_id,
            seq,
            command,
        }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                reply(to_line(&create_error(
                    seq,
                    ErrorCode::Backpressure,
                    "command queue is full",
                )));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => break,
        }
    }

    let detach = {
        let mut clients = state.clients.write().await;
        let was_presentation = clients
            .iter()
            .any(|c| c.id == client_id && c.presentation);
        clients.retain(|c| c.id != client_id);
        was_presentation && !clients.iter().any(|c| c.presentation)
    };
    if detach {
        // With no presentation left, waiting goal collections are applied.
        let inbound = InboundCommand {
            client_id,
            seq: 0,
            command: ClientCommand::PresentationDetached,
        };
        if command_tx.send(inbound).await.is_err() {
            log::debug!("game loop gone; presentation detach dropped");
        }
    }
    drop(tx);
    let _ = write_task.await;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MappedMessage {
    Hello {
        name: Option<String>,
        presentation: bool,
    },
    Command(ClientCommand),
}

fn map_message(msg: ClientMessage) -> Result<MappedMessage, String> {
    let command = match msg {
        ClientMessage::Hello {
            client,
            presentation,
            ..
        } => {
            return Ok(MappedMessage::Hello {
                name: client,
                presentation,
            })
        }
        ClientMessage::Tap { x, y, .. } => ClientCommand::Tap { x, y },
        ClientMessage::Restart { .. } => ClientCommand::Restart,
        ClientMessage::NextLevel { .. } => ClientCommand::NextLevel,
        ClientMessage::GoalAnimationComplete { kind, x, y, .. } => {
            let kind = ItemKind::from_token(&kind)
                .ok_or_else(|| format!("unknown item kind: {}", kind))?;
            ClientCommand::GoalAnimationComplete { kind, x, y }
        }
    };
    Ok(MappedMessage::Command(command))
}
