use std::io::Cursor;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::connection::Connection;
use super::directory::RoomDirectory;
use super::router;

pub const DEFAULT_SIGNALING_PORT: u16 = 8080;

/// Body returned to plain HTTP requests on the signaling port
pub const HTTP_ACK_BODY: &str = "WebRTC Signaling Server\n";

/// Largest request head accepted before giving up on the connection
const MAX_HEAD_SIZE: usize = 16 * 1024;
const MAX_HEADERS: usize = 64;

#[derive(Debug, Error)]
pub(crate) enum RequestHeadError {
    #[error("connection closed before the request head was complete")]
    Closed,

    #[error("request head exceeds {} bytes", MAX_HEAD_SIZE)]
    TooLarge,

    #[error("malformed request head: {0}")]
    Parse(#[from] httparse::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the client asked for in its request head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    WebSocket,
    Plain,
}

pub struct SignalingServer {
    listener: TcpListener,
    directory: RoomDirectory,
}

impl SignalingServer {
    /// create and bind the server to the address
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signaling server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            directory: RoomDirectory::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle onto the shared room table
    pub fn directory(&self) -> RoomDirectory {
        self.directory.clone()
    }

    /// Accept connections forever. Failures stay inside their connection.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
            };
            let directory = self.directory.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, directory).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    directory: RoomDirectory,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (head, kind) = read_request_head(&mut stream).await?;
    if kind == RequestKind::Plain {
        return answer_plain_http(stream, addr).await;
    }

    // replay the consumed head into the handshake
    let (reader, writer) = stream.into_split();
    let io = tokio::io::join(Cursor::new(head).chain(reader), writer);
    let ws_stream = tokio_tungstenite::accept_async(io).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (mut conn, mut rx) = Connection::new(addr, directory);
    info!("WebSocket connection {} from {}", conn.id(), addr);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into_inner())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("WebSocket error on {}: {}", conn.id(), e);
                break;
            }
        };

        let text = match msg {
            Message::Text(ref text) => text.as_str(),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Ignoring non-UTF-8 binary frame from {}", conn.id());
                    continue;
                }
            },
            Message::Close(_) => {
                info!("Close received from {}", conn.id());
                break;
            }
            _ => continue,
        };

        match router::dispatch(&mut conn, text) {
            Ok(routed) => debug!("{}: {:?}", conn.id(), routed),
            Err(e) => warn!("Ignoring message from {}: {}", conn.id(), e),
        }
    }

    conn.cleanup();
    send_task.abort();
    info!("WebSocket disconnected: {} ({})", conn.id(), addr);

    Ok(())
}

/// Read until the HTTP request head is complete. Returns the bytes read so
/// far, which may run past the head, and what kind of request it is.
async fn read_request_head(
    stream: &mut TcpStream,
) -> Result<(Vec<u8>, RequestKind), RequestHeadError> {
    let mut buf = Vec::with_capacity(1024);
    loop {
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(RequestHeadError::Closed);
        }
        if let Some(kind) = parse_request_head(&buf)? {
            return Ok((buf, kind));
        }
        if buf.len() >= MAX_HEAD_SIZE {
            return Err(RequestHeadError::TooLarge);
        }
    }
}

/// Classify a request head, or `None` if more bytes are needed
pub(crate) fn parse_request_head(buf: &[u8]) -> Result<Option<RequestKind>, httparse::Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    if req.parse(buf)?.is_partial() {
        return Ok(None);
    }

    let upgrade = req.headers.iter().any(|h| {
        h.name.eq_ignore_ascii_case("upgrade")
            && std::str::from_utf8(h.value).is_ok_and(|value| {
                value
                    .split(',')
                    .any(|proto| proto.trim().eq_ignore_ascii_case("websocket"))
            })
    });

    Ok(Some(if upgrade {
        RequestKind::WebSocket
    } else {
        RequestKind::Plain
    }))
}

async fn answer_plain_http(
    mut stream: TcpStream,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        HTTP_ACK_BODY.len(),
        HTTP_ACK_BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;

    debug!("Answered plain HTTP request from {}", addr);
    Ok(())
}
