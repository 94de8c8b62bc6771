//! Local stand-ins for the external collaborators: a WebSocket room relay
//! and a one-shot JSON HTTP responder.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Find a free port for testing.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Frame fanned out to a room: (sender connection id, raw text).
type Fanout = (u64, String);

struct Room {
    content: String,
    version: u64,
    peers: usize,
    sender: broadcast::Sender<Fanout>,
    /// Kick signal; `true` drops the TCP stream without a close frame
    control: broadcast::Sender<bool>,
    /// Every text frame received from clients, in arrival order
    received: Vec<String>,
}

impl Room {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        let (control, _) = broadcast::channel(4);
        Self {
            content: String::new(),
            version: 0,
            peers: 0,
            sender,
            control,
            received: Vec::new(),
        }
    }
}

type Rooms = Arc<RwLock<HashMap<String, Room>>>;

/// Relay server: `/ws/{room}` channels, full-state push on join, updates
/// fanned out to the other peers (or to everyone, with `echo`).
pub struct Relay {
    pub port: u16,
    rooms: Rooms,
}

impl Relay {
    pub async fn start(echo: bool) -> Relay {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let rooms: Rooms = Arc::new(RwLock::new(HashMap::new()));
        let next_id = Arc::new(AtomicU64::new(1));

        let accept_rooms = rooms.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let rooms = accept_rooms.clone();
                let id = next_id.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    if let Err(e) = handle_peer(stream, id, rooms, echo).await {
                        log::debug!("Relay peer {id} ended: {e}");
                    }
                });
            }
        });

        Relay { port, rooms }
    }

    /// Page URL clients are "served" from.
    pub fn page_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    pub async fn seed(&self, room: &str, content: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room.to_string()).or_insert_with(Room::new).content = content.to_string();
    }

    pub async fn content(&self, room: &str) -> Option<String> {
        self.rooms.read().await.get(room).map(|r| r.content.clone())
    }

    pub async fn peer_count(&self, room: &str) -> usize {
        self.rooms.read().await.get(room).map_or(0, |r| r.peers)
    }

    pub async fn received(&self, room: &str) -> Vec<String> {
        self.rooms
            .read()
            .await
            .get(room)
            .map(|r| r.received.clone())
            .unwrap_or_default()
    }

    /// Push a raw text frame to every peer in `room`.
    pub async fn inject(&self, room: &str, raw: &str) {
        if let Some(r) = self.rooms.read().await.get(room) {
            let _ = r.sender.send((0, raw.to_string()));
        }
    }

    /// End every channel in `room`: a close frame, or with `abrupt` a dropped
    /// stream and no closing handshake.
    pub async fn kick(&self, room: &str, abrupt: bool) {
        if let Some(r) = self.rooms.read().await.get(room) {
            let _ = r.control.send(abrupt);
        }
    }

    /// Wait until `room` has exactly `n` peers.
    pub async fn wait_for_peers(&self, room: &str, n: usize) {
        let waited = timeout(Duration::from_secs(2), async {
            while self.peer_count(room).await != n {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "room {room} never reached {n} peers");
    }

    /// Wait until `room` has received at least `n` frames.
    pub async fn wait_for_frames(&self, room: &str, n: usize) -> Vec<String> {
        let waited = timeout(Duration::from_secs(2), async {
            loop {
                let frames = self.received(room).await;
                if frames.len() >= n {
                    return frames;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        waited.unwrap_or_else(|_| panic!("room {room} never received {n} frames"))
    }
}

async fn handle_peer(
    stream: TcpStream,
    id: u64,
    rooms: Rooms,
    echo: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut path = String::new();
    let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        path = req.uri().path().to_string();
        Ok(resp)
    })
    .await?;
    let room_id = path.strip_prefix("/ws/").unwrap_or_default().to_string();
    let (mut sink, mut stream) = ws.split();

    let (mut fanout, mut control, hello) = {
        let mut rooms_w = rooms.write().await;
        let room = rooms_w.entry(room_id.clone()).or_insert_with(Room::new);
        room.peers += 1;
        let hello = serde_json::json!({
            "type": "code_sync",
            "content": room.content,
            "version": room.version,
        });
        (room.sender.subscribe(), room.control.subscribe(), hello.to_string())
    };
    sink.send(Message::Text(hello.into())).await?;

    let result = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str().to_string();
                    let mut rooms_w = rooms.write().await;
                    let Some(room) = rooms_w.get_mut(&room_id) else { break Ok(()) };
                    room.received.push(text.clone());
                    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
                    if let Some(content) = parsed.get("content").and_then(|c| c.as_str()) {
                        room.content = content.to_string();
                        room.version += 1;
                    }
                    let _ = room.sender.send((id, text));
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
            fanned = fanout.recv() => match fanned {
                Ok((from, text)) if from != id || echo => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        break Err(e.into());
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break Ok(()),
            },
            kicked = control.recv() => match kicked {
                Ok(true) => break Ok(()),
                Ok(false) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break Ok(());
                }
                Err(_) => {}
            },
        }
    };

    if let Some(room) = rooms.write().await.get_mut(&room_id) {
        room.peers -= 1;
    }
    result
}

/// A captured HTTP request body.
pub type Captured = Arc<RwLock<Vec<String>>>;

/// Minimal HTTP responder: answers every request with `status` and the
/// JSON `body`, recording request bodies.
pub async fn json_stub(status: u16, body: &'static str) -> (url::Url, Captured) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let captured: Captured = Arc::new(RwLock::new(Vec::new()));

    let log = captured.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let request_body = read_request_body(&mut stream).await;
            log.write().await.push(request_body);
            let response = format!(
                "HTTP/1.1 {status} Stub\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    let url = url::Url::parse(&format!("http://127.0.0.1:{port}/endpoint")).unwrap();
    (url, captured)
}

async fn read_request_body(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = stream.read(&mut chunk).await else {
            return String::new();
        };
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body_start = header_end + 4;
        if buf.len() >= body_start + content_length {
            return String::from_utf8_lossy(&buf[body_start..body_start + content_length])
                .into_owned();
        }
    }
}
