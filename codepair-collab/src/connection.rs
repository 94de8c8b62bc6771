//! Room channel lifecycle.
//!
//! Provides:
//! - One live WebSocket channel at a time, addressed by room id
//! - Connecting → Open → Closed states, with Error always followed by Closed
//! - Drop-on-floor sends while the channel is not Open (no queue, no retry)
//! - Generation stamping so nothing from a replaced channel leaks through
//!
//! ```text
//!   connect(B) ──► close A (close frame, reader aborted)
//!        │
//!        ▼
//!   Connecting ──handshake ok──► Open ──close / error──► Closed
//!        │                                               ▲
//!        └───────────── handshake failed (Error) ────────┘
//! ```
//!
//! Reconnection only happens on an explicit `connect`.

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Result;
use crate::links;
use crate::protocol::{ProtocolError, SyncMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    /// Transient; the next observable state is always `Closed`
    Error,
}

/// Events surfaced to the owner of the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Handshake completed; `join_link` is the shareable page address.
    Opened { room_id: String, join_link: Url },
    /// A well-formed frame arrived.
    Message(SyncMessage),
    /// The transport failed. Always followed by `Closed`.
    Error { room_id: String, reason: String },
    /// The channel is gone. No automatic reconnect follows.
    Closed { room_id: String },
}

/// Event tagged with the session that produced it.
#[derive(Debug)]
struct Envelope {
    generation: u64,
    event: ConnectionEvent,
}

/// The live channel for one room.
struct RoomSession {
    room_id: String,
    /// Outbound frames, drained by the writer task
    outgoing: mpsc::Sender<Message>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Owns the room channel. Nothing else writes to or closes it.
pub struct ConnectionManager {
    page_url: Url,
    state: ConnectionState,
    session: Option<RoomSession>,
    /// Generation of the current (or last attempted) session
    generation: u64,
    send_capacity: usize,
    event_tx: mpsc::UnboundedSender<Envelope>,
    event_rx: mpsc::UnboundedReceiver<Envelope>,
}

impl ConnectionManager {
    /// Create a manager for rooms hosted alongside `page_url`.
    pub fn new(page_url: Url, send_capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            page_url,
            state: ConnectionState::Closed,
            session: None,
            generation: 0,
            send_capacity: send_capacity.max(1),
            event_tx,
            event_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Room of the live channel, if any.
    pub fn room_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.room_id.as_str())
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Open a channel to `room_id`, closing the current one first.
    ///
    /// On success an `Opened` event carrying the join link is queued. On
    /// failure `Error` and `Closed` events are queued and the error returned.
    pub async fn connect(&mut self, room_id: &str) -> Result<()> {
        self.close_session().await;

        self.generation += 1;
        let generation = self.generation;
        self.state = ConnectionState::Connecting;

        let url = match links::channel_url(&self.page_url, room_id) {
            Ok(url) => url,
            Err(e) => {
                self.fail(generation, room_id, e.to_string());
                return Err(e);
            }
        };

        log::info!("Connecting to room {room_id} at {url}");
        let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                log::warn!("Failed to open channel for room {room_id}: {e}");
                self.fail(generation, room_id, e.to_string());
                return Err(e.into());
            }
        };

        let (mut sink, stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(self.send_capacity);

        // Writer task: forward outgoing frames to the socket
        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if let Err(e) = sink.send(frame).await {
                    log::debug!("Channel write failed: {e}");
                    return;
                }
                if closing {
                    return;
                }
            }
            let _ = sink.close().await;
        });

        let join_link = links::join_link(&self.page_url, room_id);
        self.emit(
            generation,
            ConnectionEvent::Opened {
                room_id: room_id.to_string(),
                join_link,
            },
        );

        let reader = tokio::spawn(read_frames(
            stream,
            generation,
            room_id.to_string(),
            self.event_tx.clone(),
        ));

        self.session = Some(RoomSession {
            room_id: room_id.to_string(),
            outgoing: out_tx,
            reader,
            writer: Some(writer),
        });
        self.state = ConnectionState::Open;
        log::info!("Channel open for room {room_id}");
        Ok(())
    }

    /// Send a frame if the channel is Open; otherwise drop it.
    ///
    /// Returns whether the frame was handed to the channel.
    pub fn send(&self, message: &SyncMessage) -> bool {
        let session = match (&self.session, self.state) {
            (Some(session), ConnectionState::Open) => session,
            _ => {
                log::debug!(
                    "Dropping {} frame: channel is {:?}",
                    message.kind.as_str(),
                    self.state
                );
                return false;
            }
        };

        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Dropping outbound frame: {e}");
                return false;
            }
        };

        match session.outgoing.try_send(Message::Text(text.into())) {
            Ok(()) => {
                log::trace!("Queued {} frame for room {}", message.kind.as_str(), session.room_id);
                true
            }
            Err(e) => {
                log::warn!("Dropping outbound frame for room {}: {e}", session.room_id);
                false
            }
        }
    }

    /// Close the channel and report `Closed`.
    pub async fn disconnect(&mut self) {
        let Some(room_id) = self.room_id().map(str::to_string) else {
            return;
        };
        self.close_session().await;
        self.generation += 1;
        self.emit(self.generation, ConnectionEvent::Closed { room_id });
    }

    /// Next event from the current session.
    ///
    /// Events from replaced sessions are discarded. Cancel-safe; pending
    /// while idle.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        loop {
            let envelope = self.event_rx.recv().await?;
            if envelope.generation != self.generation {
                log::trace!("Discarding event from replaced channel: {:?}", envelope.event);
                continue;
            }

            match &envelope.event {
                ConnectionEvent::Error { room_id, reason } => {
                    log::warn!("Channel error in room {room_id}: {reason}");
                    self.state = ConnectionState::Error;
                }
                ConnectionEvent::Closed { room_id } => {
                    log::info!("Channel closed for room {room_id}");
                    self.session = None;
                    self.state = ConnectionState::Closed;
                }
                _ => {}
            }
            return Some(envelope.event);
        }
    }

    fn emit(&self, generation: u64, event: ConnectionEvent) {
        // Receiver is owned by self.
        let _ = self.event_tx.send(Envelope { generation, event });
    }

    fn fail(&mut self, generation: u64, room_id: &str, reason: String) {
        self.state = ConnectionState::Error;
        self.emit(
            generation,
            ConnectionEvent::Error {
                room_id: room_id.to_string(),
                reason,
            },
        );
        self.emit(
            generation,
            ConnectionEvent::Closed {
                room_id: room_id.to_string(),
            },
        );
        self.state = ConnectionState::Closed;
    }

    /// Close the live channel, if any, without emitting events.
    async fn close_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        log::info!("Closing channel for room {}", session.room_id);

        session.reader.abort();
        let _ = session.outgoing.try_send(Message::Close(None));
        let writer = session.writer.take();
        drop(session);
        if let Some(writer) = writer {
            let _ = writer.await;
        }
        self.state = ConnectionState::Closed;
    }
}

/// Reader task: decode frames and forward them tagged with `generation`.
async fn read_frames(
    mut stream: SplitStream<WsStream>,
    generation: u64,
    room_id: String,
    events: mpsc::UnboundedSender<Envelope>,
) {
    let mut failure = None;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match SyncMessage::decode(text.as_str()) {
                Ok(message) => {
                    log::trace!("Received {} frame in room {room_id}", message.kind.as_str());
                    let envelope = Envelope {
                        generation,
                        event: ConnectionEvent::Message(message),
                    };
                    if events.send(envelope).is_err() {
                        return;
                    }
                }
                Err(e) => log::warn!("Dropping frame in room {room_id}: {e}"),
            },
            Ok(Message::Binary(_)) => {
                log::warn!("Dropping frame in room {room_id}: {}", ProtocolError::BinaryFrame);
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        }
    }

    if let Some(reason) = failure {
        let _ = events.send(Envelope {
            generation,
            event: ConnectionEvent::Error {
                room_id: room_id.clone(),
                reason,
            },
        });
    }
    let _ = events.send(Envelope {
        generation,
        event: ConnectionEvent::Closed { room_id },
    });
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("page_url", &self.page_url.as_str())
            .field("state", &self.state)
            .field("room_id", &self.room_id())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollabError;
    use std::time::Duration;
    use tokio::time::timeout;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Url::parse("http://127.0.0.1:1/").unwrap(), 8)
    }

    #[test]
    fn test_initial_state() {
        let manager = manager();
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(!manager.is_open());
        assert!(manager.room_id().is_none());
    }

    #[test]
    fn test_send_while_closed_is_noop() {
        let manager = manager();
        let sent = manager.send(&SyncMessage::update("x", 1, "me"));
        assert!(!sent);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_failed_connect_reports_error_then_closed() {
        let mut manager = manager();
        let result = manager.connect("room-1").await;

        assert!(matches!(result, Err(CollabError::Connection(_))));
        assert_eq!(manager.state(), ConnectionState::Closed);

        let first = timeout(Duration::from_secs(1), manager.next_event()).await.unwrap();
        assert!(matches!(
            first,
            Some(ConnectionEvent::Error { ref room_id, .. }) if room_id == "room-1"
        ));
        let second = timeout(Duration::from_secs(1), manager.next_event()).await.unwrap();
        assert_eq!(
            second,
            Some(ConnectionEvent::Closed {
                room_id: "room-1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_events_from_previous_attempt_are_discarded() {
        let mut manager = manager();
        let _ = manager.connect("old").await;
        let _ = manager.connect("new").await;

        let first = timeout(Duration::from_secs(1), manager.next_event()).await.unwrap();
        assert!(matches!(
            first,
            Some(ConnectionEvent::Error { ref room_id, .. }) if room_id == "new"
        ));
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_silent() {
        let mut manager = manager();
        manager.disconnect().await;
        assert!(timeout(Duration::from_millis(50), manager.next_event()).await.is_err());
    }

    #[tokio::test]
    async fn test_unusable_page_url_fails_fast() {
        let mut manager = ConnectionManager::new(Url::parse("file:///tmp/pad").unwrap(), 8);
        assert!(matches!(manager.connect("r").await, Err(CollabError::Config(_))));
        assert_eq!(manager.state(), ConnectionState::Closed);
    }
}
