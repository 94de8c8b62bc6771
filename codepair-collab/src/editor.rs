//! Editor session: one surface, one room channel, one suggestion slot.
//!
//! ```text
//!  front end ──type_text / handle_key──► CollabEditor ──► ConnectionManager
//!      ▲                                    │   ▲               │
//!      │                                    ▼   │               ▼
//!      └──────── EditorEvent ◄──── next_event() ◄── events / debounce / fetches
//! ```
//!
//! Every handler runs to completion on the caller's task. The only work that
//! leaves it is the suggestion fetch, which runs on a spawned task and comes
//! back through a channel.

use std::sync::Arc;

use codepair_core::{restore_offset, Surface};
use tokio::sync::mpsc;
use url::Url;

use crate::autocomplete::AutocompleteController;
use crate::config::ClientConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::error::{CollabError, Result};
use crate::links;
use crate::reconciler::{ApplyOutcome, SyncReconciler};
use crate::rooms::{HttpRoomDirectory, RoomDirectory};
use crate::suggest::{CompletionRequest, HttpSuggestionClient, SuggestionSource};

/// Keys with editor-level meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Escape,
    Tab,
    Enter,
}

/// What [`CollabEditor::next_event`] handled.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Connected { room_id: String, join_link: Url },
    /// An inbound frame was reconciled against the surface.
    Remote(ApplyOutcome),
    ConnectionError { room_id: String, reason: String },
    Disconnected { room_id: String },
    /// The debounce window elapsed and a fetch was started.
    SuggestionRequested,
    SuggestionShown(String),
    SuggestionHidden,
    SuggestionFailed(String),
}

pub struct CollabEditor {
    config: ClientConfig,
    surface: Surface,
    connection: ConnectionManager,
    reconciler: SyncReconciler,
    autocomplete: AutocompleteController,
    suggestions: Arc<dyn SuggestionSource>,
    rooms: Arc<dyn RoomDirectory>,
    responses_tx: mpsc::UnboundedSender<Result<Vec<String>>>,
    responses_rx: mpsc::UnboundedReceiver<Result<Vec<String>>>,
    status: String,
    join_link: Option<Url>,
}

impl CollabEditor {
    pub fn new(
        config: ClientConfig,
        suggestions: Arc<dyn SuggestionSource>,
        rooms: Arc<dyn RoomDirectory>,
    ) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            connection: ConnectionManager::new(config.page_url.clone(), config.send_capacity),
            reconciler: SyncReconciler::with_random_id(),
            autocomplete: AutocompleteController::new(config.debounce, config.language.clone()),
            surface: Surface::new(),
            suggestions,
            rooms,
            responses_tx,
            responses_rx,
            status: String::new(),
            join_link: None,
            config,
        }
    }

    /// Editor talking to the HTTP endpoints named by `config`.
    pub fn with_http(config: ClientConfig) -> Result<Self> {
        let suggestions = Arc::new(HttpSuggestionClient::from_config(&config)?);
        let rooms = Arc::new(HttpRoomDirectory::from_config(&config)?);
        Ok(Self::new(config, suggestions, rooms))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Direct access for edits; follow up with [`handle_input`](Self::handle_input).
    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn text(&self) -> String {
        self.surface.text()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Shareable link for the current room.
    pub fn join_link(&self) -> Option<&Url> {
        self.join_link.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.connection.room_id()
    }

    pub fn client_id(&self) -> &str {
        self.reconciler.client_id()
    }

    /// Visible suggestion text.
    pub fn suggestion(&self) -> Option<&str> {
        self.autocomplete.suggestion().shown()
    }

    /// Join the room named by the page URL, if any.
    ///
    /// Returns whether a join was attempted.
    pub async fn start(&mut self) -> Result<bool> {
        match links::room_from_url(&self.config.page_url) {
            Some(room_id) => {
                self.join_room(&room_id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switch the channel to `room_id`.
    pub async fn join_room(&mut self, room_id: &str) -> Result<()> {
        let room_id = room_id.trim();
        if room_id.is_empty() {
            self.status = "Please enter a room ID".to_string();
            return Err(CollabError::Config("room id is empty".to_string()));
        }

        self.status = format!("Connecting to room: {room_id}...");
        if let Err(e) = self.connection.connect(room_id).await {
            self.status = "Connection error".to_string();
            return Err(e);
        }
        Ok(())
    }

    /// Create a room through the directory and join it.
    pub async fn create_room(&mut self, name: Option<&str>) -> Result<String> {
        let room_id = match self.rooms.create_room(name).await {
            Ok(room_id) => room_id,
            Err(e) => {
                log::error!("Room creation failed: {e}");
                self.status = "Failed to create room".to_string();
                return Err(e);
            }
        };
        self.join_room(&room_id).await?;
        Ok(room_id)
    }

    pub async fn disconnect(&mut self) {
        self.connection.disconnect().await;
    }

    /// Local-edit path: run after any change to the surface.
    ///
    /// Broadcasts the full content and re-arms the suggestion timer. Returns
    /// whether the frame reached an open channel; local text is kept either way.
    pub fn handle_input(&mut self) -> bool {
        let message = self.reconciler.on_local_edit(&self.surface);
        let sent = self.connection.send(&message);
        self.autocomplete
            .on_local_edit(message.content, message.cursor_position.unwrap_or(0));
        sent
    }

    /// Insert `text` at the selection, then run the local-edit path.
    pub fn type_text(&mut self, text: &str) -> bool {
        self.surface.replace_selection(text);
        self.handle_input()
    }

    /// Move the caret. The suggestion no longer applies and is hidden.
    pub fn set_caret_offset(&mut self, offset: usize) {
        restore_offset(&mut self.surface, offset);
        self.autocomplete.dismiss();
    }

    /// Splice the visible suggestion in and broadcast the result.
    pub fn accept_suggestion(&mut self) -> bool {
        if !self.autocomplete.accept(&mut self.surface) {
            return false;
        }
        self.handle_input();
        true
    }

    pub fn dismiss_suggestion(&mut self) {
        self.autocomplete.dismiss();
    }

    /// Returns true when the key was consumed.
    pub fn handle_key(&mut self, key: EditorKey) -> bool {
        let visible = self.suggestion().is_some();
        match key {
            EditorKey::Escape => {
                self.dismiss_suggestion();
                visible
            }
            EditorKey::Tab | EditorKey::Enter if visible => self.accept_suggestion(),
            EditorKey::Tab | EditorKey::Enter => false,
        }
    }

    /// Wait for and handle the next connection event, debounce expiry or
    /// suggestion response. Cancel-safe.
    pub async fn next_event(&mut self) -> EditorEvent {
        tokio::select! {
            Some(event) = self.connection.next_event() => self.on_connection_event(event),
            request = self.autocomplete.next_request() => {
                self.spawn_fetch(request);
                EditorEvent::SuggestionRequested
            }
            Some(result) = self.responses_rx.recv() => self.on_suggestion_result(result),
            else => std::future::pending().await,
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) -> EditorEvent {
        match event {
            ConnectionEvent::Opened { room_id, join_link } => {
                self.status = format!("Connected to room: {room_id}");
                self.join_link = Some(join_link.clone());
                EditorEvent::Connected { room_id, join_link }
            }
            ConnectionEvent::Message(message) => {
                let outcome = self.reconciler.on_remote_message(&message, &mut self.surface);
                EditorEvent::Remote(outcome)
            }
            ConnectionEvent::Error { room_id, reason } => {
                self.status = "Connection error".to_string();
                EditorEvent::ConnectionError { room_id, reason }
            }
            ConnectionEvent::Closed { room_id } => {
                self.status = format!("Disconnected from room: {room_id}");
                EditorEvent::Disconnected { room_id }
            }
        }
    }

    fn on_suggestion_result(&mut self, result: Result<Vec<String>>) -> EditorEvent {
        match result {
            Ok(candidates) => {
                self.autocomplete.on_suggestion_response(candidates);
                match self.suggestion() {
                    Some(text) => EditorEvent::SuggestionShown(text.to_string()),
                    None => EditorEvent::SuggestionHidden,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                self.autocomplete.on_suggestion_error(&reason);
                EditorEvent::SuggestionFailed(reason)
            }
        }
    }

    fn spawn_fetch(&self, request: CompletionRequest) {
        let source = Arc::clone(&self.suggestions);
        let responses = self.responses_tx.clone();
        tokio::spawn(async move {
            let result = source.suggest(&request).await;
            let _ = responses.send(result);
        });
    }
}

impl std::fmt::Debug for CollabEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabEditor")
            .field("status", &self.status)
            .field("connection", &self.connection)
            .field("client_id", &self.client_id())
            .field("chars", &self.surface.char_len())
            .finish()
    }
}
