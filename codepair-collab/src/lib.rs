//! # codepair-collab — room synchronization and completion client
//!
//! Keeps one editing surface consistent with everyone else in a named room.
//! Last writer wins on whole content; there is no merge.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────┐  full-content JSON  ┌──────────────┐
//!  │ CollabEditor │ ◄─────────────────► │ room relay   │
//!  │ (per user)   │     /ws/{room}      │ (external)   │
//!  └──┬────────┬──┘                     └──────────────┘
//!     │        │
//!     ▼        ▼
//!  ┌────────────────┐   ┌────────────────────────┐   POST /autocomplete
//!  │ SyncReconciler │   │ AutocompleteController │ ─────────────────────►
//!  │ + Surface      │   │ (debounced)            │
//!  └────────────────┘   └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — JSON frames (`sync` / `update`)
//! - [`connection`] — one WebSocket channel per room, replaced on switch
//! - [`reconciler`] — apply-or-ignore policy for inbound frames
//! - [`autocomplete`] — debounce timer and the single suggestion slot
//! - [`suggest`] / [`rooms`] — HTTP collaborators
//! - [`editor`] — the session wiring it all into one event loop

pub mod autocomplete;
pub mod config;
pub mod connection;
pub mod editor;
pub mod error;
pub mod links;
pub mod protocol;
pub mod reconciler;
pub mod rooms;
pub mod suggest;

// Re-exports for convenience
pub use autocomplete::{AutocompleteController, Debounce, SuggestionState};
pub use config::{ClientConfig, DEFAULT_DEBOUNCE};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use editor::{CollabEditor, EditorEvent, EditorKey};
pub use error::{CollabError, Result};
pub use links::{channel_url, join_link, room_from_url};
pub use protocol::{MessageKind, ProtocolError, SyncMessage};
pub use reconciler::{ApplyOutcome, SyncReconciler};
pub use rooms::{HttpRoomDirectory, RoomDirectory};
pub use suggest::{CompletionRequest, HttpSuggestionClient, SuggestionSource};
