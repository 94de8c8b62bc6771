//! Local/remote content reconciliation.
//!
//! Last-writer-wins on whole content: a remote frame either replaces the
//! surface wholesale or is ignored. Frames are ignored when
//! - they carry our own client id (self-echo), or
//! - their content equals what we already hold (no caret churn).
//!
//! Applying a frame carries the caret across the replacement as a flat
//! character offset.

use codepair_core::{CursorSnapshot, Restored, Surface};
use uuid::Uuid;

use crate::protocol::SyncMessage;

/// What happened to an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Content replaced and caret restored
    Applied(Restored),
    /// Content already matched; surface untouched
    Unchanged,
    /// Our own edit bounced back; surface untouched
    SelfEcho,
}

impl ApplyOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Decides which frames go out and which inbound frames touch the surface.
#[derive(Debug, Clone)]
pub struct SyncReconciler {
    client_id: String,
    /// Content this client currently treats as authoritative
    last_known_content: String,
}

impl SyncReconciler {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            last_known_content: String::new(),
        }
    }

    /// Reconciler with a fresh random client id.
    pub fn with_random_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn last_known_content(&self) -> &str {
        &self.last_known_content
    }

    /// Record a local edit and build the frame announcing it.
    pub fn on_local_edit(&mut self, surface: &Surface) -> SyncMessage {
        self.last_known_content = surface.text();
        let cursor = CursorSnapshot::capture(surface);
        SyncMessage::update(
            self.last_known_content.clone(),
            cursor.offset,
            self.client_id.clone(),
        )
    }

    /// Apply an inbound frame to `surface` if it carries new foreign content.
    pub fn on_remote_message(
        &mut self,
        message: &SyncMessage,
        surface: &mut Surface,
    ) -> ApplyOutcome {
        if message.is_from(&self.client_id) {
            log::trace!("Ignoring self-echo {} frame", message.kind.as_str());
            return ApplyOutcome::SelfEcho;
        }

        if message.content == self.last_known_content {
            log::trace!("Ignoring {} frame: content unchanged", message.kind.as_str());
            return ApplyOutcome::Unchanged;
        }

        // A caret-less surface inserts at the end; the caret goes there too.
        let cursor = surface.selection().map(|_| CursorSnapshot::capture(surface));
        surface.replace_text(&message.content);
        let cursor = cursor.unwrap_or_else(|| CursorSnapshot::capture(surface));
        let restored = cursor.restore(surface);
        self.last_known_content.clone_from(&message.content);

        log::debug!(
            "Applied remote {} frame ({} chars, caret at {})",
            message.kind.as_str(),
            message.content.chars().count(),
            cursor.offset
        );
        ApplyOutcome::Applied(restored)
    }
}
