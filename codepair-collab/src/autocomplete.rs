//! Debounced completion overlay.
//!
//! ```text
//!  edit ──► dismiss ──► arm(600ms) ─┐   (re-armed by every edit)
//!                                   ▼
//!                      fired ──► CompletionRequest ──► service
//!                                                         │
//!           accept ◄── visible ◄── first candidate ◄──────┘
//! ```
//!
//! Showing a suggestion never touches the surface. Only `accept` writes, and
//! its caller feeds the result back through the local-edit path.

use std::time::Duration;

use codepair_core::Surface;
use tokio::time::{sleep_until, Instant};

use crate::suggest::CompletionRequest;

/// Single-slot timer: arming replaces whatever was armed before.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Arm with `value`, superseding any pending value.
    pub fn arm(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.window, value));
    }

    /// Disarm, returning the superseded value if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Resolve with the pending value once its quiet period elapses.
    ///
    /// Never resolves while disarmed. Cancel-safe: dropping the future
    /// before it resolves leaves the timer armed.
    pub async fn fired(&mut self) -> T {
        loop {
            match self.deadline() {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
            if let Some((_, value)) = self.pending.take() {
                return value;
            }
        }
    }
}

/// The single suggestion slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionState {
    pub text: Option<String>,
    pub visible: bool,
}

impl SuggestionState {
    /// Text of the visible suggestion.
    pub fn shown(&self) -> Option<&str> {
        if self.visible {
            self.text.as_deref()
        } else {
            None
        }
    }

    fn show(&mut self, text: String) {
        self.text = Some(text);
        self.visible = true;
    }

    fn hide(&mut self) {
        self.text = None;
        self.visible = false;
    }
}

#[derive(Debug)]
pub struct AutocompleteController {
    debounce: Debounce<CompletionRequest>,
    language: String,
    suggestion: SuggestionState,
}

impl AutocompleteController {
    pub fn new(window: Duration, language: impl Into<String>) -> Self {
        Self {
            debounce: Debounce::new(window),
            language: language.into(),
            suggestion: SuggestionState::default(),
        }
    }

    pub fn suggestion(&self) -> &SuggestionState {
        &self.suggestion
    }

    pub fn is_request_pending(&self) -> bool {
        self.debounce.is_armed()
    }

    /// Drop the current suggestion and (re)arm the request timer.
    pub fn on_local_edit(&mut self, content: impl Into<String>, cursor_position: usize) {
        self.suggestion.hide();
        self.debounce.arm(CompletionRequest {
            code: content.into(),
            cursor_position,
            language: self.language.clone(),
        });
    }

    /// Wait for the debounce window to elapse and yield the request to send.
    ///
    /// Cancel-safe; see [`Debounce::fired`].
    pub async fn next_request(&mut self) -> CompletionRequest {
        let request = self.debounce.fired().await;
        self.suggestion.hide();
        log::debug!(
            "Requesting completion at offset {} ({} chars)",
            request.cursor_position,
            request.code.chars().count()
        );
        request
    }

    /// Show the first candidate, or nothing.
    ///
    /// Responses are taken in arrival order; a late answer to an older
    /// request still replaces what is shown.
    pub fn on_suggestion_response(&mut self, candidates: Vec<String>) {
        match candidates.into_iter().next() {
            Some(text) if !text.is_empty() => self.suggestion.show(text),
            _ => self.suggestion.hide(),
        }
    }

    pub fn on_suggestion_error(&mut self, reason: &str) {
        log::warn!("Suggestion request failed: {reason}");
        self.suggestion.hide();
    }

    /// Splice the visible suggestion into `surface` at its selection.
    ///
    /// Returns false (and leaves the surface alone) when nothing is visible.
    pub fn accept(&mut self, surface: &mut Surface) -> bool {
        let Some(text) = self.suggestion.shown().map(str::to_owned) else {
            return false;
        };
        surface.replace_selection(&text);
        self.suggestion.hide();
        true
    }

    /// Hide the suggestion without touching content.
    pub fn dismiss(&mut self) {
        self.suggestion.hide();
    }
}
