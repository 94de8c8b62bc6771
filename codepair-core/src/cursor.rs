//! Cursor mapping between surface positions and flat character offsets.
//!
//! ```text
//!  segments:  [ "def " ][ "f" ][ "(x):" ]
//!  offsets:    0 1 2 3  4      5 6 7 8 9
//!                         ▲
//!                 Position { segment: 1, offset: 0 } ⇄ 4
//! ```
//!
//! An offset is the number of visible characters before the caret. It is
//! computed by walking segments in document order, so it survives a
//! re-render that splits the same text into a different segment structure.
//!
//! Restoring an offset beyond the end of the content clamps to the end of the
//! last segment; mapping never fails.

use crate::surface::{Position, Selection, Surface};

/// Caret location as a flat character offset.
///
/// Only meaningful relative to the content it was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CursorSnapshot {
    pub offset: usize,
}

/// Result of restoring a snapshot onto a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restored {
    pub position: Position,
    /// Whether the requested offset lay past the end of the content.
    pub clamped: bool,
}

impl CursorSnapshot {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Capture the caret offset of `surface`.
    ///
    /// Uses the later selection boundary. A surface without a selection
    /// reports the end of its content, where
    /// [`Surface::replace_selection`] would insert.
    pub fn capture(surface: &Surface) -> Self {
        match surface.selection() {
            Some(sel) => Self::new(offset_of(surface, sel.end())),
            None => Self::new(surface.char_len()),
        }
    }

    /// Place a collapsed caret at this offset.
    pub fn restore(self, surface: &mut Surface) -> Restored {
        let (position, clamped) = position_at(surface, self.offset);
        if clamped {
            log::debug!(
                "Cursor offset {} clamped to content length {}",
                self.offset,
                surface.char_len()
            );
        }
        surface.set_selection(Some(Selection::caret(position)));
        Restored { position, clamped }
    }
}

/// Flat offset of `pos`. Out-of-range components are clamped.
pub fn offset_of(surface: &Surface, pos: Position) -> usize {
    let segments = surface.segments();
    let preceding: usize = segments
        .iter()
        .take(pos.segment)
        .map(|s| s.chars().count())
        .sum();
    let within = segments
        .get(pos.segment)
        .map_or(0, |s| pos.offset.min(s.chars().count()));
    preceding + within
}

/// Position for a flat offset, and whether the offset had to be clamped.
///
/// An offset that falls exactly on a segment boundary resolves to the end of
/// the earlier segment.
pub fn position_at(surface: &Surface, offset: usize) -> (Position, bool) {
    let mut consumed = 0;
    for (index, segment) in surface.segments().iter().enumerate() {
        let len = segment.chars().count();
        if consumed + len >= offset {
            return (Position::new(index, offset - consumed), false);
        }
        consumed += len;
    }
    (surface.end_position(), offset > consumed)
}

/// Capture the caret offset of `surface`.
pub fn capture_offset(surface: &Surface) -> usize {
    CursorSnapshot::capture(surface).offset
}

/// Restore a caret at `offset`, clamping to the end of the content.
pub fn restore_offset(surface: &mut Surface, offset: usize) -> Restored {
    CursorSnapshot::new(offset).restore(surface)
}
