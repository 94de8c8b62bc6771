//! Editable text surface.
//!
//! A surface is an ordered list of text segments plus an optional selection.
//! Segments play the role of the text nodes inside a rich editable element:
//! the same visible text may be split across any number of them, so callers
//! must never rely on segment indices to identify a character. Use the
//! [`cursor`](crate::cursor) module to convert between positions and flat
//! character offsets.
//!
//! All offsets are counted in `char`s, never bytes.

/// A caret location inside a specific segment.
///
/// Ordering is document order: first by segment, then by offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Index into the segment list
    pub segment: usize,
    /// Character offset within the segment
    pub offset: usize,
}

impl Position {
    pub const START: Position = Position { segment: 0, offset: 0 };

    pub fn new(segment: usize, offset: usize) -> Self {
        Self { segment, offset }
    }
}

/// Anchor/focus pair. A collapsed selection is a plain caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    /// A collapsed selection at `pos`.
    pub fn caret(pos: Position) -> Self {
        Self { anchor: pos, focus: pos }
    }

    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Earlier boundary in document order.
    pub fn start(&self) -> Position {
        self.anchor.min(self.focus)
    }

    /// Later boundary in document order.
    pub fn end(&self) -> Position {
        self.anchor.max(self.focus)
    }
}

/// The editing surface.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    segments: Vec<String>,
    selection: Option<Selection>,
    /// Bumped on every content write.
    revision: u64,
}

impl Surface {
    /// Create an empty surface with no segments and no selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface holding `text` in a single segment.
    pub fn from_text(text: &str) -> Self {
        Self::from_segments([text])
    }

    /// Create a surface from pre-split segments. Empty segments are kept.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let segments = if segments.len() == 1 && segments[0].is_empty() {
            Vec::new()
        } else {
            segments
        };
        Self {
            segments,
            selection: None,
            revision: 0,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Flattened visible text in document order.
    pub fn text(&self) -> String {
        self.segments.concat()
    }

    /// Total length of the visible text in characters.
    pub fn char_len(&self) -> usize {
        self.segments.iter().map(|s| s.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(String::is_empty)
    }

    /// Number of content writes applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Replace the selection. Positions are clamped into the current segments.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection.map(|sel| Selection {
            anchor: self.clamp(sel.anchor),
            focus: self.clamp(sel.focus),
        });
    }

    /// Collapse the selection to a caret at `pos`.
    pub fn set_caret(&mut self, pos: Position) {
        self.set_selection(Some(Selection::caret(pos)));
    }

    /// Select from `anchor` to `focus`.
    pub fn select(&mut self, anchor: Position, focus: Position) {
        self.set_selection(Some(Selection::new(anchor, focus)));
    }

    /// Replace the whole content.
    ///
    /// The new text lands in a single segment and the selection is dropped,
    /// exactly like assigning the text of an editable element.
    pub fn replace_text(&mut self, content: &str) {
        self.segments.clear();
        if !content.is_empty() {
            self.segments.push(content.to_string());
        }
        self.selection = None;
        self.revision += 1;
    }

    /// Delete the selected range, insert `text` in its place and collapse the
    /// caret just after the inserted text.
    ///
    /// Without a selection the text is inserted at the end of the content.
    /// Returns the new caret position.
    pub fn replace_selection(&mut self, text: &str) -> Position {
        let (start, end) = match self.selection {
            Some(sel) => (sel.start(), sel.end()),
            None => {
                let end = self.end_position();
                (end, end)
            }
        };

        if self.segments.is_empty() {
            self.segments.push(String::new());
        }

        let head_seg = &self.segments[start.segment];
        let tail_seg = &self.segments[end.segment];
        let mut merged = String::with_capacity(head_seg.len() + text.len() + tail_seg.len());
        merged.push_str(&head_seg[..byte_index(head_seg, start.offset)]);
        merged.push_str(text);
        merged.push_str(&tail_seg[byte_index(tail_seg, end.offset)..]);

        self.segments[start.segment] = merged;
        if end.segment > start.segment {
            self.segments.drain(start.segment + 1..=end.segment);
        }

        let caret = Position::new(start.segment, start.offset + text.chars().count());
        self.selection = Some(Selection::caret(caret));
        self.revision += 1;
        caret
    }

    /// Position just after the last character.
    pub fn end_position(&self) -> Position {
        match self.segments.len() {
            0 => Position::START,
            n => Position::new(n - 1, self.segments[n - 1].chars().count()),
        }
    }

    fn clamp(&self, pos: Position) -> Position {
        if self.segments.is_empty() {
            return Position::START;
        }
        if pos.segment >= self.segments.len() {
            return self.end_position();
        }
        let len = self.segments[pos.segment].chars().count();
        Position::new(pos.segment, pos.offset.min(len))
    }
}

/// Byte index of the `char_idx`-th character, or the string length past the end.
fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map_or(s.len(), |(byte, _)| byte)
}
