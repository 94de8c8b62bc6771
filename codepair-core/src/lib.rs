//! # codepair-core — editing surface and cursor mapping
//!
//! The surface is the local copy of the shared document. Remote updates
//! replace it wholesale, so the caret has to be carried across every
//! replacement as a flat character offset:
//!
//! ```text
//!   Surface ──capture──► CursorSnapshot { offset }
//!      │                         │
//!   replace_text(remote)         │
//!      ▼                         │
//!   Surface ◄──restore (clamped)─┘
//! ```

pub mod cursor;
pub mod surface;

pub use cursor::{capture_offset, restore_offset, CursorSnapshot, Restored};
pub use surface::{Position, Selection, Surface};
