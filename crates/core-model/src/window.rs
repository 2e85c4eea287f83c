//! A window's on-screen geometry plus the saved view (§4.D / `Face` in the
//! glossary) of whichever buffer it's currently displaying.

use bitflags::bitflags;
use core_text::{LineId, Point};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        /// Next reframe must honor `reframe_row` even if point never left
        /// the window.
        const FORCE    = 1 << 0;
        /// Mode line needs redrawing on the next display pass.
        const MODELINE = 1 << 1;
        /// Text contents changed; the differ must re-walk this window.
        const TEXT     = 1 << 2;
    }
}

/// The saved view of a buffer: top line, point, and horizontal scroll.
/// Restored when the buffer is re-displayed in a window (e.g. after
/// `BufferManager::widen`, or when switching which buffer a window shows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub point: Point,
    pub top_line: LineId,
    pub first_column: usize,
}

impl Face {
    pub fn new(point: Point, top_line: LineId) -> Self {
        Self { point, top_line, first_column: 0 }
    }
}

/// One rectangular area of a screen. Windows on a screen stack vertically;
/// `top`/`rows` partition the screen minus the message-line row.
#[derive(Debug, Clone)]
pub struct Window {
    pub top: u16,
    pub rows: u16,
    pub buffer_index: usize,
    pub face: Face,
    pub flags: WindowFlags,
    /// Target row for the point-line when `FORCE` is set. Negative counts
    /// from the bottom of the window.
    pub reframe_row: i32,
}

impl Window {
    pub fn new(top: u16, rows: u16, buffer_index: usize, face: Face) -> Self {
        Self {
            top,
            rows,
            buffer_index,
            face,
            flags: WindowFlags::TEXT | WindowFlags::MODELINE,
            reframe_row: 0,
        }
    }
}
