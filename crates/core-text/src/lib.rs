//! Per-buffer line storage: the doubly-linked ring of mutable byte lines
//! described in §4.A, plus the fix-up protocol that keeps every `Point`
//! consistent across splits, joins, and multi-line deletes.
//!
//! The original engine walked raw pointers through every window and mark on
//! every edit. Here lines live in an arena (`LineStore`) addressed by a
//! generation-checked `LineId` handle, so a mutation only needs to return a
//! small [`FixupEvent`] describing what moved; callers (buffers, windows)
//! apply it to whichever `Point`s they hold instead of the store walking the
//! whole editor itself.

mod arena;
mod fixup;

pub use arena::{DetachedChain, LineId, LineStore};
pub use fixup::{Fixupable, FixupEvent, apply_fixup, apply_fixup_top_line};

use core_status::EdResult;

/// A `(line, offset)` position. `offset == line length` means the position
/// sits immediately before the line's trailing newline (or at end-of-buffer
/// when `line` is the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub line: LineId,
    pub offset: usize,
}

impl Point {
    pub fn new(line: LineId, offset: usize) -> Self {
        Self { line, offset }
    }

    pub fn at_eob(&self, store: &LineStore) -> bool {
        store.is_header(self.line) && self.offset == 0
    }
}

impl Fixupable for Point {
    fn line(&self) -> LineId {
        self.line
    }
    fn offset(&self) -> usize {
        self.offset
    }
    fn retarget(&mut self, line: LineId, offset: usize) {
        self.line = line;
        self.offset = offset;
    }
}

/// If `point` sits at end-of-buffer (on the header), materialize a new real
/// line and retarget `point` onto it at offset 0, so the caller can insert
/// into it directly. No-op otherwise.
pub fn ensure_insertable(store: &mut LineStore, point: &mut Point) {
    if store.is_header(point.line) {
        let new_line = store.insert_line_before(point.line);
        point.line = new_line;
        point.offset = 0;
    }
}

/// Insert `bytes` (which must not contain `\n`) at `point`, advancing it
/// past the inserted text. Returns the fix-up event for callers to apply to
/// their own marks/faces.
pub fn insert_chars(store: &mut LineStore, point: &mut Point, bytes: &[u8]) -> EdResult<FixupEvent> {
    debug_assert!(!bytes.contains(&b'\n'));
    ensure_insertable(store, point);
    let ev = store.insert_chars(point.line, point.offset, bytes)?;
    point.offset += bytes.len();
    Ok(ev)
}

/// Split the current line at `point`, moving point to the start of the new
/// (second) line.
pub fn insert_newline(store: &mut LineStore, point: &mut Point) -> EdResult<FixupEvent> {
    ensure_insertable(store, point);
    let ev = store.split_line(point.line, point.offset)?;
    if let FixupEvent::Split { l2, .. } = ev {
        point.line = l2;
        point.offset = 0;
    }
    Ok(ev)
}

/// Delete the half-open span `[start, end)`, which may cross line
/// boundaries. `start` must precede or equal `end` in chain order. Returns
/// the removed bytes (with `\n` reinserted at each crossed line boundary)
/// and the ordered list of fix-up events produced along the way.
pub fn delete_span(store: &mut LineStore, start: Point, end: Point) -> EdResult<(Vec<u8>, Vec<FixupEvent>)> {
    let mut events = Vec::new();
    let mut removed = Vec::new();

    if start.line == end.line {
        let n = end.offset - start.offset;
        let (bytes, ev) = store.delete_chars(start.line, start.offset, n)?;
        removed.extend(bytes);
        events.push(ev);
        return Ok((removed, events));
    }

    let start_len = store.len(start.line);
    let (tail_bytes, ev) = store.delete_chars(start.line, start.offset, start_len - start.offset)?;
    removed.extend(tail_bytes);
    events.push(ev);
    removed.push(b'\n');

    let mut cur = store.next(start.line);
    while cur != end.line {
        let next = store.next(cur);
        removed.extend_from_slice(store.bytes(cur));
        removed.push(b'\n');
        events.push(store.free_line(cur, start.line));
        cur = next;
    }

    let (prefix_bytes, ev) = store.delete_chars(end.line, 0, end.offset)?;
    removed.extend(prefix_bytes);
    events.push(ev);

    events.push(store.join_with_next(start.line)?);

    Ok((removed, events))
}

pub mod motion;
