//! The fix-up protocol: every structural mutation to a [`crate::LineStore`]
//! produces one [`FixupEvent`] describing exactly how existing `(line, offset)`
//! pairs must be retargeted. Callers apply the event to every `Point` they
//! hold (window faces, buffer faces, marks) so nothing is left dangling.
//!
//! This is the arena-and-handle replacement for the original pointer-surgery
//! pass described in the design notes: instead of walking every window on
//! every screen inline, a mutation returns a small value and the caller
//! decides which `Point`s are in scope to fix up.

use crate::LineId;

/// Describes one structural or in-line edit to a line chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupEvent {
    /// Line `l1` was split at byte offset `at`; the tail became new line `l2`.
    Split { l1: LineId, l2: LineId, at: usize },
    /// Lines `l1` and `l2` were joined into `l3` (which may reuse `l1`'s id).
    /// `l1_len` is the byte length of `l1` before the join.
    Join {
        l1: LineId,
        l2: LineId,
        l3: LineId,
        l1_len: usize,
    },
    /// `n` bytes were inserted into `line` at offset `at`.
    Insert { line: LineId, at: usize, n: usize },
    /// `n` bytes were deleted from `line` starting at offset `at`.
    Delete { line: LineId, at: usize, n: usize },
    /// `line` was freed outright (e.g. during buffer clear); anything
    /// pointing at it must retarget to `successor` at offset 0.
    Freed { line: LineId, successor: LineId },
}

/// A `(line, offset)` pair, as held by a `Point`, `Mark`, or window/buffer face.
pub trait Fixupable {
    fn line(&self) -> LineId;
    fn offset(&self) -> usize;
    fn retarget(&mut self, line: LineId, offset: usize);
}

/// Apply a fix-up event to anything addressable as `(line, offset)`.
///
/// This implements §4.A of the line-store contract precisely, including the
/// strict-inequality rule on in-line insert (a point sitting exactly at the
/// insertion offset does not shift — callers that need it to trail the
/// insertion advance it themselves) and the clamp-to-`at` rule on delete.
pub fn apply_fixup<F: Fixupable>(target: &mut F, ev: &FixupEvent) {
    match *ev {
        FixupEvent::Split { l1, l2, at } => {
            // `split_line` keeps the prefix (bytes before `at`) on `l1` and
            // moves the tail (`at` onward) to the new line `l2`.
            if target.line() == l1 {
                if target.offset() < at {
                    target.retarget(l1, target.offset());
                } else {
                    target.retarget(l2, target.offset() - at);
                }
            }
        }
        FixupEvent::Join {
            l1,
            l2,
            l3,
            l1_len,
        } => {
            if target.line() == l1 {
                target.retarget(l3, target.offset());
            } else if target.line() == l2 {
                target.retarget(l3, target.offset() + l1_len);
            }
        }
        FixupEvent::Insert { line, at, n } => {
            if target.line() == line && target.offset() > at {
                target.retarget(line, target.offset() + n);
            }
        }
        FixupEvent::Delete { line, at, n } => {
            if target.line() == line && target.offset() > at {
                let delta = n.min(target.offset() - at);
                target.retarget(line, target.offset() - delta);
            }
        }
        FixupEvent::Freed { line, successor } => {
            if target.line() == line {
                target.retarget(successor, 0);
            }
        }
    }
}

/// Fix-up rule for a bare line reference (no offset) such as a window's
/// top-of-screen line. A top-of-window reference behaves like a point sitting
/// at offset 0 of its line: it only moves to the new line `l2` when the split
/// point itself is at offset 0 (the whole line's content moved to `l2`,
/// leaving `l1` an empty prefix); otherwise the prefix — and the reference —
/// stays on `l1`.
pub fn apply_fixup_top_line(line: &mut LineId, ev: &FixupEvent) {
    match *ev {
        FixupEvent::Split { l1, l2, at } => {
            if *line == l1 && at == 0 {
                *line = l2;
            }
        }
        FixupEvent::Join { l1, l2, l3, .. } => {
            if *line == l1 || *line == l2 {
                *line = l3;
            }
        }
        FixupEvent::Freed { line: freed, successor } => {
            if *line == freed {
                *line = successor;
            }
        }
        FixupEvent::Insert { .. } | FixupEvent::Delete { .. } => {}
    }
}
