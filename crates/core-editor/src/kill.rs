//! Kill/delete/yank glue (§4.E / §4.H): routes `delete_chars` through the
//! kill or delete ring, and drives `yank`/`yank_cycle` on top of it.

use core_rings::TextRing;
use core_state::{Buffer, DeleteMode, DeleteOutcome, MarkId, delete_chars};
use core_status::EdResult;
use core_text::{FixupEvent, Point, insert_chars};

pub const REGION_MARK: MarkId = MarkId::User('R');
pub const WORK_MARK: MarkId = MarkId::User('W');

/// Tracks whether the previous command was a yank, so a following
/// `yank_cycle` knows to undo and replay rather than insert fresh text.
#[derive(Debug, Default, Clone, Copy)]
pub struct YankState {
    last_yank: Option<(Point, Point)>,
}

impl YankState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once per command that isn't itself a yank/yank-cycle, so the
    /// chain breaks.
    pub fn clear(&mut self) {
        self.last_yank = None;
    }
}

/// `delete_chars(count, mode)` (§4.E). `mode == Delete` never touches a
/// ring; `Kill`/`Undelete` accumulate into `ring`, which the caller has
/// already `prep`'d based on whether the previous command belonged to the
/// same kill/delete family.
pub fn delete(buffer: &mut Buffer, count: isize, mode: DeleteMode, ring: Option<&mut TextRing>) -> EdResult<DeleteOutcome> {
    let mut point = buffer.point;
    let outcome = delete_chars(&mut buffer.store, &mut point, count, mode, ring)?;
    buffer.point = point;
    if !outcome.removed.is_empty() {
        buffer.mark_changed();
    }
    Ok(outcome)
}

/// `yank(n)` — §4.H: insert ring entry `n` (`n <= 0`, `0` is current) at
/// point, and leave the region mark on the inserted span. Returns the
/// insertion's fixup event so a caller tracking other windows onto this
/// buffer can keep their faces in sync.
pub fn yank(buffer: &mut Buffer, ring: &core_rings::Ring<String>, n: isize, state: &mut YankState) -> EdResult<FixupEvent> {
    let text = ring.get(n)?.clone();
    let start = buffer.point;
    let mut point = start;
    let event = insert_chars(&mut buffer.store, &mut point, text.as_bytes())?;
    buffer.point = point;
    if !text.is_empty() {
        buffer.mark_changed();
    }
    buffer.marks.set(REGION_MARK, start);
    state.last_yank = Some((start, point));
    Ok(event)
}

/// `yank_cycle(n)` — §4.H: only valid right after a `yank`/`yank_cycle`.
/// Deletes the previously inserted span, cycles the ring, and re-inserts
/// the new current entry. Returns every fixup event from both halves, in
/// order.
pub fn yank_cycle(buffer: &mut Buffer, ring: &mut core_rings::Ring<String>, n: isize, state: &mut YankState) -> EdResult<Vec<FixupEvent>> {
    let Some((start, end)) = state.last_yank else {
        return Err(core_status::Status::failure("yank-cycle must immediately follow a yank"));
    };
    let (_removed, mut events) = core_text::delete_span(&mut buffer.store, start, end)?;
    buffer.point = start;
    ring.cycle(n);
    events.push(yank(buffer, ring, 0, state)?);
    Ok(events)
}
