//! Per-buffer line arena.
//!
//! Lines live in a slab (`Vec<Slot>`) instead of being individually heap
//! allocated and pointer-linked. A [`LineId`] is a generation-checked handle
//! into the slab: it survives slab growth (unlike a raw pointer into a
//! `Vec` that may reallocate) and a stale handle from a freed slot is
//! detectable rather than dangling. The slab still maintains an explicit
//! doubly-linked chain (`prev`/`next` fields) because splits, joins, and
//! narrowing all need to splice that chain directly.

use core_status::{EdResult, Status};

/// Handle to a line inside a [`LineStore`]. Stable across slab growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId {
    index: u32,
    generation: u32,
}

impl LineId {
    #[cfg(test)]
    pub(crate) fn raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Round a requested byte count up to the next multiple of the allocation
/// block size. Lines never shrink their backing storage on delete; this
/// mirrors the original "grow in blocks of 32, never shrink" policy.
const BLOCK: usize = 32;

pub(crate) fn round_block(n: usize) -> usize {
    n.div_ceil(BLOCK) * BLOCK
}

#[derive(Debug, Clone)]
struct Line {
    data: Vec<u8>,
    prev: LineId,
    next: LineId,
}

impl Line {
    fn ensure_capacity(&mut self, needed: usize) {
        if self.data.capacity() < needed {
            let target = round_block(needed);
            self.data.reserve(target.saturating_sub(self.data.len()));
        }
    }
}

#[derive(Debug)]
enum Slot {
    Occupied(Line),
    Free { next_free: Option<u32> },
}

/// The doubly-linked ring of lines belonging to one buffer, plus a
/// distinguished zero-length header line. End-of-buffer is the header at
/// offset 0; the header's successor is the first real line, predecessor the
/// last. The header itself is never freed while the store exists.
#[derive(Debug)]
pub struct LineStore {
    slots: Vec<Slot>,
    generations: Vec<u32>,
    free_head: Option<u32>,
    header: LineId,
}

/// A detached, self-contained chain of lines produced by [`LineStore::narrow`],
/// restorable byte-for-byte by [`LineStore::widen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachedChain {
    pub first: LineId,
    pub last: LineId,
}

impl LineStore {
    /// Create a store containing only the header line.
    pub fn new() -> Self {
        let mut store = Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_head: None,
            header: LineId {
                index: 0,
                generation: 0,
            },
        };
        let header = store.push_slot(Line {
            data: Vec::new(),
            prev: store.header,
            next: store.header,
        });
        store.header = header;
        // Self-link now that we know the real id.
        store.line_mut(header).prev = header;
        store.line_mut(header).next = header;
        store
    }

    pub fn header(&self) -> LineId {
        self.header
    }

    fn push_slot(&mut self, line: Line) -> LineId {
        if let Some(idx) = self.free_head {
            let Slot::Free { next_free } = self.slots[idx as usize] else {
                unreachable!("free_head must point at a free slot")
            };
            self.free_head = next_free;
            self.slots[idx as usize] = Slot::Occupied(line);
            LineId {
                index: idx,
                generation: self.generations[idx as usize],
            }
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot::Occupied(line));
            self.generations.push(0);
            LineId {
                index: idx,
                generation: 0,
            }
        }
    }

    fn slot_matches(&self, id: LineId) -> bool {
        (id.index as usize) < self.slots.len() && self.generations[id.index as usize] == id.generation
    }

    fn line(&self, id: LineId) -> &Line {
        assert!(self.slot_matches(id), "stale or invalid LineId");
        match &self.slots[id.index as usize] {
            Slot::Occupied(line) => line,
            Slot::Free { .. } => unreachable!("stale LineId pointed at a free slot"),
        }
    }

    fn line_mut(&mut self, id: LineId) -> &mut Line {
        assert!(self.slot_matches(id), "stale or invalid LineId");
        match &mut self.slots[id.index as usize] {
            Slot::Occupied(line) => line,
            Slot::Free { .. } => unreachable!("stale LineId pointed at a free slot"),
        }
    }

    /// Byte length of `id`'s content (`used`, in spec terms).
    pub fn len(&self, id: LineId) -> usize {
        self.line(id).data.len()
    }

    /// Borrow the raw bytes of a line.
    pub fn bytes(&self, id: LineId) -> &[u8] {
        &self.line(id).data
    }

    /// Overwrite a single byte in place (used by case conversion, which
    /// changes a character's case without altering line length).
    pub fn set_byte(&mut self, line: LineId, at: usize, byte: u8) {
        self.line_mut(line).data[at] = byte;
    }

    pub fn next(&self, id: LineId) -> LineId {
        self.line(id).next
    }

    pub fn prev(&self, id: LineId) -> LineId {
        self.line(id).prev
    }

    pub fn is_header(&self, id: LineId) -> bool {
        id == self.header
    }

    /// First real line, or the header if the buffer is empty.
    pub fn first(&self) -> LineId {
        self.next(self.header)
    }

    /// Last real line, or the header if the buffer is empty.
    pub fn last(&self) -> LineId {
        self.prev(self.header)
    }

    pub fn is_empty(&self) -> bool {
        self.first() == self.header
    }

    /// Number of real (non-header) lines currently linked into the visible chain.
    pub fn line_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.first();
        while cur != self.header {
            count += 1;
            cur = self.next(cur);
        }
        count
    }

    fn link_after(&mut self, anchor: LineId, id: LineId) {
        let after = self.line(anchor).next;
        self.line_mut(anchor).next = id;
        self.line_mut(id).prev = anchor;
        self.line_mut(id).next = after;
        self.line_mut(after).prev = id;
    }

    fn unlink(&mut self, id: LineId) {
        let prev = self.line(id).prev;
        let next = self.line(id).next;
        self.line_mut(prev).next = next;
        self.line_mut(next).prev = prev;
    }

    fn free_slot(&mut self, id: LineId) {
        assert!(self.slot_matches(id));
        self.generations[id.index as usize] = self.generations[id.index as usize].wrapping_add(1);
        self.slots[id.index as usize] = Slot::Free {
            next_free: self.free_head,
        };
        self.free_head = Some(id.index);
    }

    /// Insert `bytes` into `line` at `at`. Caller applies the returned
    /// [`crate::FixupEvent`] to every `Point` it holds.
    pub fn insert_chars(
        &mut self,
        line: LineId,
        at: usize,
        bytes: &[u8],
    ) -> EdResult<crate::FixupEvent> {
        if bytes.is_empty() {
            return Ok(crate::FixupEvent::Insert { line, at, n: 0 });
        }
        let l = self.line_mut(line);
        if at > l.data.len() {
            return Err(Status::Fatal("insert offset beyond line end".into()));
        }
        l.ensure_capacity(l.data.len() + bytes.len());
        l.data.splice(at..at, bytes.iter().copied());
        Ok(crate::FixupEvent::Insert {
            line,
            at,
            n: bytes.len(),
        })
    }

    /// Delete `n` bytes from `line` starting at `at`.
    pub fn delete_chars(&mut self, line: LineId, at: usize, n: usize) -> EdResult<(Vec<u8>, crate::FixupEvent)> {
        let l = self.line_mut(line);
        let end = (at + n).min(l.data.len());
        if at > l.data.len() || at > end {
            return Err(Status::Fatal("delete range out of bounds".into()));
        }
        let removed: Vec<u8> = l.data.splice(at..end, std::iter::empty()).collect();
        let n = removed.len();
        Ok((removed, crate::FixupEvent::Delete { line, at, n }))
    }

    /// Split `line` at `at`, moving the tail into a freshly allocated line
    /// immediately after it in the chain.
    pub fn split_line(&mut self, line: LineId, at: usize) -> EdResult<crate::FixupEvent> {
        let tail: Vec<u8> = {
            let l = self.line_mut(line);
            if at > l.data.len() {
                return Err(Status::Fatal("split offset beyond line end".into()));
            }
            l.data.split_off(at)
        };
        let new_id = self.push_slot(Line {
            data: tail,
            prev: line,
            next: line,
        });
        self.link_after(line, new_id);
        Ok(crate::FixupEvent::Split {
            l1: line,
            l2: new_id,
            at,
        })
    }

    /// Join `line` with its successor, appending the successor's bytes and
    /// freeing its slot. `line`'s id is reused as `l3`.
    pub fn join_with_next(&mut self, line: LineId) -> EdResult<crate::FixupEvent> {
        let next = self.line(line).next;
        if next == self.header {
            return Err(Status::NotFound);
        }
        let l1_len = self.line(line).data.len();
        let tail = self.line(next).data.clone();
        self.unlink(next);
        self.line_mut(line).data.extend_from_slice(&tail);
        self.free_slot(next);
        Ok(crate::FixupEvent::Join {
            l1: line,
            l2: next,
            l3: line,
            l1_len,
        })
    }

    /// Unlink and free `line` outright, without merging its content anywhere
    /// (used when a multi-line delete consumes a line entirely). Anything
    /// pointing at `line` must retarget to `successor` at offset 0.
    pub fn free_line(&mut self, line: LineId, successor: LineId) -> crate::FixupEvent {
        self.unlink(line);
        self.free_slot(line);
        crate::FixupEvent::Freed { line, successor }
    }

    /// Allocate and link a brand-new empty line immediately before `before`
    /// (used when appending at end-of-buffer).
    pub fn insert_line_before(&mut self, before: LineId) -> LineId {
        let prev = self.line(before).prev;
        let id = self.push_slot(Line {
            data: Vec::new(),
            prev,
            next: before,
        });
        self.link_after(prev, id);
        id
    }

    /// Detach the fragment `[first, last]` from the visible chain, closing
    /// the gap directly between `before` and `after`. Returns the detached
    /// chain descriptor; its internal links are untouched.
    fn detach(&mut self, before: LineId, first: LineId, last: LineId, after: LineId) -> DetachedChain {
        self.line_mut(before).next = after;
        self.line_mut(after).prev = before;
        DetachedChain { first, last }
    }

    /// Narrow the visible chain to `[visible_first, visible_last]`, detaching
    /// everything outside that range into up to two fragments (top, bottom).
    /// Pure list surgery: no mark walk is required here.
    pub fn narrow(
        &mut self,
        visible_first: LineId,
        visible_last: LineId,
    ) -> (Option<DetachedChain>, Option<DetachedChain>) {
        let top = if visible_first != self.first() {
            let first = self.first();
            let last = self.prev(visible_first);
            Some(self.detach(self.header, first, last, visible_first))
        } else {
            None
        };
        let bottom = if visible_last != self.last() {
            let first = self.next(visible_last);
            let last = self.last();
            Some(self.detach(visible_last, first, last, self.header))
        } else {
            None
        };
        (top, bottom)
    }

    /// Reattach fragments previously produced by [`Self::narrow`]. The
    /// current visible range (`visible_first`..`visible_last`) must be the
    /// same one passed to `narrow`.
    pub fn widen(
        &mut self,
        visible_first: LineId,
        visible_last: LineId,
        top: Option<DetachedChain>,
        bottom: Option<DetachedChain>,
    ) {
        if let Some(chain) = top {
            self.line_mut(self.header).next = chain.first;
            self.line_mut(chain.first).prev = self.header;
            self.line_mut(chain.last).next = visible_first;
            self.line_mut(visible_first).prev = chain.last;
        }
        if let Some(chain) = bottom {
            self.line_mut(visible_last).next = chain.first;
            self.line_mut(chain.first).prev = visible_last;
            self.line_mut(self.header).prev = chain.last;
            self.line_mut(chain.last).next = self.header;
        }
    }

    /// Lines contained in a detached chain, for mark-deactivation bookkeeping.
    pub fn chain_lines(&self, chain: DetachedChain) -> Vec<LineId> {
        let mut out = Vec::new();
        let mut cur = chain.first;
        loop {
            out.push(cur);
            if cur == chain.last {
                break;
            }
            cur = self.next(cur);
        }
        out
    }

    /// Free every real line (used by buffer clear).
    ///
    /// Unlike `free`, this discards the *entire* chain at once, so no single
    /// `FixupEvent::Freed { line, .. }` can describe it — every point/mark
    /// held by the caller is now stale regardless of which line it named.
    /// Callers must unconditionally reset their own positions to the header
    /// at offset 0 rather than running this through `apply_fixup`.
    pub fn clear(&mut self) {
        let mut cur = self.first();
        while cur != self.header {
            let next = self.next(cur);
            self.free_slot(cur);
            cur = next;
        }
        self.line_mut(self.header).next = self.header;
        self.line_mut(self.header).prev = self.header;
    }
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_empty() {
        let store = LineStore::new();
        assert!(store.is_empty());
        assert_eq!(store.line_count(), 0);
        assert_eq!(store.first(), store.header());
    }

    #[test]
    fn insert_line_before_header_then_chars() {
        let mut store = LineStore::new();
        let header = store.header();
        let id = store.insert_line_before(header);
        store.insert_chars(id, 0, b"hello").unwrap();
        assert_eq!(store.line_count(), 1);
        assert_eq!(store.bytes(id), b"hello");
    }

    #[test]
    fn split_then_join_round_trips() {
        let mut store = LineStore::new();
        let header = store.header();
        let id = store.insert_line_before(header);
        store.insert_chars(id, 0, b"abcdef").unwrap();
        let ev = store.split_line(id, 3).unwrap();
        let (l1, l2) = match ev {
            crate::FixupEvent::Split { l1, l2, at } => {
                assert_eq!(at, 3);
                (l1, l2)
            }
            _ => panic!("expected split"),
        };
        assert_eq!(store.bytes(l1), b"abc");
        assert_eq!(store.bytes(l2), b"def");
        assert_eq!(store.line_count(), 2);

        let ev = store.join_with_next(l1).unwrap();
        match ev {
            crate::FixupEvent::Join { l3, l1_len, .. } => {
                assert_eq!(l1_len, 3);
                assert_eq!(store.bytes(l3), b"abcdef");
            }
            _ => panic!("expected join"),
        }
        assert_eq!(store.line_count(), 1);
    }

    #[test]
    fn generation_detects_stale_handles() {
        let mut store = LineStore::new();
        let header = store.header();
        let id = store.insert_line_before(header);
        store.join_with_next(store.prev(id)).ok(); // no-op: id has no predecessor besides header
        let stale = LineId::raw(id.index, id.generation.wrapping_add(1));
        assert!(!store.slot_matches(stale));
    }

    #[test]
    fn narrow_then_widen_restores_chain() {
        let mut store = LineStore::new();
        let header = store.header();
        let mut ids = Vec::new();
        for i in 0..5u8 {
            let id = store.insert_line_before(header);
            store.insert_chars(id, 0, &[b'a' + i]).unwrap();
            ids.push(id);
        }
        assert_eq!(store.line_count(), 5);
        let (top, bottom) = store.narrow(ids[1], ids[3]);
        assert!(top.is_some() && bottom.is_some());
        assert_eq!(store.line_count(), 3);
        store.widen(ids[1], ids[3], top, bottom);
        assert_eq!(store.line_count(), 5);
        let mut cur = store.first();
        let mut collected = Vec::new();
        while cur != store.header() {
            collected.push(store.bytes(cur).to_vec());
            cur = store.next(cur);
        }
        assert_eq!(
            collected,
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec(), b"e".to_vec()]
        );
    }

    #[test]
    fn round_block_rounds_up() {
        assert_eq!(round_block(0), 0);
        assert_eq!(round_block(1), 32);
        assert_eq!(round_block(32), 32);
        assert_eq!(round_block(33), 64);
    }
}
