//! Marks and regions (§4.C).
//!
//! The original encoded an inactive mark as a negative offset (`-(offset+1)`)
//! so a single field could carry both the position and the active bit.
//! That's a bit-packing trick for a language without sum types; here it's
//! just an enum.

use std::collections::HashMap;

use core_status::{EdResult, Status};
use core_text::{Fixupable, LineId, LineStore, Point, motion};

/// A named, stable position within a buffer. Narrowing deactivates marks
/// that fall outside the newly visible range; widening reactivates them.
/// Deactivation never discards the position — only activity for lookup
/// purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Active(Point),
    Inactive(Point),
}

impl Mark {
    pub fn point(&self) -> Point {
        match self {
            Mark::Active(p) | Mark::Inactive(p) => *p,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Mark::Active(_))
    }

    pub fn deactivate(&mut self) {
        *self = Mark::Inactive(self.point());
    }

    pub fn activate(&mut self) {
        *self = Mark::Active(self.point());
    }
}

impl Fixupable for Mark {
    fn line(&self) -> LineId {
        self.point().line
    }
    fn offset(&self) -> usize {
        self.point().offset
    }
    fn retarget(&mut self, line: LineId, offset: usize) {
        let active = self.is_active();
        let p = Point::new(line, offset);
        *self = if active { Mark::Active(p) } else { Mark::Inactive(p) };
    }
}

/// Identifies a mark. User marks are named by a single printable character;
/// window-attached marks (used internally to save per-window faces across
/// narrow/widen) are allocated from a separate id space so they never
/// collide with a user mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkId {
    User(char),
    Window(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOpts {
    /// Look up an existing mark; fail if absent.
    Query,
    /// Create the mark at a given point if it doesn't already exist.
    Create,
    /// Ignore the supplied id and allocate a fresh window-attached id.
    WindowId,
}

#[derive(Debug, Default)]
pub struct MarkTable {
    marks: HashMap<MarkId, Mark>,
    next_window_id: u32,
}

impl MarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_create(&mut self, id: MarkId, opts: MarkOpts, at: Point) -> EdResult<MarkId> {
        match opts {
            MarkOpts::Query => {
                if self.marks.contains_key(&id) {
                    Ok(id)
                } else {
                    Err(Status::NotFound)
                }
            }
            MarkOpts::Create => {
                self.marks.entry(id).or_insert(Mark::Active(at));
                Ok(id)
            }
            MarkOpts::WindowId => {
                let id = MarkId::Window(self.next_window_id);
                self.next_window_id += 1;
                self.marks.insert(id, Mark::Active(at));
                Ok(id)
            }
        }
    }

    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.marks.get(&id)
    }

    pub fn set(&mut self, id: MarkId, point: Point) {
        self.marks.insert(id, Mark::Active(point));
    }

    pub fn remove(&mut self, id: MarkId) -> Option<Mark> {
        self.marks.remove(&id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mark> {
        self.marks.values_mut()
    }

    /// Deactivate every mark currently sitting on one of `lines` (called
    /// when narrowing moves those lines out of the visible chain).
    pub fn deactivate_on_lines(&mut self, lines: &[LineId]) {
        for mark in self.marks.values_mut() {
            if lines.contains(&mark.point().line) {
                mark.deactivate();
            }
        }
    }

    /// Reactivate every mark (called on widen; marks outside the narrowed
    /// chain were never touched, so this is safe to call unconditionally).
    pub fn activate_all(&mut self) {
        for mark in self.marks.values_mut() {
            mark.activate();
        }
    }
}

/// An ordered `(point, mark)` pair reduced to a start position and a signed
/// byte size: positive when the other end follows `start`, negative when it
/// precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: Point,
    pub size: isize,
}

/// Count bytes walking forward from `from` until `to_line` is reached, or
/// `None` if the walk wraps back to the header first (i.e. `to_line` lies
/// behind `from` instead of ahead of it).
fn forward_distance(store: &LineStore, from: Point, to_line: LineId, to_offset: usize) -> Option<isize> {
    if from.line == to_line {
        return (to_offset >= from.offset).then(|| (to_offset - from.offset) as isize);
    }
    let mut bytes = (store.len(from.line) - from.offset) as isize + 1;
    let mut cur = store.next(from.line);
    loop {
        if store.is_header(cur) {
            return None;
        }
        if cur == to_line {
            return Some(bytes + to_offset as isize);
        }
        bytes += store.len(cur) as isize + 1;
        cur = store.next(cur);
    }
}

/// Locate mark `mark` relative to `point`, as described in §4.C: walks from
/// point looking for the mark's line. `force_begin` rewrites the result so
/// `start` is always the earlier of the two positions.
pub fn get_region(store: &LineStore, point: Point, mark: Point, force_begin: bool) -> EdResult<Region> {
    if point.line == mark.line && point.offset == mark.offset {
        return Ok(Region { start: point, size: 0 });
    }
    if let Some(d) = forward_distance(store, point, mark.line, mark.offset) {
        return Ok(Region { start: point, size: d });
    }
    if let Some(d) = forward_distance(store, mark, point.line, point.offset) {
        return if force_begin {
            Ok(Region { start: mark, size: d })
        } else {
            Ok(Region { start: point, size: -d })
        };
    }
    Err(Status::failure("mark not set in this buffer"))
}

fn line_block_region(store: &LineStore, first: LineId, last: LineId) -> Region {
    let start = Point::new(first, 0);
    let mut bytes = 0usize;
    let mut cur = first;
    loop {
        bytes += store.len(cur);
        if cur == last {
            if !store.is_header(store.next(cur)) {
                bytes += 1;
            }
            break;
        }
        bytes += 1;
        cur = store.next(cur);
    }
    Region { start, size: bytes as isize }
}

/// Bound a block of whole lines per §4.C: `n == 0` covers every line the
/// current region intersects, `n > 0` counts forward from point's line,
/// `n < 0` counts backward ending at point's line.
pub fn get_line_region(store: &LineStore, point: Point, n: isize, region: Option<Region>) -> EdResult<Region> {
    if n == 0 {
        let region = region.ok_or_else(|| Status::failure("no region to bound"))?;
        let (lo, hi) = if region.size >= 0 {
            (region.start, advance(store, region.start, region.size as usize))
        } else {
            (retreat(store, region.start, (-region.size) as usize), region.start)
        };
        let first_line = lo.line;
        let last_line = if hi.offset == 0 && hi.line != first_line && !store.is_header(hi.line) {
            store.prev(hi.line)
        } else {
            hi.line
        };
        return Ok(line_block_region(store, first_line, last_line));
    }
    if n > 0 {
        let mut last = point.line;
        for _ in 1..n {
            let next = store.next(last);
            if store.is_header(next) {
                break;
            }
            last = next;
        }
        return Ok(line_block_region(store, point.line, last));
    }
    let mut first = point.line;
    for _ in 0..(-n - 1) {
        let prev = store.prev(first);
        if store.is_header(prev) {
            break;
        }
        first = prev;
    }
    Ok(line_block_region(store, first, point.line))
}

fn advance(store: &LineStore, mut p: Point, n: usize) -> Point {
    for _ in 0..n {
        match motion::next_char(store, p) {
            Some(next) => p = next,
            None => break,
        }
    }
    p
}

fn retreat(store: &LineStore, mut p: Point, n: usize) -> Point {
    for _ in 0..n {
        match motion::prev_char(store, p) {
            Some(prev) => p = prev,
            None => break,
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{insert_chars, insert_newline};

    fn seed(store: &mut LineStore, text: &str) {
        let mut point = Point::new(store.header(), 0);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                insert_newline(store, &mut point).unwrap();
            }
            insert_chars(store, &mut point, line.as_bytes()).unwrap();
        }
    }

    #[test]
    fn region_positive_when_mark_follows_point() {
        let mut store = LineStore::new();
        seed(&mut store, "abc\ndef");
        let l1 = store.first();
        let l2 = store.next(l1);
        let point = Point::new(l1, 1);
        let mark = Point::new(l2, 2);
        let region = get_region(&store, point, mark, false).unwrap();
        assert_eq!(region.start, point);
        assert_eq!(region.size, 5); // "bc" + '\n' + "de"
    }

    #[test]
    fn region_negative_when_mark_precedes_point_without_force() {
        let mut store = LineStore::new();
        seed(&mut store, "abc\ndef");
        let l1 = store.first();
        let l2 = store.next(l1);
        let point = Point::new(l2, 2);
        let mark = Point::new(l1, 1);
        let region = get_region(&store, point, mark, false).unwrap();
        assert_eq!(region.start, point);
        assert!(region.size < 0);
    }

    #[test]
    fn force_begin_rewrites_start_to_earlier_end() {
        let mut store = LineStore::new();
        seed(&mut store, "abc\ndef");
        let l1 = store.first();
        let l2 = store.next(l1);
        let point = Point::new(l2, 2);
        let mark = Point::new(l1, 1);
        let region = get_region(&store, point, mark, true).unwrap();
        assert_eq!(region.start, mark);
        assert!(region.size > 0);
    }

    #[test]
    fn mark_deactivated_then_reactivated() {
        let mut store = LineStore::new();
        seed(&mut store, "abc");
        let line = store.first();
        let mut table = MarkTable::new();
        let p = Point::new(line, 1);
        table.set(MarkId::User('a'), p);
        table.deactivate_on_lines(&[p.line]);
        assert!(!table.get(MarkId::User('a')).unwrap().is_active());
        table.activate_all();
        assert!(table.get(MarkId::User('a')).unwrap().is_active());
    }
}
