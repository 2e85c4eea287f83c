//! Buffer-level edit primitives (§4.E), layered on top of `core_text`'s
//! line-store operations and `core_rings`'s kill/delete rings.

use core_rings::TextRing;
use core_status::EdResult;
use core_text::{FixupEvent, LineStore, Point, apply_fixup, delete_span, insert_chars as text_insert_chars, insert_newline as text_insert_newline, motion};

use crate::mark::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// No ring involvement.
    Delete,
    /// Goes to the kill ring.
    Kill,
    /// Goes to the delete (undelete) ring.
    Undelete,
}

/// Result of `delete_chars`: the bytes actually removed, and whether the
/// full requested count was satisfied. A boundary hit is reported via
/// `hit_boundary` rather than an error so the partial deletion that did
/// happen isn't silently discarded.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub removed: Vec<u8>,
    pub hit_boundary: bool,
    /// Line-identity changes the deletion caused (merges across a newline),
    /// for callers that need to fix up marks or window faces in other
    /// windows onto the same buffer.
    pub events: Vec<FixupEvent>,
}

/// `insert_chars(n, c)` — insert `n` copies of byte `c` at point.
pub fn insert_chars(store: &mut LineStore, point: &mut Point, c: u8, n: usize) -> EdResult<FixupEvent> {
    text_insert_chars(store, point, &vec![c; n])
}

/// `insert_newline()` — split the current line at point.
pub fn insert_newline(store: &mut LineStore, point: &mut Point) -> EdResult<FixupEvent> {
    text_insert_newline(store, point)
}

/// `delete_chars(count, mode)` — §4.E. `count` is signed: positive deletes
/// forward from point, negative deletes backward. Routes removed text into
/// the ring matching `mode`, honoring forward-append / backward-prepend.
pub fn delete_chars(
    store: &mut LineStore,
    point: &mut Point,
    count: isize,
    mode: DeleteMode,
    ring: Option<&mut TextRing>,
) -> EdResult<DeleteOutcome> {
    if count == 0 {
        return Ok(DeleteOutcome { removed: Vec::new(), hit_boundary: false, events: Vec::new() });
    }
    let forward = count > 0;
    let n = count.unsigned_abs();
    let mut walker = *point;
    let mut steps = 0usize;
    for _ in 0..n {
        let next = if forward { motion::next_char(store, walker) } else { motion::prev_char(store, walker) };
        match next {
            Some(p) => {
                walker = p;
                steps += 1;
            }
            None => break,
        }
    }
    if steps == 0 {
        return Ok(DeleteOutcome { removed: Vec::new(), hit_boundary: true, events: Vec::new() });
    }

    let (start, end) = if forward { (*point, walker) } else { (walker, *point) };
    let (removed, events) = delete_span(store, start, end)?;
    for ev in &events {
        apply_fixup(point, ev);
    }
    *point = start;

    if let Some(ring) = ring {
        let text = String::from_utf8_lossy(&removed);
        match (mode, forward) {
            (DeleteMode::Delete, _) => {}
            (_, true) => ring.append(&text),
            (_, false) => ring.prepend(&text),
        }
    }

    Ok(DeleteOutcome { removed, hit_boundary: steps < n, events })
}

fn overwrite_one(store: &mut LineStore, point: &mut Point, c: u8) -> EdResult<()> {
    if store.is_header(point.line) || point.offset >= store.len(point.line) {
        text_insert_chars(store, point, &[c])?;
    } else {
        store.set_byte(point.line, point.offset, c);
        point.offset += 1;
    }
    Ok(())
}

/// `overwrite_chars(n, c)` — delete-then-insert semantics: replaces the `n`
/// bytes starting at point with `n` copies of `c`, extending the buffer at
/// end-of-line/end-of-buffer instead of failing.
pub fn overwrite_chars(store: &mut LineStore, point: &mut Point, c: u8, n: usize) -> EdResult<()> {
    for _ in 0..n {
        overwrite_one(store, point, c)?;
    }
    Ok(())
}

/// `overwrite_string(s, mode)` — like `overwrite_chars` but for an arbitrary
/// byte string; an embedded `\n` splits the line rather than overwriting.
pub fn overwrite_string(store: &mut LineStore, point: &mut Point, s: &[u8]) -> EdResult<()> {
    for &b in s {
        if b == b'\n' {
            text_insert_newline(store, point)?;
        } else {
            overwrite_one(store, point, b)?;
        }
    }
    Ok(())
}

/// Column of `point` within its line. The byte-oriented model has no
/// embedded-tab/wide-character column expansion of its own (that lives in
/// the display differ's `vt_putc`); tab-stop math here treats byte offset
/// as column, which is exact for buffers that don't mix tabs into the
/// middle of a line before the stop being computed.
fn column(point: Point) -> usize {
    point.offset
}

/// Insert a tab at point: `soft_tab_size` spaces to the next stop, or a
/// literal `\t` when `soft_tab_size == 0` (hard tabs).
pub fn insert_tab(store: &mut LineStore, point: &mut Point, soft_tab_size: usize) -> EdResult<FixupEvent> {
    if soft_tab_size == 0 {
        return text_insert_chars(store, point, &[b'\t']);
    }
    let col = column(*point);
    let spaces = soft_tab_size - (col % soft_tab_size);
    text_insert_chars(store, point, &vec![b' '; spaces])
}

/// `delete_tab(n, force)` — delete backward so the next non-space lands on
/// the previous tab stop. `force` (the backspace command) falls back to a
/// plain single-character delete when no tab-sized run of spaces precedes
/// point.
pub fn delete_tab(
    store: &mut LineStore,
    point: &mut Point,
    tab_size: usize,
    force: bool,
    ring: Option<&mut TextRing>,
) -> EdResult<Vec<u8>> {
    if tab_size == 0 {
        return delete_chars(store, point, -1, DeleteMode::Delete, ring).map(|o| o.removed);
    }
    let col = column(*point);
    if col == 0 {
        return delete_chars(store, point, -1, DeleteMode::Delete, ring).map(|o| o.removed);
    }
    let target = (col - 1) / tab_size * tab_size;
    let mut run = 0usize;
    while run < col - target {
        let at = point.offset - run - 1;
        if store.bytes(point.line).get(at) != Some(&b' ') {
            break;
        }
        run += 1;
    }
    if run < col - target {
        if force {
            return delete_chars(store, point, -1, DeleteMode::Delete, ring).map(|o| o.removed);
        }
        return Err(core_status::Status::NotFound);
    }
    delete_chars(store, point, -(run as isize), DeleteMode::Delete, ring).map(|o| o.removed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Upper,
    Lower,
    Title,
}

#[derive(Debug, Clone, Copy)]
pub enum CaseScope {
    /// Convert `n` words forward from point.
    Words(usize),
    /// Convert a block of lines: `n > 0` forward from point's line, `n < 0`
    /// ending at point's line.
    Lines(isize),
    /// Convert exactly the bytes in `Region`.
    Region(Region),
}

fn convert_byte(b: u8, mode: CaseMode, at_word_start: bool) -> u8 {
    match mode {
        CaseMode::Upper => b.to_ascii_uppercase(),
        CaseMode::Lower => b.to_ascii_lowercase(),
        CaseMode::Title => {
            if at_word_start {
                b.to_ascii_uppercase()
            } else {
                b.to_ascii_lowercase()
            }
        }
    }
}

/// Convert bytes in `[start, end)` in place, tracking word-start transitions
/// for `Title` mode across line boundaries.
fn convert_range(store: &mut LineStore, start: Point, end: Point, mode: CaseMode, at_word_start: &mut bool) {
    let mut p = start;
    loop {
        if p == end {
            break;
        }
        let b = store.bytes(p.line).get(p.offset).copied();
        if let Some(b) = b {
            let converted = convert_byte(b, mode, *at_word_start);
            store.set_byte(p.line, p.offset, converted);
            *at_word_start = !motion::is_word_byte(b);
        } else {
            *at_word_start = true;
        }
        match motion::next_char(store, p) {
            Some(next) => p = next,
            None => break,
        }
    }
}

fn convert_whole_line(store: &mut LineStore, line: core_text::LineId, mode: CaseMode) {
    let len = store.len(line);
    let mut at_word_start = true;
    for i in 0..len {
        let b = store.bytes(line)[i];
        let converted = convert_byte(b, mode, at_word_start);
        store.set_byte(line, i, converted);
        at_word_start = !motion::is_word_byte(b);
    }
}

fn line_bounds_for(store: &LineStore, point: Point, n: isize) -> (core_text::LineId, core_text::LineId) {
    if n >= 0 {
        let mut last = point.line;
        for _ in 1..n.max(1) {
            let next = store.next(last);
            if store.is_header(next) {
                break;
            }
            last = next;
        }
        (point.line, last)
    } else {
        let mut first = point.line;
        for _ in 0..(-n - 1) {
            let prev = store.prev(first);
            if store.is_header(prev) {
                break;
            }
            first = prev;
        }
        (first, point.line)
    }
}

/// `case_convert(scope, mode)` — §4.E. Returns the point's new position:
/// end of the converted text for word/region scopes (the region's later
/// end, specifically, so the point lands opposite the mark), unchanged for
/// line scope.
pub fn case_convert(store: &mut LineStore, point: Point, scope: CaseScope, mode: CaseMode) -> EdResult<Point> {
    match scope {
        CaseScope::Words(n) => {
            let mut p = point;
            let mut at_word_start = true;
            for _ in 0..n {
                let end = motion::forward_word(store, p, 1);
                convert_range(store, p, end, mode, &mut at_word_start);
                p = end;
            }
            Ok(p)
        }
        CaseScope::Lines(n) => {
            let (first, last) = line_bounds_for(store, point, n);
            let mut cur = first;
            loop {
                convert_whole_line(store, cur, mode);
                if cur == last {
                    break;
                }
                cur = store.next(cur);
            }
            Ok(point)
        }
        CaseScope::Region(region) => {
            let (lo, hi) = if region.size >= 0 {
                (region.start, advance(store, region.start, region.size as usize))
            } else {
                (retreat(store, region.start, (-region.size) as usize), region.start)
            };
            let mut at_word_start = true;
            convert_range(store, lo, hi, mode, &mut at_word_start);
            Ok(if region.size >= 0 { hi } else { lo })
        }
    }
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
    use core_text::{LineStore, insert_chars as seed_insert, insert_newline as seed_newline};

    fn seed(store: &mut LineStore, text: &str) -> Point {
        let mut point = Point::new(store.header(), 0);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                seed_newline(store, &mut point).unwrap();
            }
            seed_insert(store, &mut point, line.as_bytes()).unwrap();
        }
        point
    }

    fn line_text(store: &LineStore, id: core_text::LineId) -> String {
        String::from_utf8(store.bytes(id).to_vec()).unwrap()
    }

    #[test]
    fn delete_forward_routes_to_kill_ring_appending() {
        let mut store = LineStore::new();
        seed(&mut store, "hello world");
        let line = store.first();
        let mut point = Point::new(line, 0);
        let mut ring = TextRing::new(8);
        ring.prep(false);
        delete_chars(&mut store, &mut point, 5, DeleteMode::Kill, Some(&mut ring)).unwrap();
        delete_chars(&mut store, &mut point, 1, DeleteMode::Kill, Some(&mut ring)).unwrap();
        assert_eq!(ring.ring().current().map(String::as_str), Some("hello "));
        assert_eq!(line_text(&store, line), "world");
    }

    #[test]
    fn delete_backward_prepends_to_ring() {
        let mut store = LineStore::new();
        seed(&mut store, "hello world");
        let line = store.first();
        let mut point = Point::new(line, 11);
        let mut ring = TextRing::new(8);
        ring.prep(false);
        delete_chars(&mut store, &mut point, -5, DeleteMode::Kill, Some(&mut ring)).unwrap();
        delete_chars(&mut store, &mut point, -1, DeleteMode::Kill, Some(&mut ring)).unwrap();
        assert_eq!(ring.ring().current().map(String::as_str), Some("hello world"));
    }

    #[test]
    fn delete_past_boundary_reports_hit_boundary_but_keeps_partial_result() {
        let mut store = LineStore::new();
        seed(&mut store, "hi");
        let line = store.first();
        let mut point = Point::new(line, 0);
        let outcome = delete_chars(&mut store, &mut point, 10, DeleteMode::Delete, None).unwrap();
        assert!(outcome.hit_boundary);
        assert_eq!(outcome.removed, b"hi");
        assert_eq!(line_text(&store, line), "");
    }

    #[test]
    fn overwrite_chars_replaces_in_place() {
        let mut store = LineStore::new();
        seed(&mut store, "hello");
        let line = store.first();
        let mut point = Point::new(line, 0);
        overwrite_chars(&mut store, &mut point, b'X', 3).unwrap();
        assert_eq!(line_text(&store, line), "XXXlo");
    }

    #[test]
    fn overwrite_chars_extends_past_end_of_line() {
        let mut store = LineStore::new();
        seed(&mut store, "hi");
        let line = store.first();
        let mut point = Point::new(line, 2);
        overwrite_chars(&mut store, &mut point, b'!', 2).unwrap();
        assert_eq!(line_text(&store, line), "hi!!");
    }

    #[test]
    fn case_convert_words_title_case() {
        let mut store = LineStore::new();
        seed(&mut store, "hello world");
        let line = store.first();
        let point = Point::new(line, 0);
        case_convert(&mut store, point, CaseScope::Words(2), CaseMode::Title).unwrap();
        assert_eq!(line_text(&store, line), "Hello World");
    }

    #[test]
    fn case_convert_lines_upper_case() {
        let mut store = LineStore::new();
        seed(&mut store, "abc\ndef");
        let l1 = store.first();
        let l2 = store.next(l1);
        let point = Point::new(l1, 0);
        case_convert(&mut store, point, CaseScope::Lines(2), CaseMode::Upper).unwrap();
        assert_eq!(line_text(&store, l1), "ABC");
        assert_eq!(line_text(&store, l2), "DEF");
    }
}
