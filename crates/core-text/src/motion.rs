//! Byte-oriented point motions shared by edit primitives, search, and the
//! case-conversion operators. The spec's non-goals rule out Unicode beyond
//! 8-bit, so motion here is purely byte-wise — no grapheme segmentation.

use crate::{LineStore, Point};

/// Is `b` a "word" byte (alphanumeric or underscore)?
pub fn is_word_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Advance `point` by one byte, crossing a line boundary onto the next line
/// at offset 0. Returns `false` (leaving `point` unchanged) at end-of-buffer.
pub fn next_char(store: &LineStore, point: Point) -> Option<Point> {
    let len = store.len(point.line);
    if point.offset < len {
        Some(Point::new(point.line, point.offset + 1))
    } else if !store.is_header(point.line) {
        let next = store.next(point.line);
        Some(Point::new(next, 0))
    } else {
        None
    }
}

/// Retreat `point` by one byte, crossing onto the end of the previous line.
/// Returns `None` at the very start of the buffer.
pub fn prev_char(store: &LineStore, point: Point) -> Option<Point> {
    if point.offset > 0 {
        Some(Point::new(point.line, point.offset - 1))
    } else {
        let prev = store.prev(point.line);
        if prev == point.line {
            None
        } else {
            Some(Point::new(prev, store.len(prev)))
        }
    }
}

/// Move forward past `n` word boundaries (start of the next word each time),
/// stopping at end-of-buffer. Used by `case_convert`'s word scope and
/// word-wise motions generally.
pub fn forward_word(store: &LineStore, mut point: Point, n: usize) -> Point {
    for _ in 0..n {
        // Skip the remainder of the current word, if any.
        while let Some(p) = next_char(store, point) {
            if current_byte(store, point).is_some_and(is_word_byte) {
                point = p;
            } else {
                break;
            }
        }
        // Skip separators until the next word starts (or EOB).
        loop {
            match current_byte(store, point) {
                Some(b) if !is_word_byte(b) => {
                    if let Some(p) = next_char(store, point) {
                        point = p;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }
    point
}

/// The byte at `point`, or `None` at end-of-buffer / end-of-line.
pub fn current_byte(store: &LineStore, point: Point) -> Option<u8> {
    if store.is_header(point.line) {
        return None;
    }
    store.bytes(point.line).get(point.offset).copied()
}

/// Start-of-line point (offset 0) for the line `point` is on.
pub fn line_start(point: Point) -> Point {
    Point::new(point.line, 0)
}

/// End-of-line point (offset == line length) for the line `point` is on.
pub fn line_end(store: &LineStore, point: Point) -> Point {
    Point::new(point.line, store.len(point.line))
}
