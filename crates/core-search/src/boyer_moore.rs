//! Plain-text search (§4.G): Boyer-Moore with a bad-character table
//! (`delta1`) and a good-suffix table (`delta2`), scanning the buffer
//! directly through `Point` motions rather than over a contiguous slice,
//! since lines aren't contiguous in memory.
//!
//! Both tables are built once from the pattern and reused for forward and
//! backward scans: a backward scan maps pattern index `i` onto the point
//! `m - i` steps before the window's end instead of `i` steps after its
//! start, which is the mirror image of the forward mapping and needs no
//! second, byte-reversed copy of the pattern.

use core_status::{EdResult, Status};
use core_text::motion::{current_byte, next_char, prev_char};
use core_text::{LineStore, Point};

fn advance(store: &LineStore, mut point: Point, n: usize) -> Option<Point> {
    for _ in 0..n {
        point = next_char(store, point)?;
    }
    Some(point)
}

fn retreat(store: &LineStore, mut point: Point, n: usize) -> Option<Point> {
    for _ in 0..n {
        point = prev_char(store, point)?;
    }
    Some(point)
}

fn build_delta1(pattern: &[u8]) -> [usize; 256] {
    let m = pattern.len();
    let mut table = [m; 256];
    for (i, &b) in pattern.iter().enumerate() {
        table[b as usize] = m - 1 - i;
    }
    table
}

/// Charras & Lecroq's good-suffix preprocessing (`suffixes` + `preBmGs`),
/// transliterated with signed indices since it walks past both ends of the
/// pattern during construction.
fn compute_suffixes(pattern: &[u8]) -> Vec<i64> {
    let m = pattern.len() as i64;
    let mut suff = vec![0i64; pattern.len()];
    if m == 0 {
        return suff;
    }
    suff[(m - 1) as usize] = m;
    let mut g = m - 1;
    let mut f = 0i64;
    let mut i = m - 2;
    while i >= 0 {
        if i > g && suff[(i + m - 1 - f) as usize] < i - g {
            suff[i as usize] = suff[(i + m - 1 - f) as usize];
        } else {
            if i < g {
                g = i;
            }
            f = i;
            while g >= 0 && pattern[g as usize] == pattern[(g + m - 1 - f) as usize] {
                g -= 1;
            }
            suff[i as usize] = f - g;
        }
        i -= 1;
    }
    suff
}

fn build_delta2(pattern: &[u8]) -> Vec<usize> {
    let m = pattern.len() as i64;
    let mut shift = vec![pattern.len(); pattern.len()];
    if m == 0 {
        return shift;
    }
    let suff = compute_suffixes(pattern);
    let mut j = 0i64;
    let mut i = m - 1;
    loop {
        if i == -1 || suff[i as usize] == i + 1 {
            while j < m - 1 - i {
                if shift[j as usize] == pattern.len() {
                    shift[j as usize] = (m - 1 - i) as usize;
                }
                j += 1;
            }
        }
        if i == -1 {
            break;
        }
        i -= 1;
    }
    for i in 0..(m - 1) {
        let pos = (m - 1 - suff[i as usize]) as usize;
        shift[pos] = (m - 1 - i) as usize;
    }
    shift
}

/// A compiled plain-text pattern, keyed by case-sensitivity.
#[derive(Debug, Clone)]
pub struct Pattern {
    bytes: Vec<u8>,
    case_sensitive: bool,
    delta1: [usize; 256],
    delta2: Vec<usize>,
}

impl Pattern {
    pub fn compile(pattern: &[u8], case_sensitive: bool) -> Self {
        let bytes: Vec<u8> = if case_sensitive {
            pattern.to_vec()
        } else {
            pattern.iter().map(u8::to_ascii_lowercase).collect()
        };
        let delta1 = build_delta1(&bytes);
        let delta2 = build_delta2(&bytes);
        Self { bytes, case_sensitive, delta1, delta2 }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn norm(&self, b: u8) -> u8 {
        if self.case_sensitive { b } else { b.to_ascii_lowercase() }
    }
}

/// `scan(n, direction)`'s plain-pattern path (§4.G). Returns the matched
/// span `[start, end)`.
pub fn scan_forward(store: &LineStore, from: Point, pattern: &Pattern) -> EdResult<(Point, Point)> {
    let m = pattern.len();
    if m == 0 {
        return Ok((from, from));
    }
    let mut window_start = from;
    loop {
        let mut i = m - 1;
        let mismatch = loop {
            let p = advance(store, window_start, i).ok_or(Status::NotFound)?;
            let b = current_byte(store, p).ok_or(Status::NotFound)?;
            let nb = pattern.norm(b);
            if nb != pattern.bytes[i] {
                break Some((i, nb));
            }
            if i == 0 {
                break None;
            }
            i -= 1;
        };
        match mismatch {
            None => {
                let end = advance(store, window_start, m).ok_or(Status::NotFound)?;
                return Ok((window_start, end));
            }
            Some((j, bad_byte)) => {
                let shift = pattern.delta1[bad_byte as usize].max(pattern.delta2[j]) + 1;
                window_start = advance(store, window_start, shift).ok_or(Status::NotFound)?;
            }
        }
    }
}

/// Backward counterpart of [`scan_forward`]: searches for the nearest match
/// ending at or before `from`, returning its span `[start, end)`.
pub fn scan_backward(store: &LineStore, from: Point, pattern: &Pattern) -> EdResult<(Point, Point)> {
    let m = pattern.len();
    if m == 0 {
        return Ok((from, from));
    }
    let mut window_end = from;
    loop {
        let mut i = m - 1;
        let mismatch = loop {
            let p = retreat(store, window_end, m - i).ok_or(Status::NotFound)?;
            let b = current_byte(store, p).ok_or(Status::NotFound)?;
            let nb = pattern.norm(b);
            if nb != pattern.bytes[i] {
                break Some((i, nb));
            }
            if i == 0 {
                break None;
            }
            i -= 1;
        };
        match mismatch {
            None => {
                let start = retreat(store, window_end, m).ok_or(Status::NotFound)?;
                return Ok((start, window_end));
            }
            Some((j, bad_byte)) => {
                let shift = pattern.delta1[bad_byte as usize].max(pattern.delta2[j]) + 1;
                window_end = retreat(store, window_end, shift).ok_or(Status::NotFound)?;
            }
        }
    }
}
