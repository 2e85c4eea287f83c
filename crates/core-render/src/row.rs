//! Virtual/physical row storage (§4.F): one array holds what we want on
//! screen, the other what's actually there; the differ reconciles them.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RowFlags: u32 {
        const CHANGED  = 1 << 0;
        /// Line is horizontally scrolled off the right edge.
        const EXTENDED = 1 << 1;
        /// Physical row content is unknown (forces a full rewrite).
        const NEW      = 1 << 2;
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<u8>,
    pub flags: RowFlags,
    /// Half-open reverse-video column range, if any.
    pub reverse: Option<(usize, usize)>,
}

impl Row {
    pub fn blank(width: usize) -> Self {
        Self {
            cells: vec![b' '; width],
            flags: RowFlags::NEW,
            reverse: None,
        }
    }

    pub fn set_blank(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = b' ');
        self.reverse = None;
    }

    pub fn is_blank_from(&self, col: usize) -> bool {
        self.cells[col..].iter().all(|&c| c == b' ')
    }
}

/// One row's diff result: where the virtual/physical content first and last
/// differ, after accounting for reverse-video boundaries (a prefix/suffix
/// match that straddles a reverse-video edge doesn't count as matching,
/// since the attribute itself must be re-emitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDiff {
    pub start: usize,
    pub end: usize,
    /// True when everything from `start` to end-of-row is blank and not
    /// inside a reverse-video run, so an erase-to-end-of-line suffices
    /// instead of rewriting trailing spaces.
    pub erase_to_eol: bool,
}

/// Compute the common-prefix/common-suffix diff between `virtual_row` and
/// `physical_row`, per §4.F step 6.
pub fn diff_row(virt: &Row, phys: &Row) -> Option<RowDiff> {
    let width = virt.cells.len();
    debug_assert_eq!(width, phys.cells.len());

    if virt.flags.contains(RowFlags::NEW) || phys.flags.contains(RowFlags::NEW) {
        return Some(RowDiff { start: 0, end: width, erase_to_eol: false });
    }

    let mut start = 0;
    while start < width && virt.cells[start] == phys.cells[start] && !on_reverse_edge(virt, start) {
        start += 1;
    }
    if start == width {
        return None;
    }

    let mut end = width;
    while end > start && virt.cells[end - 1] == phys.cells[end - 1] && !on_reverse_edge(virt, end - 1) {
        end -= 1;
    }

    let erase_to_eol = virt.is_blank_from(start) && !in_reverse(virt, start, width);
    Some(RowDiff { start, end, erase_to_eol })
}

fn on_reverse_edge(row: &Row, col: usize) -> bool {
    match row.reverse {
        Some((l, r)) => col == l || col == r,
        None => false,
    }
}

fn in_reverse(row: &Row, start: usize, end: usize) -> bool {
    match row.reverse {
        Some((l, r)) => start < r && end > l,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(s: &str) -> Row {
        let mut r = Row::blank(s.len());
        r.cells = s.as_bytes().to_vec();
        r.flags = RowFlags::empty();
        r
    }

    #[test]
    fn identical_rows_produce_no_diff() {
        let a = row("hello world");
        let b = row("hello world");
        assert!(diff_row(&a, &b).is_none());
    }

    #[test]
    fn diff_finds_common_prefix_and_suffix() {
        let a = row("hello WORLD");
        let b = row("hello world");
        let d = diff_row(&a, &b).unwrap();
        assert_eq!(d.start, 6);
        assert_eq!(d.end, 11);
    }

    #[test]
    fn new_row_forces_full_rewrite() {
        let mut a = row("abc");
        a.flags = RowFlags::NEW;
        let b = row("abc");
        let d = diff_row(&a, &b).unwrap();
        assert_eq!((d.start, d.end), (0, 3));
    }

    #[test]
    fn blank_suffix_prefers_erase_to_eol() {
        let mut a = Row::blank(10);
        a.flags = RowFlags::empty();
        a.cells[0] = b'x';
        let mut b = Row::blank(10);
        b.flags = RowFlags::empty();
        let d = diff_row(&a, &b).unwrap();
        assert!(d.erase_to_eol);
        assert_eq!(d.start, 0);
    }
}
