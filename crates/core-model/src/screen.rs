//! Window tiling within one screen, and the screen manager that tracks
//! several independently-tiled screens (§4.D).
//!
//! Windows partition a screen's rows minus one message-line row. Every
//! operation here (`split`, `delete`, `resize`, `scroll`, `reframe`) works
//! purely in terms of row counts and `LineId`s; it never looks at rendered
//! column content (that's the display differ's job, §4.F).

use core_status::{EdResult, Status};
use core_text::{LineId, LineStore};

use crate::window::{Face, Window, WindowFlags};

fn line_forward(store: &LineStore, mut line: LineId, n: u16) -> LineId {
    for _ in 0..n {
        let next = store.next(line);
        if store.is_header(next) {
            break;
        }
        line = next;
    }
    line
}

/// Is `target` one of the first `span` lines counting forward from `top`?
fn within_span(store: &LineStore, top: LineId, target: LineId, span: u16) -> bool {
    let mut cur = top;
    for _ in 0..span {
        if cur == target {
            return true;
        }
        let next = store.next(cur);
        if store.is_header(next) {
            return false;
        }
        cur = next;
    }
    false
}

/// One independent tiling of windows. The editor may host several; each
/// carries an explicit `number` renumbered whenever a screen is inserted or
/// removed from the owning `ScreenManager`.
#[derive(Debug, Clone)]
pub struct Screen {
    pub number: u32,
    pub cols: u16,
    /// Total rows available to windows, i.e. the terminal height minus the
    /// one message-line row.
    pub rows: u16,
    windows: Vec<Window>,
    current: usize,
}

impl Screen {
    pub fn new(number: u32, cols: u16, rows: u16, initial_buffer: usize, face: Face) -> Self {
        Self {
            number,
            cols,
            rows,
            windows: vec![Window::new(0, rows, initial_buffer, face)],
            current: 0,
        }
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut [Window] {
        &mut self.windows
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Window {
        &self.windows[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Window {
        &mut self.windows[self.current]
    }

    pub fn window(&self, idx: usize) -> EdResult<&Window> {
        self.windows.get(idx).ok_or(Status::NotFound)
    }

    pub fn window_mut(&mut self, idx: usize) -> EdResult<&mut Window> {
        self.windows.get_mut(idx).ok_or(Status::NotFound)
    }

    pub fn set_current(&mut self, idx: usize) -> EdResult<()> {
        if idx >= self.windows.len() {
            return Err(Status::NotFound);
        }
        self.current = idx;
        Ok(())
    }

    /// `split(n)` — §4.D. The current window keeps the upper half; a new
    /// window is inserted immediately below it holding the lower half.
    /// Returns the index of the new (other) window.
    pub fn split(&mut self, n: i32, store: &LineStore) -> EdResult<usize> {
        let idx = self.current;
        let total = self.windows[idx].rows;
        if total < 3 {
            return Err(Status::failure("window too small to split"));
        }
        let even = total / 2;
        let upper = match n {
            0 => even,
            n if n > 0 => (n as u16).min(total - 1),
            n => even.saturating_sub(n.unsigned_abs() as u16).max(1),
        };
        let upper = upper.clamp(1, total - 1);
        let lower = total - upper;

        let win = &self.windows[idx];
        let top = win.top;
        let point_in_upper = within_span(store, win.face.top_line, win.face.point.line, upper);
        let lower_top_line = line_forward(store, win.face.top_line, upper);

        let lower_face = if point_in_upper {
            Face::new(core_text::Point::new(lower_top_line, 0), lower_top_line)
        } else {
            Face::new(win.face.point, win.face.top_line)
        };

        self.windows[idx].rows = upper;
        self.windows[idx].flags.insert(WindowFlags::TEXT | WindowFlags::MODELINE);

        let new_window = Window::new(top + upper, lower, win.buffer_index, lower_face);
        self.windows.insert(idx + 1, new_window);
        Ok(idx + 1)
    }

    /// `delete(n)` — §4.D. Merges the current window's rows into a
    /// neighbor: predecessor by default, successor for `n > 0`, wrapping to
    /// the opposite end of the screen for `|n| >= 2`. Returns the deleted
    /// window's `buffer_index` so the caller can decide whether to drop the
    /// buffer too (when `n == -1` and that was its last window).
    pub fn delete(&mut self, n: i32) -> EdResult<usize> {
        if self.windows.len() < 2 {
            return Err(Status::failure("only one window remains"));
        }
        let idx = self.current;
        let target = if n > 0 {
            if idx + 1 < self.windows.len() { idx + 1 } else { 0 }
        } else if n.unsigned_abs() >= 2 {
            if idx == 0 { self.windows.len() - 1 } else { 0 }
        } else if idx > 0 {
            idx - 1
        } else {
            idx + 1
        };

        let removed = self.windows.remove(idx);
        let target = if target > idx { target - 1 } else { target };
        self.windows[target].rows += removed.rows;
        if removed.top < self.windows[target].top {
            self.windows[target].top = removed.top;
        }
        self.windows[target].flags.insert(WindowFlags::TEXT | WindowFlags::MODELINE);
        self.current = target.min(self.windows.len() - 1);
        Ok(removed.buffer_index)
    }

    /// `resize(n)` — §4.D. `n == 0` equalizes every window; otherwise the
    /// current window becomes `n` rows, stealing from (or giving rows to)
    /// its successor, wrapping to the predecessor if it's the last window.
    pub fn resize(&mut self, n: u16) -> EdResult<()> {
        if n == 0 {
            let count = self.windows.len() as u16;
            let each = self.rows / count;
            let mut extra = self.rows - each * count;
            let mut top = 0;
            for w in &mut self.windows {
                w.top = top;
                w.rows = each + if extra > 0 { extra -= 1; 1 } else { 0 };
                top += w.rows;
                w.flags.insert(WindowFlags::TEXT | WindowFlags::MODELINE);
            }
            return Ok(());
        }
        let idx = self.current;
        if self.windows.len() < 2 {
            return Err(Status::failure("no adjacent window to resize against"));
        }
        let neighbor = if idx + 1 < self.windows.len() { idx + 1 } else { idx - 1 };
        let combined = self.windows[idx].rows + self.windows[neighbor].rows;
        if n == 0 || n >= combined {
            return Err(Status::failure("resize target out of range"));
        }
        self.windows[idx].rows = n;
        self.windows[neighbor].rows = combined - n;
        // Re-derive `top` for every window left-to-right so the partition
        // stays contiguous regardless of which side the neighbor was on.
        let mut top = 0;
        for w in &mut self.windows {
            w.top = top;
            top += w.rows;
            w.flags.insert(WindowFlags::TEXT | WindowFlags::MODELINE);
        }
        Ok(())
    }

    /// `scroll(n, forward)` — §4.D. Shifts the current window's top line by
    /// `n`; if point is no longer within the window afterward, recenters it.
    pub fn scroll(&mut self, store: &LineStore, n: u16, forward: bool, vjump_num: u16, vjump_den: u16) {
        let win = &mut self.windows[self.current];
        win.face.top_line = if forward {
            line_forward(store, win.face.top_line, n)
        } else {
            let mut line = win.face.top_line;
            for _ in 0..n {
                let prev = store.prev(line);
                if store.is_header(prev) {
                    break;
                }
                line = prev;
            }
            line
        };
        win.flags.insert(WindowFlags::TEXT);
        let rows = win.rows;
        let top_line = win.face.top_line;
        let point_line = win.face.point.line;
        if !within_span(store, top_line, point_line, rows) {
            Self::recenter(win, store, vjump_num, vjump_den);
        }
    }

    fn recenter(win: &mut Window, store: &LineStore, vjump_num: u16, vjump_den: u16) {
        let target_row = if vjump_den == 0 { win.rows / 2 } else { (win.rows * vjump_num / vjump_den).min(win.rows.saturating_sub(1)) };
        let mut top = win.face.point.line;
        for _ in 0..target_row {
            let prev = store.prev(top);
            if store.is_header(prev) {
                break;
            }
            top = prev;
        }
        win.face.top_line = top;
    }

    /// `reframe(window)` — §4.D. If `FORCE` is set, place the point-line at
    /// `reframe_row` (negative counts from the bottom); else if point left
    /// the window, recenter with the vertical-jump fraction; otherwise do
    /// nothing.
    pub fn reframe(&mut self, idx: usize, store: &LineStore, vjump_num: u16, vjump_den: u16) {
        let win = &mut self.windows[idx];
        if win.flags.contains(WindowFlags::FORCE) {
            let row = if win.reframe_row < 0 {
                (win.rows as i32 + win.reframe_row).max(0) as u16
            } else {
                (win.reframe_row as u16).min(win.rows.saturating_sub(1))
            };
            let mut top = win.face.point.line;
            for _ in 0..row {
                let prev = store.prev(top);
                if store.is_header(prev) {
                    break;
                }
                top = prev;
            }
            win.face.top_line = top;
            win.flags.remove(WindowFlags::FORCE);
            win.flags.insert(WindowFlags::TEXT);
            return;
        }
        if !within_span(store, win.face.top_line, win.face.point.line, win.rows) {
            Self::recenter(win, store, vjump_num, vjump_den);
            win.flags.insert(WindowFlags::TEXT);
        }
    }
}

/// Owns every screen the editor is hosting and the explicit `1..N`
/// numbering renumbered on insert/delete.
#[derive(Debug, Default)]
pub struct ScreenManager {
    screens: Vec<Screen>,
    current: usize,
}

impl ScreenManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn renumber(&mut self) {
        for (i, s) in self.screens.iter_mut().enumerate() {
            s.number = i as u32 + 1;
        }
    }

    pub fn insert(&mut self, cols: u16, rows: u16, initial_buffer: usize, face: Face) -> usize {
        self.screens.push(Screen::new(0, cols, rows, initial_buffer, face));
        self.renumber();
        self.screens.len() - 1
    }

    pub fn delete(&mut self, idx: usize) -> EdResult<()> {
        if self.screens.len() <= 1 {
            return Err(Status::failure("cannot delete the last screen"));
        }
        self.screens.remove(idx);
        self.renumber();
        self.current = self.current.min(self.screens.len() - 1);
        Ok(())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Screen {
        &self.screens[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Screen {
        &mut self.screens[self.current]
    }

    pub fn screen(&self, idx: usize) -> EdResult<&Screen> {
        self.screens.get(idx).ok_or(Status::NotFound)
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn screens_mut(&mut self) -> &mut [Screen] {
        &mut self.screens
    }

    /// Switch the current screen. Saves the outgoing window's face into its
    /// own record (already held in `Window::face`) and flags a full redraw
    /// by returning `true`; there's nothing further for this layer to do
    /// since each `Window` already tracks its own face.
    pub fn switch_to(&mut self, idx: usize) -> EdResult<bool> {
        if idx >= self.screens.len() {
            return Err(Status::NotFound);
        }
        let changed = idx != self.current;
        self.current = idx;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{Point, insert_chars, insert_newline};

    fn seeded_store(lines: &[&str]) -> LineStore {
        let mut store = LineStore::new();
        let mut point = Point::new(store.header(), 0);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                insert_newline(&mut store, &mut point).unwrap();
            }
            insert_chars(&mut store, &mut point, line.as_bytes()).unwrap();
        }
        store
    }

    #[test]
    fn split_evenly_by_default() {
        let store = seeded_store(&["a", "b", "c"]);
        let face = Face::new(Point::new(store.first(), 0), store.first());
        let mut screen = Screen::new(1, 80, 24, 0, face);
        let other = screen.split(0, &store).unwrap();
        assert_eq!(screen.windows()[0].rows + screen.windows()[other].rows, 24);
        assert_eq!(screen.windows()[0].rows, 12);
    }

    #[test]
    fn split_refuses_when_too_small() {
        let store = seeded_store(&["a"]);
        let face = Face::new(Point::new(store.first(), 0), store.first());
        let mut screen = Screen::new(1, 80, 2, 0, face);
        assert!(screen.split(0, &store).is_err());
    }

    #[test]
    fn delete_merges_into_predecessor_by_default() {
        let store = seeded_store(&["a", "b", "c"]);
        let face = Face::new(Point::new(store.first(), 0), store.first());
        let mut screen = Screen::new(1, 80, 24, 0, face);
        let other = screen.split(12, &store).unwrap();
        screen.set_current(other).unwrap();
        screen.delete(0).unwrap();
        assert_eq!(screen.windows().len(), 1);
        assert_eq!(screen.windows()[0].rows, 24);
    }

    #[test]
    fn resize_zero_equalizes() {
        let store = seeded_store(&["a", "b"]);
        let face = Face::new(Point::new(store.first(), 0), store.first());
        let mut screen = Screen::new(1, 80, 25, 0, face);
        screen.split(0, &store).unwrap();
        screen.resize(0).unwrap();
        let rows: Vec<u16> = screen.windows().iter().map(|w| w.rows).collect();
        assert_eq!(rows.iter().sum::<u16>(), 25);
        assert!(rows.iter().all(|&r| (12..=13).contains(&r)));
    }

    #[test]
    fn screens_renumber_on_delete() {
        let store = seeded_store(&["a"]);
        let face = Face::new(Point::new(store.first(), 0), store.first());
        let mut mgr = ScreenManager::new();
        mgr.insert(80, 24, 0, face);
        mgr.insert(80, 24, 0, face);
        mgr.insert(80, 24, 0, face);
        assert_eq!(mgr.screens()[2].number, 3);
        mgr.delete(0).unwrap();
        assert_eq!(mgr.screens()[0].number, 1);
        assert_eq!(mgr.screens()[1].number, 2);
    }
}
