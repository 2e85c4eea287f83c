//! The display differ (§4.F): reconciles what each window *wants* to show
//! (the virtual rows, rebuilt every frame from buffer content) against what
//! the terminal currently holds (the physical rows, carried across frames),
//! and emits only the bytes needed to catch the terminal up.

use core_model::{ScreenManager, Window, WindowFlags};
use core_state::BufferManager;
use core_status::EdResult;
use core_text::LineStore;

use crate::row::{Row, RowFlags, diff_row};
use crate::vt::{expand_byte, visual_column};

/// Where the differ sends the bytes it decides are necessary. A terminal
/// backend implements this; tests can use an in-memory stub.
pub trait Sink {
    fn move_cursor(&mut self, row: u16, col: u16);
    fn write(&mut self, bytes: &[u8]);
    fn erase_to_eol(&mut self);
    fn set_reverse(&mut self, on: bool);
    fn clear_screen(&mut self);
    fn flush(&mut self);
}

/// How far into a window's row span (as a fraction) point is re-centered
/// horizontally once it scrolls past the right edge.
const SCROLL_JUMP_NUM: usize = 1;
const SCROLL_JUMP_DEN: usize = 10;

pub struct Differ {
    cols: u16,
    rows: u16,
    physical: Vec<Row>,
    message: crate::message::MessageLine,
    hard_tab_size: usize,
    high_bit_visible: bool,
    vjump_num: u16,
    vjump_den: u16,
    full_redraw: bool,
}

impl Differ {
    pub fn new(cols: u16, rows: u16, hard_tab_size: usize, high_bit_visible: bool) -> Self {
        Self {
            cols,
            rows,
            physical: (0..rows).map(|_| blank(cols as usize, RowFlags::NEW)).collect(),
            message: crate::message::MessageLine::new(cols as usize),
            hard_tab_size,
            high_bit_visible,
            vjump_num: 1,
            vjump_den: 3,
            full_redraw: true,
        }
    }

    pub fn message_mut(&mut self) -> &mut crate::message::MessageLine {
        &mut self.message
    }

    /// §4.F step 1: react to a terminal resize. Reallocates the physical row
    /// array, resizes the current screen's windows to match, and forces a
    /// full redraw next `update`.
    pub fn resize(&mut self, cols: u16, rows: u16, screens: &mut ScreenManager) -> EdResult<()> {
        if cols == self.cols && rows == self.rows {
            return Ok(());
        }
        self.cols = cols;
        self.rows = rows;
        self.physical = (0..rows).map(|_| blank(cols as usize, RowFlags::NEW)).collect();
        self.message = crate::message::MessageLine::new(cols as usize);
        let screen = screens.current_mut();
        screen.cols = cols;
        screen.rows = rows;
        screen.resize(0)?;
        self.full_redraw = true;
        Ok(())
    }

    /// Run one full display pass: reframe every window, rebuild the virtual
    /// rows, diff against the physical rows, and write the difference.
    pub fn update(&mut self, screens: &mut ScreenManager, buffers: &BufferManager, sink: &mut dyn Sink) -> EdResult<()> {
        if self.full_redraw {
            sink.clear_screen();
            for row in &mut self.physical {
                row.set_blank();
                row.flags = RowFlags::NEW;
            }
            self.full_redraw = false;
        }

        let screen = screens.current_mut();
        let window_count = screen.windows().len();
        let current_window = screen.current_index();
        let mut virt: Vec<Row> = (0..self.rows).map(|_| blank(self.cols as usize, RowFlags::empty())).collect();
        let mut cursor: Option<(u16, u16)> = None;

        for idx in 0..window_count {
            let buffer_index = screen.window(idx)?.buffer_index;
            let buffer = buffers.buffer(buffer_index)?;
            let store = &buffer.store;

            screen.reframe(idx, store, self.vjump_num, self.vjump_den);
            self.reframe_horizontal(screen.window_mut(idx)?, store);

            let window = screen.window(idx)?;
            let top = window.top;
            let text_rows = text_rows(window);
            let first_column = window.face.first_column;

            let mut line = window.face.top_line;
            let mut point_row = None;
            for row_offset in 0..text_rows {
                if store.is_header(line) {
                    break;
                }
                if line == window.face.point.line {
                    point_row = Some(row_offset);
                }
                let dest = &mut virt[(top + row_offset) as usize];
                self.render_line(dest, store, line, first_column);
                line = store.next(line);
            }

            if idx == current_window
                && let Some(row_offset) = point_row
            {
                let bytes = store.bytes(window.face.point.line);
                let raw_col = visual_column(bytes, window.face.point.offset, self.hard_tab_size, self.high_bit_visible);
                let col = raw_col.saturating_sub(first_column);
                cursor = Some((top + row_offset, col.min(self.cols.saturating_sub(1) as usize) as u16));
            }

            if window.flags.contains(WindowFlags::MODELINE) {
                let mode_row = top + text_rows;
                self.render_mode_line(&mut virt[mode_row as usize], buffer);
            }

            screen.window_mut(idx)?.flags.remove(WindowFlags::TEXT | WindowFlags::MODELINE);
        }

        for row in 0..self.rows as usize {
            if let Some(diff) = diff_row(&virt[row], &self.physical[row]) {
                self.emit(row as u16, &virt[row], diff, sink);
            }
            self.physical[row] = virt[row].clone();
            self.physical[row].flags = RowFlags::empty();
        }

        let (cursor_row, cursor_col) = cursor.unwrap_or((0, 0));
        sink.move_cursor(cursor_row, cursor_col);
        sink.flush();
        Ok(())
    }

    /// §4.F step 3 (horizontal half): grow/shrink `face.first_column` so
    /// point stays visible, scrolling into a 10%-from-the-edge "jump zone"
    /// rather than the bare minimum once it falls off the right edge.
    fn reframe_horizontal(&self, window: &mut Window, store: &LineStore) {
        let bytes = store.bytes(window.face.point.line);
        let col = visual_column(bytes, window.face.point.offset, self.hard_tab_size, self.high_bit_visible);
        let width = self.cols as usize;

        if col < window.face.first_column || col >= window.face.first_column + width {
            let jump = (width * SCROLL_JUMP_NUM / SCROLL_JUMP_DEN).max(1);
            window.face.first_column = col.saturating_sub(jump);
            window.flags.insert(WindowFlags::TEXT);
        } else if window.face.first_column > 0 && col < width {
            window.face.first_column = 0;
            window.flags.insert(WindowFlags::TEXT);
        }
    }

    /// Render one source line into `dest`, honoring `first_column`'s
    /// horizontal scroll: bytes expanding to virtual columns before it are
    /// skipped entirely rather than clipped mid-expansion.
    fn render_line(&self, dest: &mut Row, store: &LineStore, line: core_text::LineId, first_column: usize) {
        dest.set_blank();
        let width = dest.cells.len();
        let mut virtual_col = 0usize;
        let mut dest_col = 0usize;
        for &b in store.bytes(line) {
            if dest_col >= width {
                break;
            }
            for eb in expand_byte(b, virtual_col, self.hard_tab_size, self.high_bit_visible) {
                if virtual_col >= first_column && dest_col < width {
                    dest.cells[dest_col] = eb;
                    dest_col += 1;
                }
                virtual_col += 1;
            }
        }
    }

    fn render_mode_line(&self, dest: &mut Row, buffer: &core_state::Buffer) {
        dest.set_blank();
        let changed = if buffer.flags.contains(core_state::BufferFlags::CHANGED) { "*" } else { "-" };
        let text = format!("-- {}{} --", buffer.name, changed);
        let mut col = 0;
        for b in text.bytes() {
            if col >= dest.cells.len() {
                break;
            }
            dest.cells[col] = b;
            col += 1;
        }
        dest.reverse = Some((0, dest.cells.len()));
    }

    fn emit(&self, row: u16, virt: &Row, diff: crate::row::RowDiff, sink: &mut dyn Sink) {
        sink.move_cursor(row, diff.start as u16);
        if diff.erase_to_eol {
            let reverse = in_reverse_at(virt, diff.start);
            sink.set_reverse(reverse);
            if diff.start < diff.end {
                sink.write(&virt.cells[diff.start..diff.end]);
            }
            sink.set_reverse(false);
            sink.erase_to_eol();
            return;
        }

        let mut col = diff.start;
        while col < diff.end {
            let reverse = in_reverse_at(virt, col);
            let run_end = (col..diff.end)
                .find(|&c| in_reverse_at(virt, c) != reverse)
                .unwrap_or(diff.end);
            sink.set_reverse(reverse);
            sink.write(&virt.cells[col..run_end]);
            col = run_end;
        }
        sink.set_reverse(false);
    }
}

fn in_reverse_at(row: &Row, col: usize) -> bool {
    matches!(row.reverse, Some((l, r)) if col >= l && col < r)
}

fn blank(width: usize, flags: RowFlags) -> Row {
    let mut row = Row::blank(width);
    row.flags = flags;
    row
}

fn text_rows(window: &Window) -> u16 {
    if window.flags.contains(WindowFlags::MODELINE) {
        window.rows.saturating_sub(1)
    } else {
        window.rows
    }
}
