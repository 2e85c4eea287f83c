//! Top-level assembly: wires the buffer manager, screen/window tiling, the
//! five named rings, the macro interpreter, and the display differ into one
//! `Editor` that a binary crate can drive from a real terminal and keystroke
//! loop.

mod fixup;
mod kill;
mod macro_host;
mod qreplace;
mod rings;

pub use fixup::propagate as propagate_fixup;
pub use kill::{REGION_MARK, WORK_MARK, YankState, delete, yank, yank_cycle};
pub use macro_host::{EditorMacroHost, run_macro};
pub use qreplace::query_replace_at_point;
pub use rings::RingSet;

use core_config::EditorConfig;
use core_model::Face;
use core_render::{Differ, Sink};
use core_state::{BufferManager, DeleteMode, FindFlags};
use core_status::EdResult;
use core_text::Point;

/// Owns every piece of editor state that isn't tied to one particular
/// keystroke: buffers, the screen/window layout, the named rings, and the
/// display differ that reconciles them against the terminal.
pub struct Editor {
    pub buffers: BufferManager,
    pub screens: core_model::ScreenManager,
    pub rings: RingSet,
    pub differ: Differ,
    pub config: EditorConfig,
    yank_state: YankState,
}

impl Editor {
    /// Starts with one screen, one window, and an empty `scratch` buffer
    /// displayed in it — the same starting point a freshly launched session
    /// has before any file is opened.
    pub fn new(config: EditorConfig, cols: u16, rows: u16) -> EdResult<Self> {
        let mut buffers = BufferManager::new();
        let idx = buffers.find("scratch", FindFlags::CREATE)?;
        {
            let buf = buffers.buffer_mut(idx)?;
            buf.soft_tab_size = config.tabs.soft_tab_size;
            buf.hard_tab_size = config.tabs.hard_tab_size;
            buf.incref_window();
        }
        let buf = buffers.buffer(idx)?;
        let face = Face::new(buf.point, buf.store.first());

        let mut screens = core_model::ScreenManager::new();
        screens.insert(cols, rows, idx, face);

        let differ = Differ::new(cols, rows, config.tabs.hard_tab_size, config.display.high_bit_visible);

        Ok(Self { buffers, screens, rings: RingSet::new(config.rings), differ, config, yank_state: YankState::new() })
    }

    /// The buffer index of the current window on the current screen — the
    /// buffer every point-mutating `Editor` method acts on. Exposed publicly
    /// so a command-dispatch layer reads the same "current buffer" the
    /// editor itself uses, rather than a `BufferManager`-local notion of
    /// current that a multi-window session can let drift out of step.
    pub fn current_buffer_index(&self) -> usize {
        self.screens.current().current().buffer_index
    }

    /// Copies the current buffer's point into the current window's face, so
    /// the differ draws the cursor where the buffer actually is. A window's
    /// `Face` is the only record of where its cursor sits on screen (§4.D);
    /// nothing else keeps it in step with a buffer mutation, so every
    /// `Editor` method that moves `buffer.point` calls this before
    /// returning. Exposed publicly for callers (e.g. a command-dispatch
    /// layer) that move `buffer.point` directly rather than through one of
    /// those methods.
    pub fn sync_face(&mut self) {
        let idx = self.current_buffer_index();
        let Ok(buf) = self.buffers.buffer(idx) else { return };
        let point = buf.point;
        self.screens.current_mut().current_mut().face.point = point;
    }

    /// Moves point in the current buffer via `f` (one of `core_text::motion`'s
    /// helpers, or a closure built on them) and syncs the window face.
    pub fn move_point(&mut self, f: impl FnOnce(&core_text::LineStore, Point) -> Point) -> EdResult<()> {
        let idx = self.current_buffer_index();
        let buf = self.buffers.buffer_mut(idx)?;
        buf.point = f(&buf.store, buf.point);
        self.sync_face();
        Ok(())
    }

    /// Runs one full display pass against `sink`.
    pub fn redraw(&mut self, sink: &mut dyn Sink) -> EdResult<()> {
        self.differ.update(&mut self.screens, &self.buffers, sink)
    }

    /// Reacts to a terminal resize (§4.D / §4.F).
    pub fn resize(&mut self, cols: u16, rows: u16) -> EdResult<()> {
        self.differ.resize(cols, rows, &mut self.screens)
    }

    /// Self-insert (§4.E): inserts `n` copies of `c` at point in the current
    /// buffer and propagates the resulting fix-up.
    pub fn insert_at_point(&mut self, c: u8, n: usize) -> EdResult<()> {
        let idx = self.current_buffer_index();
        let buf = self.buffers.buffer_mut(idx)?;
        let mut point = buf.point;
        let event = core_state::insert_chars(&mut buf.store, &mut point, c, n)?;
        buf.point = point;
        buf.mark_changed();
        fixup::propagate(&mut self.screens, idx, std::slice::from_ref(&event));
        self.sync_face();
        Ok(())
    }

    /// Splits the current line at point (§4.E), i.e. pressing Enter.
    pub fn insert_newline_at_point(&mut self) -> EdResult<()> {
        let idx = self.current_buffer_index();
        let buf = self.buffers.buffer_mut(idx)?;
        let mut point = buf.point;
        let event = core_state::insert_newline(&mut buf.store, &mut point)?;
        buf.point = point;
        buf.mark_changed();
        fixup::propagate(&mut self.screens, idx, std::slice::from_ref(&event));
        self.sync_face();
        Ok(())
    }

    /// `delete(count, mode)` (§4.E / §4.H) against the current buffer,
    /// routed through the kill or delete ring per `mode`, and propagated to
    /// any other window currently displaying the same buffer.
    ///
    /// Callers drive `TextRing::prep` themselves before invoking this: only
    /// the command-dispatch layer knows whether the previous command
    /// belonged to the same kill/delete family, so repeated kills land in
    /// one accumulating ring entry instead of one per keystroke.
    pub fn delete_at_point(&mut self, count: isize, mode: DeleteMode) -> EdResult<()> {
        let idx = self.current_buffer_index();
        let ring = match mode {
            DeleteMode::Delete => None,
            DeleteMode::Kill => Some(&mut self.rings.kill),
            DeleteMode::Undelete => Some(&mut self.rings.delete),
        };
        let buf = self.buffers.buffer_mut(idx)?;
        let outcome = kill::delete(buf, count, mode, ring)?;
        fixup::propagate(&mut self.screens, idx, &outcome.events);
        self.sync_face();
        Ok(())
    }

    /// `yank(n)` (§4.H) into the current buffer at point.
    pub fn yank_at_point(&mut self, n: isize) -> EdResult<()> {
        let idx = self.current_buffer_index();
        let buf = self.buffers.buffer_mut(idx)?;
        let event = kill::yank(buf, self.rings.kill.ring(), n, &mut self.yank_state)?;
        fixup::propagate(&mut self.screens, idx, std::slice::from_ref(&event));
        self.sync_face();
        Ok(())
    }

    /// `yank-cycle(n)` (§4.H); only valid right after a `yank`/`yank-cycle`.
    pub fn yank_cycle_at_point(&mut self, n: isize) -> EdResult<()> {
        let idx = self.current_buffer_index();
        let buf = self.buffers.buffer_mut(idx)?;
        let events = kill::yank_cycle(buf, self.rings.kill.ring_mut(), n, &mut self.yank_state)?;
        fixup::propagate(&mut self.screens, idx, &events);
        self.sync_face();
        Ok(())
    }

    /// Breaks the kill/yank accumulation chain; call once per command that
    /// isn't itself a kill, delete, or yank.
    pub fn break_yank_chain(&mut self) {
        self.yank_state.clear();
    }

    /// Runs query-replace (§4.G) against the current buffer's point,
    /// recording the pattern/replacement text just used onto the search and
    /// replace rings the way an interactive session would.
    pub fn query_replace_at_point(
        &mut self,
        pattern_text: &str,
        pattern: &core_search::SearchPattern,
        replacement_text: &str,
        replacement: &core_search::ReplPat,
        prompt: &mut dyn core_search::ReplacePrompt,
    ) -> EdResult<core_search::QueryReplaceOutcome> {
        self.rings.search.push(pattern_text.to_string(), false);
        self.rings.replace.push(replacement_text.to_string(), false);
        let idx = self.current_buffer_index();
        let buf = self.buffers.buffer_mut(idx)?;
        let outcome = qreplace::query_replace_at_point(buf, pattern, replacement, prompt)?;
        self.sync_face();
        Ok(outcome)
    }

    /// Splits the current window (§4.D), inc-refing the new window's
    /// buffer.
    pub fn split_window(&mut self, n: i32) -> EdResult<usize> {
        let buffer_index = self.screens.current().current().buffer_index;
        let other = {
            let store = &self.buffers.buffer(buffer_index)?.store;
            self.screens.current_mut().split(n, store)?
        };
        self.buffers.buffer_mut(buffer_index)?.incref_window();
        Ok(other)
    }

    /// Deletes the current window (§4.D), dropping the outgoing window's
    /// buffer reference. The buffer itself survives even at a zero
    /// refcount — whether an unreferenced buffer should be cleaned up is a
    /// command-level policy decision, not this layer's.
    pub fn delete_window(&mut self, n: i32) -> EdResult<()> {
        let freed_buffer = self.screens.current_mut().delete(n)?;
        if let Ok(buf) = self.buffers.buffer_mut(freed_buffer) {
            buf.decref_window();
        }
        Ok(())
    }

    /// True if `buffer_index` is displayed in any window on any screen —
    /// the `displayed` flag `BufferManager::delete` needs from its caller.
    pub fn is_displayed(&self, buffer_index: usize) -> bool {
        self.screens.screens().iter().any(|s| s.windows().iter().any(|w| w.buffer_index == buffer_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::insert_chars;

    #[test]
    fn new_editor_starts_with_one_scratch_window() {
        let editor = Editor::new(EditorConfig::default(), 80, 24).unwrap();
        assert_eq!(editor.buffers.len(), 1);
        assert_eq!(editor.screens.current().windows().len(), 1);
        assert_eq!(editor.buffers.current().unwrap().name, "scratch");
    }

    #[test]
    fn kill_then_yank_round_trips_through_the_kill_ring() {
        let mut editor = Editor::new(EditorConfig::default(), 80, 24).unwrap();
        let idx = editor.current_buffer_index();
        {
            let buf = editor.buffers.buffer_mut(idx).unwrap();
            let mut p = buf.point;
            insert_chars(&mut buf.store, &mut p, b"hello world").unwrap();
            buf.point = Point::new(buf.store.first(), 0);
        }
        editor.rings.kill.prep(false);
        editor.delete_at_point(5, DeleteMode::Kill).unwrap();
        editor.yank_at_point(0).unwrap();
        let buf = editor.buffers.buffer(idx).unwrap();
        let text = String::from_utf8(buf.store.bytes(buf.store.first()).to_vec()).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn self_insert_moves_point_and_syncs_the_window_face() {
        let mut editor = Editor::new(EditorConfig::default(), 80, 24).unwrap();
        editor.insert_at_point(b'x', 3).unwrap();
        let idx = editor.current_buffer_index();
        let buf = editor.buffers.buffer(idx).unwrap();
        let text = String::from_utf8(buf.store.bytes(buf.store.first()).to_vec()).unwrap();
        assert_eq!(text, "xxx");
        assert_eq!(editor.screens.current().current().face.point, buf.point);
    }

    #[test]
    fn move_point_crosses_a_line_boundary_and_syncs_the_face() {
        let mut editor = Editor::new(EditorConfig::default(), 80, 24).unwrap();
        editor.insert_at_point(b'a', 1).unwrap();
        editor.insert_newline_at_point().unwrap();
        editor.insert_at_point(b'b', 1).unwrap();
        editor.move_point(|store, p| core_text::motion::prev_char(store, p).unwrap_or(p)).unwrap();
        editor.move_point(|store, p| core_text::motion::prev_char(store, p).unwrap_or(p)).unwrap();
        let idx = editor.current_buffer_index();
        let buf = editor.buffers.buffer(idx).unwrap();
        assert_eq!(buf.point.offset, 1);
        assert_eq!(editor.screens.current().current().face.point, buf.point);
    }

    #[test]
    fn splitting_a_window_increments_the_buffer_refcount() {
        let mut editor = Editor::new(EditorConfig::default(), 80, 24).unwrap();
        let idx = editor.current_buffer_index();
        assert_eq!(editor.buffers.buffer(idx).unwrap().window_count(), 1);
        editor.split_window(0).unwrap();
        assert_eq!(editor.buffers.buffer(idx).unwrap().window_count(), 2);
        assert!(editor.is_displayed(idx));
    }

    #[test]
    fn deleting_a_window_decrements_the_buffer_refcount() {
        let mut editor = Editor::new(EditorConfig::default(), 80, 24).unwrap();
        let idx = editor.current_buffer_index();
        editor.split_window(0).unwrap();
        editor.delete_window(0).unwrap();
        assert_eq!(editor.buffers.buffer(idx).unwrap().window_count(), 1);
    }
}
