//! Buffers and the buffer manager (§4.B).

use bitflags::bitflags;
use core_status::{EdResult, Status};
use core_text::{DetachedChain, LineId, LineStore, Point};

use crate::mark::MarkTable;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// Modified since the last clear/save.
        const CHANGED  = 1 << 0;
        /// Currently narrowed.
        const NARROWED = 1 << 1;
        /// Holds macro source rather than ordinary text.
        const MACRO    = 1 << 2;
        /// Hidden from interactive buffer listings.
        const HIDDEN   = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FindFlags: u32 {
        const CREATE   = 1 << 0;
        const FILE_BASE = 1 << 1;
        const UNIQUIFY = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const IGNORE_CHANGED = 1 << 0;
        const UNNARROW       = 1 << 1;
        const CLEAR_FNAME    = 1 << 2;
    }
}

/// The character substituted into a `FILE_BASE` name when the basename
/// starts with a space or with the macro-header prefix, so the result
/// never collides with a macro invocation syntax.
pub const MACRO_PREFIX_CHAR: char = '@';

fn sanitize_char(c: char) -> char {
    if c.is_ascii_graphic() || c == ' ' { c } else { '?' }
}

/// Derive a buffer name from a file path's basename (`FindFlags::FILE_BASE`).
pub fn file_base_name(path: &str) -> String {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let mut out: String = base.chars().map(sanitize_char).collect();
    if let Some(first) = out.chars().next()
        && (first == ' ' || first == MACRO_PREFIX_CHAR)
    {
        out.replace_range(0..first.len_utf8(), "_");
    }
    out
}

/// An editable sequence of lines plus the metadata the rest of the system
/// hangs off it: name, backing file, mode flags, marks, and narrowing state.
#[derive(Debug)]
pub struct Buffer {
    pub name: String,
    pub filename: Option<String>,
    pub flags: BufferFlags,
    pub store: LineStore,
    pub point: Point,
    pub marks: MarkTable,
    narrow_top: Option<DetachedChain>,
    narrow_bottom: Option<DetachedChain>,
    narrow_bounds: Option<(LineId, LineId)>,
    window_refs: usize,
    pub exec_count: u32,
    pub macro_arg_count: Option<u32>,
    pub soft_tab_size: usize,
    pub hard_tab_size: usize,
    pub delimiter: String,
}

impl Buffer {
    pub fn new(name: impl Into<String>, filename: Option<String>) -> Self {
        let store = LineStore::new();
        let point = Point::new(store.header(), 0);
        Self {
            name: name.into(),
            filename,
            flags: BufferFlags::empty(),
            store,
            point,
            marks: MarkTable::new(),
            narrow_top: None,
            narrow_bottom: None,
            narrow_bounds: None,
            window_refs: 0,
            exec_count: 0,
            macro_arg_count: None,
            soft_tab_size: 0,
            hard_tab_size: 8,
            delimiter: "\n".to_string(),
        }
    }

    pub fn is_narrowed(&self) -> bool {
        self.narrow_bounds.is_some()
    }

    pub fn mark_changed(&mut self) {
        self.flags.insert(BufferFlags::CHANGED);
    }

    pub fn incref_window(&mut self) {
        self.window_refs += 1;
    }

    pub fn decref_window(&mut self) {
        self.window_refs = self.window_refs.saturating_sub(1);
    }

    pub fn window_count(&self) -> usize {
        self.window_refs
    }
}

/// Owns the full set of buffers and tracks which one is current. Exactly
/// one buffer is current at any time (§4.B invariant).
#[derive(Debug, Default)]
pub struct BufferManager {
    buffers: Vec<Buffer>,
    current: usize,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.buffers.iter().position(|b| b.name == name)
    }

    pub fn buffer(&self, idx: usize) -> EdResult<&Buffer> {
        self.buffers.get(idx).ok_or(Status::NotFound)
    }

    pub fn buffer_mut(&mut self, idx: usize) -> EdResult<&mut Buffer> {
        self.buffers.get_mut(idx).ok_or(Status::NotFound)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> EdResult<&Buffer> {
        self.buffer(self.current)
    }

    pub fn current_mut(&mut self) -> EdResult<&mut Buffer> {
        self.buffer_mut(self.current)
    }

    pub fn set_current(&mut self, idx: usize) -> EdResult<()> {
        if idx >= self.buffers.len() {
            return Err(Status::NotFound);
        }
        self.current = idx;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    /// `find(name, flags)` — §4.B.
    pub fn find(&mut self, name_or_path: &str, flags: FindFlags) -> EdResult<usize> {
        let base_name = if flags.contains(FindFlags::FILE_BASE) {
            file_base_name(name_or_path)
        } else {
            name_or_path.to_string()
        };

        if !flags.contains(FindFlags::UNIQUIFY)
            && let Some(idx) = self.index_of(&base_name)
        {
            return Ok(idx);
        }

        if !flags.contains(FindFlags::CREATE) {
            return Err(Status::NotFound);
        }

        let mut name = base_name.clone();
        if flags.contains(FindFlags::UNIQUIFY) {
            let mut n = 2;
            while self.index_of(&name).is_some() {
                name = format!("{base_name}{n}");
                n += 1;
            }
        }

        let filename = flags.contains(FindFlags::FILE_BASE).then(|| name_or_path.to_string());
        self.buffers.push(Buffer::new(name, filename));
        Ok(self.buffers.len() - 1)
    }

    /// `clear(buf, flags)` — §4.B. Confirmation is modeled as a hard error
    /// the caller can retry past with `IGNORE_CHANGED`/`UNNARROW`; the
    /// interactive "are you sure?" prompt itself lives above this layer.
    pub fn clear(&mut self, idx: usize, flags: ClearFlags) -> EdResult<()> {
        let buf = self.buffer_mut(idx)?;
        if buf.flags.contains(BufferFlags::CHANGED) && !flags.contains(ClearFlags::IGNORE_CHANGED) {
            return Err(Status::failure("buffer has unsaved changes"));
        }
        if buf.is_narrowed() && !flags.contains(ClearFlags::UNNARROW) {
            return Err(Status::failure("buffer is narrowed"));
        }
        buf.narrow_top = None;
        buf.narrow_bottom = None;
        buf.narrow_bounds = None;
        buf.flags.remove(BufferFlags::NARROWED);
        buf.store.clear();
        buf.point = Point::new(buf.store.header(), 0);
        buf.marks = MarkTable::new();
        buf.flags.remove(BufferFlags::CHANGED);
        if flags.contains(ClearFlags::CLEAR_FNAME) {
            buf.filename = None;
        }
        Ok(())
    }

    /// `narrow(buf, n)` — §4.B. Visible range becomes the `n` lines starting
    /// at point; everything else is detached into up to two fragments.
    pub fn narrow(&mut self, idx: usize, n: usize) -> EdResult<()> {
        let buf = self.buffer_mut(idx)?;
        if buf.is_narrowed() {
            return Err(Status::failure("buffer is already narrowed"));
        }
        if n == 0 {
            return Err(Status::failure("narrow count must be positive"));
        }
        let visible_first = buf.point.line;
        if buf.store.is_header(visible_first) {
            return Err(Status::NotFound);
        }
        let mut visible_last = visible_first;
        for _ in 1..n {
            let next = buf.store.next(visible_last);
            if buf.store.is_header(next) {
                break;
            }
            visible_last = next;
        }

        let mut outside = Vec::new();
        let mut cur = buf.store.first();
        while cur != visible_first {
            outside.push(cur);
            cur = buf.store.next(cur);
        }
        let mut cur = buf.store.next(visible_last);
        while !buf.store.is_header(cur) {
            outside.push(cur);
            cur = buf.store.next(cur);
        }

        let (top, bottom) = buf.store.narrow(visible_first, visible_last);
        buf.marks.deactivate_on_lines(&outside);
        buf.narrow_top = top;
        buf.narrow_bottom = bottom;
        buf.narrow_bounds = Some((visible_first, visible_last));
        buf.flags.insert(BufferFlags::NARROWED);
        Ok(())
    }

    /// `widen(buf)` — §4.B.
    pub fn widen(&mut self, idx: usize) -> EdResult<()> {
        let buf = self.buffer_mut(idx)?;
        let (first, last) = buf.narrow_bounds.take().ok_or_else(|| Status::failure("buffer is not narrowed"))?;
        buf.store.widen(first, last, buf.narrow_top.take(), buf.narrow_bottom.take());
        buf.marks.activate_all();
        buf.flags.remove(BufferFlags::NARROWED);
        Ok(())
    }

    /// `delete(buf, flags)` — §4.B. `displayed`/`aliased`/`hook_bound` are
    /// supplied by the caller, which owns the window table, alias table, and
    /// hook bindings this crate doesn't know about.
    pub fn delete(&mut self, idx: usize, displayed: bool, aliased: bool, hook_bound: bool, flags: ClearFlags) -> EdResult<()> {
        {
            let buf = self.buffer(idx)?;
            if displayed {
                return Err(Status::failure("buffer is displayed in a window"));
            }
            if buf.exec_count > 0 {
                return Err(Status::failure("buffer is executing"));
            }
            if aliased {
                return Err(Status::failure("buffer is aliased"));
            }
            if hook_bound {
                return Err(Status::failure("buffer is bound to a hook"));
            }
        }
        self.clear(idx, flags)?;
        self.buffers.remove(idx);
        if self.current > idx || self.current >= self.buffers.len() {
            self.current = self.current.saturating_sub(1).min(self.buffers.len().saturating_sub(1));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_base_strips_directory_and_sanitizes() {
        assert_eq!(file_base_name("/tmp/report.txt"), "report.txt");
        assert_eq!(file_base_name(" leading"), "_leading");
        assert_eq!(file_base_name("@macro"), "_macro");
        assert_eq!(file_base_name("a\x01b"), "a?b");
    }

    #[test]
    fn find_create_then_reuse() {
        let mut mgr = BufferManager::new();
        let a = mgr.find("scratch", FindFlags::CREATE).unwrap();
        let b = mgr.find("scratch", FindFlags::empty()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn find_without_create_fails_on_miss() {
        let mut mgr = BufferManager::new();
        assert!(mgr.find("nope", FindFlags::empty()).is_err());
    }

    #[test]
    fn find_uniquify_avoids_collision() {
        let mut mgr = BufferManager::new();
        mgr.find("scratch", FindFlags::CREATE).unwrap();
        let b = mgr.find("scratch", FindFlags::CREATE | FindFlags::UNIQUIFY).unwrap();
        assert_eq!(mgr.buffer(b).unwrap().name, "scratch2");
    }

    #[test]
    fn clear_requires_confirmation_flags() {
        let mut mgr = BufferManager::new();
        let idx = mgr.find("scratch", FindFlags::CREATE).unwrap();
        mgr.buffer_mut(idx).unwrap().mark_changed();
        assert!(mgr.clear(idx, ClearFlags::empty()).is_err());
        assert!(mgr.clear(idx, ClearFlags::IGNORE_CHANGED).is_ok());
    }

    #[test]
    fn narrow_then_widen_round_trips() {
        use core_text::insert_chars;
        let mut mgr = BufferManager::new();
        let idx = mgr.find("scratch", FindFlags::CREATE).unwrap();
        let buf = mgr.buffer_mut(idx).unwrap();
        let mut p = buf.point;
        for line in ["one", "two", "three", "four"] {
            core_text::ensure_insertable(&mut buf.store, &mut p);
            insert_chars(&mut buf.store, &mut p, line.as_bytes()).unwrap();
            core_text::insert_newline(&mut buf.store, &mut p).unwrap();
        }
        buf.point = Point::new(buf.store.first(), 0);

        mgr.narrow(idx, 2).unwrap();
        assert!(mgr.buffer(idx).unwrap().is_narrowed());
        assert_eq!(mgr.buffer(idx).unwrap().store.line_count(), 2);

        mgr.widen(idx).unwrap();
        assert!(!mgr.buffer(idx).unwrap().is_narrowed());
        assert_eq!(mgr.buffer(idx).unwrap().store.line_count(), 5);
    }

    #[test]
    fn delete_refuses_displayed_buffer() {
        let mut mgr = BufferManager::new();
        let idx = mgr.find("scratch", FindFlags::CREATE).unwrap();
        assert!(mgr.delete(idx, true, false, false, ClearFlags::empty()).is_err());
        assert!(mgr.delete(idx, false, false, false, ClearFlags::empty()).is_ok());
        assert_eq!(mgr.len(), 0);
    }
}
