//! Binds the macro interpreter (§4.I) to a real `BufferManager`: the
//! `macro`/`endmacro` directive pair creates a genuine hidden, macro-flagged
//! buffer instead of the in-memory stand-in `core_macro`'s own tests use.

use core_macro::{MacroHost, ScriptValue, preprocess};
use core_state::{BufferFlags, BufferManager, FindFlags};
use core_status::{EdResult, Status};
use core_text::{Point, ensure_insertable, insert_chars, insert_newline};

/// `MacroHost` implementation backed by a `BufferManager`: `begin_macro`
/// creates (or clears and reuses) a uniquified, hidden, `MACRO`-flagged
/// buffer named after the invocation; `append_line`/`finish_macro` write
/// its salted body straight through `core_text`'s line-store API, exactly
/// as any other buffer edit would.
pub struct EditorMacroHost<'a> {
    buffers: &'a mut BufferManager,
}

impl<'a> EditorMacroHost<'a> {
    pub fn new(buffers: &'a mut BufferManager) -> Self {
        Self { buffers }
    }
}

impl MacroHost for EditorMacroHost<'_> {
    type Handle = usize;

    fn begin_macro(&mut self, name: &str, arg_count: Option<i64>) -> EdResult<Self::Handle> {
        // `UNIQUIFY` always allocates a brand new buffer, so it starts empty.
        let idx = self.buffers.find(name, FindFlags::CREATE | FindFlags::UNIQUIFY)?;
        let buf = self.buffers.buffer_mut(idx)?;
        buf.flags.insert(BufferFlags::HIDDEN | BufferFlags::MACRO);
        buf.macro_arg_count = arg_count.map(|n| n.max(0) as u32);
        Ok(idx)
    }

    fn append_line(&mut self, handle: &Self::Handle, text: &str) {
        let Ok(buf) = self.buffers.buffer_mut(*handle) else { return };
        let mut point = if buf.store.is_empty() {
            Point::new(buf.store.header(), 0)
        } else {
            let last = buf.store.last();
            Point::new(last, buf.store.len(last))
        };
        if !buf.store.is_empty() {
            let _ = insert_newline(&mut buf.store, &mut point);
        }
        ensure_insertable(&mut buf.store, &mut point);
        let _ = insert_chars(&mut buf.store, &mut point, text.as_bytes());
    }

    fn finish_macro(&mut self, _handle: Self::Handle) {}
}

/// Runs the macro stored in buffer `idx` to completion, guarded by
/// `max_recursion` and `max_loop` (§4.I / §5).
///
/// The executing buffer's line store is briefly checked out (taken, run
/// against, then restored) rather than borrowed in place: `host` needs
/// `&mut BufferManager` to create macro-invocation buffers of its own, which
/// would otherwise alias the store `execute` is reading. `exec_count`
/// (bumped for the duration, the same counter `core_macro::RecursionGuard`
/// manages for simpler embeddings) keeps `BufferManager::delete` from
/// pulling the buffer out from under it meanwhile.
pub fn run_macro<E: core_macro::ExprEval>(
    buffers: &mut BufferManager,
    idx: usize,
    eval: &mut E,
    max_recursion: usize,
    max_loop: usize,
) -> EdResult<ScriptValue> {
    {
        let buf = buffers.buffer_mut(idx)?;
        if max_recursion > 0 && buf.exec_count as usize >= max_recursion {
            return Err(Status::failure(format!("macro recursion limit ({max_recursion}) exceeded")));
        }
        buf.exec_count += 1;
    }

    let store = std::mem::take(&mut buffers.buffer_mut(idx)?.store);
    let result = match preprocess(&store) {
        Ok(compiled) => {
            let mut host = EditorMacroHost::new(buffers);
            core_macro::execute(&store, &compiled, eval, &mut host, max_loop)
        }
        Err(e) => Err(e),
    };

    if let Ok(buf) = buffers.buffer_mut(idx) {
        buf.store = store;
        buf.exec_count -= 1;
    }
    result
}
