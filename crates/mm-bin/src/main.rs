//! Process entry point (§6 / §12): CLI args, logging, terminal lifecycle,
//! and the per-keystroke main loop that drives a [`core_editor::Editor`].
//!
//! The command set bound to keys here is intentionally minimal — enough to
//! exercise every `core-editor` operation end to end (motion, self-insert,
//! kill/yank, window split, search, query-replace, save) — not the full
//! command table / key-binding map, which is an external collaborator this
//! workspace deliberately does not own.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use core_editor::Editor;
use core_search::{Decision, QueryReplaceOutcome, ReplacePrompt, SearchPattern, compile_replacement};
use core_state::{Buffer, DeleteMode};
use core_terminal::{CrosstermBackend, ExtendedKey, KeyMod, TerminalBackend, TerminalGuard};
use core_text::motion;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// A modal, extensible, terminal-based text editor core.
#[derive(Parser, Debug)]
#[command(name = "mm", version, about = "MightEMacs-style editor core")]
struct Args {
    /// File to open at startup. Omit to start with an empty scratch buffer.
    path: Option<PathBuf>,
    /// Configuration file path, overriding discovery of `mm.toml`.
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

/// Installs a file-rotated, non-blocking `tracing` subscriber. Logging to
/// stdout/stderr would corrupt the alternate-screen raw-mode display, so
/// unlike `core_config::init_tracing` (meant for non-interactive callers)
/// the binary always logs to a file.
fn configure_logging() -> WorkerGuard {
    let log_dir = std::path::Path::new(".");
    let file_appender = tracing_appender::rolling::never(log_dir, "mm.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).try_init();
    guard
}

/// Reads `path` into the current (freshly created, empty) buffer, detecting
/// and recording its line delimiter (§11). A file mixing delimiters keeps
/// whichever was seen first; lines are inserted byte-for-byte otherwise.
fn load_file_into_buffer(buf: &mut Buffer, path: &PathBuf) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let delimiter = if content.windows(2).any(|w| w == b"\r\n") {
        "\r\n"
    } else if content.contains(&b'\r') && !content.contains(&b'\n') {
        "\r"
    } else {
        "\n"
    };
    buf.delimiter = delimiter.to_string();

    let mut point = buf.point;
    let mut first = true;
    for raw_line in content.split(|&b| b == b'\n') {
        let line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
        if !first {
            core_text::insert_newline(&mut buf.store, &mut point)?;
        }
        first = false;
        if !line.is_empty() {
            let mut cursor = point;
            core_text::insert_chars(&mut buf.store, &mut cursor, line)?;
            point = cursor;
        }
    }
    buf.point = core_text::Point::new(buf.store.first(), 0);
    buf.filename = Some(path.to_string_lossy().into_owned());
    buf.name = core_state::file_base_name(&path.to_string_lossy());
    Ok(())
}

/// Writes every line in `buf` back out to its `filename`, joined with its
/// recorded delimiter (§11).
fn save_buffer(buf: &Buffer) -> Result<()> {
    let Some(filename) = buf.filename.clone() else {
        warn!(target: "io", "save requested on a buffer with no filename");
        return Ok(());
    };
    let mut out = Vec::new();
    let mut line = buf.store.first();
    while line != buf.store.header() {
        out.extend_from_slice(buf.store.bytes(line));
        out.extend_from_slice(buf.delimiter.as_bytes());
        line = buf.store.next(line);
    }
    fs::write(&filename, out).with_context(|| format!("writing {filename}"))?;
    info!(target: "io", path = %filename, "saved");
    Ok(())
}

/// Temporarily leaves raw mode to read a line of plain text from the
/// terminal (used for the search-pattern / replacement-text prompts). A
/// real command-line minibuffer belongs to the command-table layer this
/// workspace doesn't own; this is the minimal stand-in needed to drive
/// `core_search` interactively.
fn read_prompt_line(backend: &mut CrosstermBackend, label: &str) -> Result<String> {
    backend.leave()?;
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    backend.enter()?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Drives `core_search::ReplacePrompt` from the keyboard, per §4.G's
/// keystroke table (`y`/space replace, `n`/`Del` skip, `!` remainder, `.`
/// replace-and-stop, `u` undo, `q`/Esc stop, Ctrl-G abort).
struct TerminalReplacePrompt<'a> {
    backend: &'a mut CrosstermBackend,
}

impl ReplacePrompt for TerminalReplacePrompt<'_> {
    fn decide(&mut self, _matched: &[u8], _replacement: &[u8]) -> Decision {
        loop {
            let Ok(Some(key)) = self.backend.read_key() else { continue };
            return match key.byte() {
                b'y' | b' ' => Decision::Replace,
                b'n' => Decision::Skip,
                b'!' => Decision::ReplaceRemainder,
                b'.' => Decision::ReplaceAndStop,
                b'u' => Decision::Undo,
                b'q' | 0x1B => Decision::Stop,
                b'G' if key.mods().contains(KeyMod::CTRL) => Decision::Abort,
                _ => continue,
            };
        }
    }

    fn not_found(&mut self) {
        warn!(target: "search", "no more matches");
    }
}

/// One pass of the main loop: read a key, translate it, apply it. Returns
/// `false` once the user has asked to quit.
fn handle_key(editor: &mut Editor, backend: &mut CrosstermBackend, key: ExtendedKey) -> Result<bool> {
    let mods = key.mods();
    if mods.contains(KeyMod::PREFIX1) {
        match key.byte() {
            0 => editor.move_point(|s, p| motion::prev_char(s, p).unwrap_or(p))?, // Up: approximated as prev-char
            1 => editor.move_point(|s, p| motion::next_char(s, p).unwrap_or(p))?, // Down: approximated as next-char
            2 => editor.move_point(|s, p| motion::prev_char(s, p).unwrap_or(p))?, // Left
            3 => editor.move_point(|s, p| motion::next_char(s, p).unwrap_or(p))?, // Right
            _ => {}
        }
        editor.break_yank_chain();
        return Ok(true);
    }

    // Crossterm's Backspace always carries the CTRL flag (see `key::from_crossterm`),
    // so it has to be checked ahead of the Ctrl-command dispatch below.
    if key.byte() == 0x7F {
        editor.rings.delete.prep(false);
        editor.delete_at_point(-1, DeleteMode::Delete).ok();
        editor.break_yank_chain();
        return Ok(true);
    }

    if mods.contains(KeyMod::CTRL) {
        match key.byte() {
            b'Q' => return Ok(false),
            b'S' => {
                let idx = editor.current_buffer_index();
                let buf = editor.buffers.buffer(idx)?;
                save_buffer(buf)?;
            }
            b'K' => {
                let idx = editor.current_buffer_index();
                let buf = editor.buffers.buffer(idx)?;
                let len = buf.store.len(buf.point.line);
                let count = if buf.point.offset < len { (len - buf.point.offset) as isize } else { 1 };
                editor.rings.kill.prep(false);
                editor.delete_at_point(count, DeleteMode::Kill).ok();
                return Ok(true);
            }
            b'Y' => {
                editor.yank_at_point(0)?;
                return Ok(true);
            }
            b'W' => {
                editor.split_window(0)?;
            }
            b'D' => {
                editor.delete_window(0).ok();
            }
            b'F' => {
                let text = read_prompt_line(backend, "search: ")?;
                if !text.is_empty() {
                    run_search(editor, &text)?;
                }
                editor.rings.search.push(text, false);
            }
            b'R' => {
                let pattern_text = read_prompt_line(backend, "query-replace pattern: ")?;
                let replacement_text = read_prompt_line(backend, "replacement: ")?;
                run_query_replace(editor, backend, &pattern_text, &replacement_text)?;
            }
            _ => {}
        }
        editor.break_yank_chain();
        return Ok(true);
    }

    match key.byte() {
        b'\r' => {
            editor.insert_newline_at_point()?;
            editor.break_yank_chain();
        }
        byte if byte.is_ascii_graphic() || byte == b' ' || byte == b'\t' => {
            editor.insert_at_point(byte, 1)?;
            editor.break_yank_chain();
        }
        _ => {}
    }

    Ok(true)
}

fn run_search(editor: &mut Editor, pattern_text: &str) -> Result<()> {
    let idx = editor.current_buffer_index();
    let buf = editor.buffers.buffer_mut(idx)?;
    let pattern = core_search::Pattern::compile(pattern_text.as_bytes(), true);
    match core_search::scan_forward(&buf.store, buf.point, &pattern) {
        Ok((_start, end)) => buf.point = end,
        Err(_) => warn!(target: "search", pattern = pattern_text, "not found"),
    }
    editor.sync_face();
    Ok(())
}

fn run_query_replace(editor: &mut Editor, backend: &mut CrosstermBackend, pattern_text: &str, replacement_text: &str) -> Result<QueryReplaceOutcome> {
    let pattern = SearchPattern::Plain(core_search::Pattern::compile(pattern_text.as_bytes(), true));
    let replacement = compile_replacement(replacement_text.as_bytes())?;
    let mut prompt = TerminalReplacePrompt { backend };
    let outcome = editor.query_replace_at_point(pattern_text, &pattern, replacement_text, &replacement, &mut prompt)?;
    Ok(outcome)
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;

    let mut backend = CrosstermBackend::new();
    let (cols, rows) = backend.size()?;
    let mut editor = Editor::new(config, cols, rows)?;

    if let Some(path) = args.path.as_ref() {
        let idx = editor.current_buffer_index();
        let buf = editor.buffers.buffer_mut(idx)?;
        load_file_into_buffer(buf, path)?;
        editor.sync_face();
    }

    backend.set_title("mm")?;
    let guard: TerminalGuard<'_> = backend.enter_guard()?;
    info!(target: "runtime", "startup");

    let result = (|| -> Result<()> {
        loop {
            editor.redraw(&mut backend)?;
            let Some(key) = backend.read_key()? else { continue };
            if !handle_key(&mut editor, &mut backend, key)? {
                break;
            }
        }
        Ok(())
    })();

    drop(guard);
    result
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_file_through_load_and_save() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "one\r\ntwo\r\nthree").unwrap();

        let mut buf = Buffer::new("scratch", None);
        load_file_into_buffer(&mut buf, &tmp.path().to_path_buf()).unwrap();
        assert_eq!(buf.delimiter, "\r\n");

        let mut line = buf.store.first();
        let mut lines = Vec::new();
        while line != buf.store.header() {
            lines.push(String::from_utf8(buf.store.bytes(line).to_vec()).unwrap());
            line = buf.store.next(line);
        }
        assert_eq!(lines, vec!["one", "two", "three"]);

        buf.filename = Some(tmp.path().to_string_lossy().into_owned());
        save_buffer(&buf).unwrap();
        let roundtripped = fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(roundtripped, "one\r\ntwo\r\nthree\r\n");
    }

    #[test]
    fn lf_only_file_keeps_lf_delimiter() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "a\nb\n").unwrap();
        let mut buf = Buffer::new("scratch", None);
        load_file_into_buffer(&mut buf, &tmp.path().to_path_buf()).unwrap();
        assert_eq!(buf.delimiter, "\n");
    }
}
