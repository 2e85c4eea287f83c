//! Replacement and the interactive query-replace loop (§4.G).
//!
//! A replacement spec compiles to a flat sequence of literal runs and group
//! references (`&` for the whole match, `\0`..`\9` for capture groups),
//! mirroring how [`crate::regex`] compiles a search pattern to a flat node
//! list. The query loop itself only decides *what* to do with each match;
//! turning a keystroke into a [`Decision`] (including `?`'s help line and
//! re-prompting) is left to the [`ReplacePrompt`] implementor, the same
//! division of labor `core_render::Sink` uses for terminal output.

use core_status::{EdResult, Status};
use core_text::motion::{current_byte, next_char};
use core_text::{LineStore, Point, delete_span, insert_chars};

use crate::boyer_moore;
use crate::regex::{self, Direction, Regex};

/// A search pattern in either compiled form, scanned through a single
/// interface by [`query_replace`].
#[derive(Debug, Clone)]
pub enum SearchPattern {
    Plain(boyer_moore::Pattern),
    Regex(Regex),
}

impl SearchPattern {
    /// Find the next match from `from` in `dir`. `groups[0]` is always the
    /// whole match; plain patterns never populate `groups[1..]`.
    pub fn find(&self, store: &LineStore, from: Point, dir: Direction) -> EdResult<Vec<Option<(Point, Point)>>> {
        match self {
            SearchPattern::Plain(pattern) => {
                let span = match dir {
                    Direction::Forward => boyer_moore::scan_forward(store, from, pattern)?,
                    Direction::Backward => boyer_moore::scan_backward(store, from, pattern)?,
                };
                Ok(vec![Some(span)])
            }
            SearchPattern::Regex(regex) => regex::mcscan(store, from, regex, dir),
        }
    }
}

#[derive(Debug, Clone)]
enum ReplPiece {
    Literal(Vec<u8>),
    Group(usize),
}

/// A compiled replacement (`newReplPat`): literal runs interleaved with
/// group references.
#[derive(Debug, Clone)]
pub struct ReplPat(Vec<ReplPiece>);

/// Compiles a replacement spec: `&` is the whole match, `\0`..`\9` are
/// group references (`\0` is also the whole match), `\` followed by
/// anything else is that character literal, and everything left over is
/// copied through as-is.
pub fn compile_replacement(spec: &[u8]) -> EdResult<ReplPat> {
    let mut pieces = Vec::new();
    let mut literal = Vec::new();
    let mut i = 0;
    while i < spec.len() {
        match spec[i] {
            b'&' => {
                if !literal.is_empty() {
                    pieces.push(ReplPiece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(ReplPiece::Group(0));
                i += 1;
            }
            b'\\' if spec.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                if !literal.is_empty() {
                    pieces.push(ReplPiece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(ReplPiece::Group((spec[i + 1] - b'0') as usize));
                i += 2;
            }
            b'\\' if i + 1 < spec.len() => {
                literal.push(spec[i + 1]);
                i += 2;
            }
            b => {
                literal.push(b);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        pieces.push(ReplPiece::Literal(literal));
    }
    Ok(ReplPat(pieces))
}

fn read_span(store: &LineStore, start: Point, end: Point) -> Vec<u8> {
    let mut out = Vec::new();
    let mut p = start;
    while p != end {
        let Some(b) = current_byte(store, p) else { break };
        out.push(b);
        let Some(next) = next_char(store, p) else { break };
        p = next;
    }
    out
}

impl ReplPat {
    pub fn expand(&self, store: &LineStore, groups: &[Option<(Point, Point)>]) -> Vec<u8> {
        let mut out = Vec::new();
        for piece in &self.0 {
            match piece {
                ReplPiece::Literal(bytes) => out.extend_from_slice(bytes),
                ReplPiece::Group(n) => {
                    if let Some(Some((s, e))) = groups.get(*n) {
                        out.extend(read_span(store, *s, *e));
                    }
                }
            }
        }
        out
    }
}

/// What to do with the match just shown. `?` (help) and re-prompting after
/// it are handled inside the [`ReplacePrompt`] implementor; this is only
/// the decision that comes out the other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Replace,
    ReplaceAndStop,
    Skip,
    ReplaceRemainder,
    Undo,
    Stop,
    StopAndRestore,
    Abort,
}

pub trait ReplacePrompt {
    /// Called once per match that needs confirmation (never called once
    /// `!` has switched the loop silent).
    fn decide(&mut self, matched: &[u8], replacement: &[u8]) -> Decision;
    /// Called when the pattern can no longer be found.
    fn not_found(&mut self);
}

#[derive(Debug, Clone, Copy)]
pub struct QueryReplaceOutcome {
    pub replacements: usize,
    pub point: Point,
    /// Set when the final point differs from where the operation started,
    /// so the caller can drop a work mark there and report it moved.
    pub moved_from: Option<Point>,
}

/// The query-replace loop (§4.G). Scans forward from `start`, replacing or
/// skipping each match per `prompt`'s decisions, until the pattern is no
/// longer found or the user stops it.
pub fn query_replace(
    store: &mut LineStore,
    start: Point,
    pattern: &SearchPattern,
    replacement: &ReplPat,
    prompt: &mut dyn ReplacePrompt,
) -> EdResult<QueryReplaceOutcome> {
    let original = start;
    let mut point = start;
    let mut replacements = 0usize;
    let mut silent = false;
    let mut last_empty_at: Option<Point> = None;
    let mut undo_stack: Vec<(Point, Point, Vec<u8>)> = Vec::new();

    let final_point = loop {
        let groups = match pattern.find(store, point, Direction::Forward) {
            Ok(groups) => groups,
            Err(Status::NotFound) => {
                prompt.not_found();
                break point;
            }
            Err(e) => return Err(e),
        };
        let (mstart, mend) = groups[0].expect("group 0 is always set on a successful scan");

        if mstart == mend {
            if last_empty_at == Some(mstart) {
                return Err(Status::failure("replacement pattern matched an empty string twice in a row"));
            }
            last_empty_at = Some(mstart);
        } else {
            last_empty_at = None;
        }

        let repl_bytes = replacement.expand(store, &groups);
        let decision = if silent {
            Decision::Replace
        } else {
            let matched = read_span(store, mstart, mend);
            prompt.decide(&matched, &repl_bytes)
        };

        match decision {
            Decision::Skip => {
                point = mend;
                continue;
            }
            Decision::Stop => break mstart,
            Decision::StopAndRestore => break original,
            Decision::Abort => return Err(Status::failure("query-replace aborted")),
            Decision::Undo => {
                if let Some((s, e, removed)) = undo_stack.pop() {
                    delete_span(store, s, e)?;
                    let mut p = s;
                    insert_chars(store, &mut p, &removed)?;
                    replacements = replacements.saturating_sub(1);
                    point = s;
                }
                continue;
            }
            Decision::ReplaceRemainder => silent = true,
            Decision::Replace | Decision::ReplaceAndStop => {}
        }

        let (removed_bytes, _fixups) = delete_span(store, mstart, mend)?;
        let mut inserted_at = mstart;
        insert_chars(store, &mut inserted_at, &repl_bytes)?;
        undo_stack.push((mstart, inserted_at, removed_bytes));
        replacements += 1;
        point = inserted_at;

        if decision == Decision::ReplaceAndStop {
            break point;
        }
    };

    let moved_from = (final_point != original).then_some(original);
    Ok(QueryReplaceOutcome { replacements, point: final_point, moved_from })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::insert_chars as ic;

    fn seeded(text: &str) -> LineStore {
        let mut store = LineStore::new();
        let mut point = Point::new(store.header(), 0);
        ic(&mut store, &mut point, text.as_bytes()).unwrap();
        store
    }

    fn line_text(store: &LineStore) -> String {
        String::from_utf8(store.bytes(store.first()).to_vec()).unwrap()
    }

    #[test]
    fn compiles_ampersand_and_group_references() {
        let pat = compile_replacement(b"[&]=\\1").unwrap();
        assert_eq!(pat.0.len(), 3);
    }

    struct Scripted {
        decisions: std::collections::VecDeque<Decision>,
    }

    impl ReplacePrompt for Scripted {
        fn decide(&mut self, _matched: &[u8], _replacement: &[u8]) -> Decision {
            self.decisions.pop_front().unwrap_or(Decision::Abort)
        }
        fn not_found(&mut self) {}
    }

    #[test]
    fn replacing_every_match_with_y() {
        let mut store = seeded("foo bar foo");
        let pattern = SearchPattern::Plain(boyer_moore::Pattern::compile(b"foo", true));
        let repl = compile_replacement(b"baz").unwrap();
        let mut prompt = Scripted { decisions: [Decision::Replace, Decision::Replace].into() };
        let outcome = query_replace(&mut store, Point::new(store.first(), 0), &pattern, &repl, &mut prompt).unwrap();
        assert_eq!(outcome.replacements, 2);
        assert_eq!(line_text(&store), "baz bar baz");
    }

    #[test]
    fn skip_leaves_a_match_untouched() {
        let mut store = seeded("foo bar foo");
        let pattern = SearchPattern::Plain(boyer_moore::Pattern::compile(b"foo", true));
        let repl = compile_replacement(b"baz").unwrap();
        let mut prompt = Scripted { decisions: [Decision::Skip, Decision::Replace].into() };
        let outcome = query_replace(&mut store, Point::new(store.first(), 0), &pattern, &repl, &mut prompt).unwrap();
        assert_eq!(outcome.replacements, 1);
        assert_eq!(line_text(&store), "foo bar baz");
    }

    #[test]
    fn bang_replaces_remainder_without_prompting() {
        let mut store = seeded("foo foo foo");
        let pattern = SearchPattern::Plain(boyer_moore::Pattern::compile(b"foo", true));
        let repl = compile_replacement(b"x").unwrap();
        let mut prompt = Scripted { decisions: [Decision::ReplaceRemainder].into() };
        let outcome = query_replace(&mut store, Point::new(store.first(), 0), &pattern, &repl, &mut prompt).unwrap();
        assert_eq!(outcome.replacements, 3);
        assert_eq!(line_text(&store), "x x x");
    }

    #[test]
    fn stop_and_restore_reports_the_original_point() {
        let mut store = seeded("foo bar foo");
        let pattern = SearchPattern::Plain(boyer_moore::Pattern::compile(b"foo", true));
        let repl = compile_replacement(b"baz").unwrap();
        let mut prompt = Scripted { decisions: [Decision::Replace, Decision::StopAndRestore].into() };
        let start = Point::new(store.first(), 0);
        let outcome = query_replace(&mut store, start, &pattern, &repl, &mut prompt).unwrap();
        assert_eq!(outcome.point, start);
        assert_eq!(outcome.moved_from, None);
    }

    #[test]
    fn undo_restores_the_replaced_text_and_reprompts() {
        let mut store = seeded("foo bar");
        let pattern = SearchPattern::Plain(boyer_moore::Pattern::compile(b"foo", true));
        let repl = compile_replacement(b"baz").unwrap();
        let mut prompt = Scripted { decisions: [Decision::Replace, Decision::Undo, Decision::Skip].into() };
        let outcome = query_replace(&mut store, Point::new(store.first(), 0), &pattern, &repl, &mut prompt).unwrap();
        assert_eq!(outcome.replacements, 0);
        assert_eq!(line_text(&store), "foo bar");
    }

    #[test]
    fn empty_match_twice_in_a_row_aborts() {
        let mut store = seeded("ab");
        let pattern = SearchPattern::Regex(Regex::compile(b"x*").unwrap());
        let repl = compile_replacement(b"").unwrap();
        let mut prompt = Scripted { decisions: [Decision::Skip, Decision::Skip, Decision::Skip].into() };
        let result = query_replace(&mut store, Point::new(store.first(), 0), &pattern, &repl, &mut prompt);
        assert!(result.is_err());
    }
}
