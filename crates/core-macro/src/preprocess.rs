//! Preprocess pass (§4.I): a linear scan over a macro buffer's lines that
//! matches every `while`/`until`/`loop`/`break`/`next` to its `endloop`, so
//! the execute pass can jump directly instead of re-scanning. The result is
//! cached on the buffer (by the caller) so a second run is free.

use std::collections::HashMap;

use core_status::{EdResult, Status};
use core_text::{LineId, LineStore};

use crate::directive::{Directive, split_directive};

#[derive(Debug, Clone, Copy)]
struct OpenBlock {
    kind: Directive,
    mark: LineId,
}

#[derive(Debug, Clone, Copy)]
struct ExecBlock {
    kind: Directive,
    mark: LineId,
    jump: LineId,
    /// For loop-opener blocks only: the parent loop's mark, later translated
    /// to the parent's `endloop` line by the post-scan fix-up.
    break_target: Option<LineId>,
}

/// The loop-jump table produced by [`preprocess`]: enough to resolve every
/// `while`/`until`/`loop`/`break`/`next`/`endloop` jump without re-scanning.
#[derive(Debug, Clone, Default)]
pub struct CompiledMacro {
    /// A loop-opener or break/next line's own line, to its matching `endloop`.
    jumps: HashMap<LineId, LineId>,
    /// An `endloop` line, to (its opener's mark, the parent loop's `endloop`).
    openers: HashMap<LineId, (LineId, Option<LineId>)>,
}

impl CompiledMacro {
    pub fn jump_for(&self, mark: LineId) -> Option<LineId> {
        self.jumps.get(&mark).copied()
    }

    pub fn opener_for(&self, endloop: LineId) -> Option<(LineId, Option<LineId>)> {
        self.openers.get(&endloop).copied()
    }
}

pub fn preprocess(store: &LineStore) -> EdResult<CompiledMacro> {
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut exec: Vec<ExecBlock> = Vec::new();
    let mut salt_level: i32 = 0;

    let mut line = store.first();
    while !store.is_header(line) {
        let text = String::from_utf8_lossy(store.bytes(line));
        let (directive, _rest) = split_directive(&text);
        if let Some(d) = directive {
            match d {
                Directive::Macro => salt_level += 1,
                Directive::EndMacro => {
                    salt_level -= 1;
                    if salt_level < 0 {
                        return Err(Status::failure("unmatched 'endmacro' directive"));
                    }
                }
                Directive::While | Directive::Until | Directive::Loop => {
                    open.push(OpenBlock { kind: d, mark: line });
                }
                Directive::Break | Directive::Next => {
                    if !open.iter().any(|b| b.kind.is_loop_opener()) {
                        return Err(Status::failure("'break' or 'next' outside of any loop block"));
                    }
                    open.push(OpenBlock { kind: d, mark: line });
                }
                Directive::EndLoop => {
                    if open.is_empty() {
                        return Err(Status::failure("unmatched 'endloop' directive"));
                    }
                    loop {
                        let Some(block) = open.pop() else {
                            return Err(Status::failure("unmatched 'endloop' directive"));
                        };
                        let is_loop = block.kind.is_loop_opener();
                        let break_target =
                            is_loop.then(|| open.iter().rev().find(|b| b.kind.is_loop_opener()).map(|b| b.mark)).flatten();
                        exec.push(ExecBlock { kind: block.kind, mark: block.mark, jump: line, break_target });
                        if is_loop {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
        line = store.next(line);
    }

    if !open.is_empty() {
        return Err(Status::failure("unmatched 'while'/'until'/'loop' directive"));
    }
    if salt_level > 0 {
        return Err(Status::failure("unmatched 'macro' directive"));
    }

    let mark_to_jump: HashMap<LineId, LineId> = exec.iter().map(|b| (b.mark, b.jump)).collect();
    let mut jumps = HashMap::new();
    let mut openers = HashMap::new();
    for block in &exec {
        jumps.insert(block.mark, block.jump);
        if block.kind.is_loop_opener() {
            let resolved = match block.break_target {
                Some(parent_mark) => {
                    let jump = mark_to_jump
                        .get(&parent_mark)
                        .copied()
                        .ok_or_else(|| Status::failure("parent loop block not found during buffer scan"))?;
                    Some(jump)
                }
                None => None,
            };
            openers.insert(block.jump, (block.mark, resolved));
        }
    }

    Ok(CompiledMacro { jumps, openers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{Point, ensure_insertable, insert_chars, insert_newline};

    fn build(lines: &[&str]) -> LineStore {
        let mut store = LineStore::new();
        let mut point = Point::new(store.header(), 0);
        for line in lines {
            ensure_insertable(&mut store, &mut point);
            insert_chars(&mut store, &mut point, line.as_bytes()).unwrap();
            insert_newline(&mut store, &mut point).unwrap();
        }
        store
    }

    #[test]
    fn matches_a_single_while_loop_to_its_endloop() {
        let store = build(&["while $i < 10", "break", "endloop"]);
        let compiled = preprocess(&store).unwrap();
        let opener = store.first();
        let brk = store.next(opener);
        let endloop = store.next(brk);

        assert_eq!(compiled.jump_for(opener), Some(endloop));
        assert_eq!(compiled.jump_for(brk), Some(endloop));
        assert_eq!(compiled.opener_for(endloop), Some((opener, None)));
    }

    #[test]
    fn nested_loops_wire_up_the_parent_endloop_for_multi_level_break() {
        let store = build(&["loop", "while $j < 3", "break 2", "endloop", "endloop"]);
        let outer = store.first();
        let inner = store.next(outer);
        let brk = store.next(inner);
        let inner_end = store.next(brk);
        let outer_end = store.next(inner_end);

        let compiled = preprocess(&store).unwrap();
        assert_eq!(compiled.jump_for(outer), Some(outer_end));
        assert_eq!(compiled.jump_for(inner), Some(inner_end));
        assert_eq!(compiled.jump_for(brk), Some(inner_end));
        assert_eq!(compiled.opener_for(inner_end), Some((inner, Some(outer_end))));
        assert_eq!(compiled.opener_for(outer_end), Some((outer, None)));
    }

    #[test]
    fn orphan_endloop_is_an_error() {
        let store = build(&["endloop"]);
        assert!(preprocess(&store).is_err());
    }

    #[test]
    fn break_outside_any_loop_is_an_error() {
        let store = build(&["break"]);
        assert!(preprocess(&store).is_err());
    }

    #[test]
    fn unclosed_loop_is_an_error() {
        let store = build(&["while $i < 10"]);
        assert!(preprocess(&store).is_err());
    }
}
