//! Execute pass (§4.I): walks a preprocessed macro buffer with an explicit
//! line pointer and a bounded level stack, dispatching directives and
//! falling back to the (external) expression evaluator for everything else.

use core_status::{EdResult, Status};
use core_text::{LineId, LineStore};

use crate::directive::{Directive, is_blank_or_comment, split_directive};
use crate::preprocess::CompiledMacro;
use crate::value::{ExprEval, ScriptValue};

/// Bound on `if`/`while`/`until`/`loop` nesting depth within one execution,
/// matching the original engine's fixed-size level table.
const MAX_LEVELS: usize = 64;

/// Side channel for the `macro <name>[, argct]` ... `endmacro` directive
/// pair: while "salting," every intervening line (interpreted or not) is
/// accumulated verbatim into a new hidden, macro-flagged buffer instead of
/// being executed.
pub trait MacroHost {
    type Handle;

    fn begin_macro(&mut self, name: &str, arg_count: Option<i64>) -> EdResult<Self::Handle>;
    fn append_line(&mut self, handle: &Self::Handle, text: &str);
    fn finish_macro(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy)]
struct Level {
    live: bool,
    loop_spawn: bool,
    if_was_true: bool,
    else_seen: bool,
    loop_count: usize,
}

impl Level {
    const TOP: Level = Level { live: true, loop_spawn: false, if_was_true: false, else_seen: false, loop_count: 0 };
}

fn line_number(store: &LineStore, target: LineId) -> usize {
    let mut n = 1;
    let mut cur = store.first();
    while !store.is_header(cur) && cur != target {
        n += 1;
        cur = store.next(cur);
    }
    n
}

fn misplaced(store: &LineStore, at: LineId, name: &str) -> Status {
    Status::script_error(format!("misplaced '{name}' directive"), line_number(store, at))
}

fn boundary_bug(store: &LineStore, at: LineId) -> Status {
    Status::Fatal(format!("script loop boundary line not found (line {})", line_number(store, at)))
}

fn too_deep(store: &LineStore, at: LineId) -> Status {
    Status::script_error(format!("if/loop nesting level ({}) too deep", MAX_LEVELS), line_number(store, at))
}

fn rewind_to_loop_level(levels: &mut Vec<Level>) -> EdResult<()> {
    while levels.len() > 1 && !levels.last().unwrap().loop_spawn {
        levels.pop();
    }
    if levels.len() == 1 {
        return Err(Status::Fatal("prior loop execution level not found while rewinding stack".into()));
    }
    Ok(())
}

fn strip_leading_tab(line: &str) -> &str {
    line.strip_prefix('\t').unwrap_or(line)
}

fn parse_macro_header(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once(',') {
        Some((name, argct)) => (name.trim(), Some(argct.trim())),
        None => (rest.trim(), None),
    }
}

/// Run a preprocessed macro buffer to completion, returning its `return`
/// value (or `Nil` if it falls off the end without one).
pub fn execute<E: ExprEval, H: MacroHost>(
    store: &LineStore,
    compiled: &CompiledMacro,
    eval: &mut E,
    host: &mut H,
    max_loop: usize,
) -> EdResult<ScriptValue> {
    use crate::directive::COMMENT_CHAR;

    let mut levels: Vec<Level> = vec![Level::TOP];
    let mut break_level: usize = 0;
    let mut salt: Option<(H::Handle, usize)> = None;
    let mut pc = store.first();
    let mut result = ScriptValue::Nil;

    while !store.is_header(pc) {
        let raw = String::from_utf8_lossy(store.bytes(pc)).into_owned();

        if let Some((handle, depth)) = salt.as_mut() {
            let (directive, _) = split_directive(&raw);
            match directive {
                Some(Directive::Macro) => {
                    *depth += 1;
                    host.append_line(handle, strip_leading_tab(&raw));
                }
                Some(Directive::EndMacro) => {
                    *depth -= 1;
                    if *depth == 0 {
                        let (handle, _) = salt.take().unwrap();
                        host.finish_macro(handle);
                    } else {
                        host.append_line(handle, strip_leading_tab(&raw));
                    }
                }
                _ => host.append_line(handle, strip_leading_tab(&raw)),
            }
            pc = store.next(pc);
            continue;
        }

        let (directive, rest) = split_directive(&raw);
        let top_live = levels.last().unwrap().live;

        let Some(directive) = directive else {
            if top_live && !is_blank_or_comment(&raw) {
                result = eval.eval_statement(raw.trim())?;
            }
            pc = store.next(pc);
            continue;
        };

        match directive {
            Directive::If => {
                if levels.len() >= MAX_LEVELS {
                    return Err(too_deep(store, pc));
                }
                let live = top_live && eval.eval_bool(rest)?;
                levels.push(Level { live, if_was_true: live, ..Level::TOP });
                pc = store.next(pc);
            }
            Directive::Elsif => {
                let len = levels.len();
                if len < 2 || levels[len - 1].loop_spawn || levels[len - 1].else_seen {
                    return Err(misplaced(store, pc, "elsif"));
                }
                let parent_live = levels[len - 2].live;
                if parent_live && !levels[len - 1].live && !levels[len - 1].if_was_true {
                    let v = eval.eval_bool(rest)?;
                    levels[len - 1].live = v;
                    if v {
                        levels[len - 1].if_was_true = true;
                    }
                } else {
                    levels[len - 1].live = false;
                }
                pc = store.next(pc);
            }
            Directive::Else => {
                let len = levels.len();
                if len < 2 || levels[len - 1].loop_spawn || levels[len - 1].else_seen {
                    return Err(misplaced(store, pc, "else"));
                }
                let parent_live = levels[len - 2].live;
                levels[len - 1].live = parent_live && !levels[len - 1].if_was_true;
                levels[len - 1].else_seen = true;
                pc = store.next(pc);
            }
            Directive::Endif => {
                if levels.len() < 2 || levels.last().unwrap().loop_spawn {
                    return Err(misplaced(store, pc, "endif"));
                }
                levels.pop();
                pc = store.next(pc);
            }
            Directive::While | Directive::Until | Directive::Loop => {
                let mut entered = false;
                if top_live {
                    let enter = match directive {
                        Directive::Loop => true,
                        Directive::While => eval.eval_bool(rest)?,
                        Directive::Until => !eval.eval_bool(rest)?,
                        _ => unreachable!(),
                    };
                    if enter {
                        if levels.len() >= MAX_LEVELS {
                            return Err(too_deep(store, pc));
                        }
                        levels.push(Level { loop_spawn: true, ..Level::TOP });
                        pc = store.next(pc);
                        entered = true;
                    }
                }
                if !entered {
                    let jump = compiled.jump_for(pc).ok_or_else(|| boundary_bug(store, pc))?;
                    levels.last_mut().unwrap().loop_count = 0;
                    pc = store.next(jump);
                }
            }
            Directive::Break | Directive::Next => {
                if !top_live {
                    pc = store.next(pc);
                    continue;
                }
                if directive == Directive::Break {
                    break_level = if rest.trim().is_empty() {
                        1
                    } else {
                        let n = eval.eval_int(rest)?;
                        if n <= 0 {
                            return Err(Status::failure(format!("'break' level '{n}' must be 1 or greater")));
                        }
                        n as usize
                    };
                }
                let jump = compiled.jump_for(pc).ok_or_else(|| boundary_bug(store, pc))?;
                rewind_to_loop_level(&mut levels)?;
                pc = jump;
            }
            Directive::EndLoop => {
                if break_level == 0 {
                    if levels.len() < 2 || !levels.last().unwrap().loop_spawn {
                        return Err(misplaced(store, pc, "endloop"));
                    }
                    levels.pop();
                    let current = levels.last_mut().unwrap();
                    current.loop_count += 1;
                    if max_loop > 0 && current.loop_count > max_loop {
                        return Err(Status::failure(format!("maximum number of loop iterations ({max_loop}) exceeded")));
                    }
                }
                let (opener_mark, parent_endloop) = compiled.opener_for(pc).ok_or_else(|| boundary_bug(store, pc))?;
                if break_level > 0 {
                    break_level -= 1;
                    if break_level > 0 {
                        let parent = parent_endloop.ok_or_else(|| {
                            Status::failure(format!("too many break levels ({break_level} short) from inner 'break'"))
                        })?;
                        levels.pop();
                        rewind_to_loop_level(&mut levels)?;
                        levels.last_mut().unwrap().loop_count = 0;
                        pc = parent;
                    } else {
                        levels.pop();
                        levels.last_mut().unwrap().loop_count = 0;
                        pc = store.next(pc);
                    }
                } else {
                    pc = opener_mark;
                }
            }
            Directive::Return => {
                if top_live {
                    result = if rest.trim().is_empty() { ScriptValue::Nil } else { eval.eval_value(rest)? };
                    break;
                }
                pc = store.next(pc);
            }
            Directive::Force => {
                if top_live {
                    match eval.eval_statement(rest) {
                        Ok(v) => result = v,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(_) => {}
                    }
                }
                pc = store.next(pc);
            }
            Directive::Macro => {
                if top_live {
                    let (name, argct_expr) = parse_macro_header(rest);
                    let arg_count = argct_expr.map(|e| eval.eval_int(e)).transpose()?;
                    let handle = host.begin_macro(name, arg_count)?;
                    host.append_line(&handle, &format!("{COMMENT_CHAR} {name}"));
                    salt = Some((handle, 1));
                }
                pc = store.next(pc);
            }
            Directive::EndMacro => {
                if top_live {
                    return Err(misplaced(store, pc, "endmacro"));
                }
                pc = store.next(pc);
            }
        }
    }

    Ok(result)
}
