//! Macro/script interpreter (§4.I): preprocesses a macro buffer's loop
//! structure once, then executes it against an external expression
//! evaluator. The directive grammar (`if`/`while`/`break`/`endloop`/...) and
//! the recursion guard on `Buffer::exec_count` are owned here; the
//! expression language itself is deliberately out of scope ([`ExprEval`]).

mod directive;
mod execute;
mod preprocess;
mod serialize;
mod value;

pub use directive::{COMMENT_CHAR, Directive, is_blank_or_comment, split_directive};
pub use execute::{MacroHost, execute};
pub use preprocess::{CompiledMacro, preprocess};
pub use serialize::{header_line, parse_header};
pub use value::{ExprEval, ScriptValue};

use core_state::Buffer;
use core_status::{EdResult, Status};

/// Guard a macro invocation with the `max_recursion` limit (§4.I / §5):
/// increments `buffer.exec_count`, failing closed if that would exceed the
/// limit, and hands back a drop guard that decrements it again on any exit
/// path (normal return, `?`, or panic-unwind).
pub struct RecursionGuard<'a> {
    buffer: &'a mut Buffer,
}

impl<'a> RecursionGuard<'a> {
    pub fn enter(buffer: &'a mut Buffer, max_recursion: usize) -> EdResult<Self> {
        if max_recursion > 0 && buffer.exec_count as usize >= max_recursion {
            return Err(Status::failure(format!("macro recursion limit ({max_recursion}) exceeded")));
        }
        buffer.exec_count += 1;
        Ok(Self { buffer })
    }
}

impl Drop for RecursionGuard<'_> {
    fn drop(&mut self) {
        self.buffer.exec_count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{Point, ensure_insertable, insert_chars, insert_newline};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn build(lines: &[&str]) -> core_text::LineStore {
        let mut store = core_text::LineStore::new();
        let mut point = Point::new(store.header(), 0);
        for line in lines {
            ensure_insertable(&mut store, &mut point);
            insert_chars(&mut store, &mut point, line.as_bytes()).unwrap();
            insert_newline(&mut store, &mut point).unwrap();
        }
        store
    }

    /// A tiny stand-in expression evaluator: `$name` reads/writes an integer
    /// variable map, and conditions are just `$name <op> <int>` or a bare
    /// `$name`/literal integer. Enough to drive the interpreter's control
    /// flow in tests without pulling in a real expression grammar.
    struct ToyEval {
        vars: HashMap<String, i64>,
        args: Vec<ScriptValue>,
    }

    impl ToyEval {
        fn new() -> Self {
            Self { vars: HashMap::new(), args: Vec::new() }
        }

        fn resolve(&self, token: &str) -> i64 {
            let token = token.trim();
            if let Some(name) = token.strip_prefix('$') {
                *self.vars.get(name).unwrap_or(&0)
            } else {
                token.parse().unwrap_or(0)
            }
        }
    }

    impl ExprEval for ToyEval {
        fn eval_bool(&mut self, expr: &str) -> EdResult<bool> {
            for op in ["<=", ">=", "==", "<", ">"] {
                if let Some((lhs, rhs)) = expr.split_once(op) {
                    let (l, r) = (self.resolve(lhs), self.resolve(rhs));
                    return Ok(match op {
                        "<=" => l <= r,
                        ">=" => l >= r,
                        "==" => l == r,
                        "<" => l < r,
                        ">" => l > r,
                        _ => unreachable!(),
                    });
                }
            }
            Ok(self.resolve(expr) != 0)
        }

        fn eval_value(&mut self, expr: &str) -> EdResult<ScriptValue> {
            Ok(ScriptValue::Int(self.resolve(expr)))
        }

        fn eval_statement(&mut self, stmt: &str) -> EdResult<ScriptValue> {
            if let Some((name, rhs)) = stmt.split_once("+=") {
                let name = name.trim().trim_start_matches('$').to_string();
                let delta = self.resolve(rhs);
                let v = self.vars.entry(name).or_insert(0);
                *v += delta;
                return Ok(ScriptValue::Int(*v));
            }
            if let Some((name, rhs)) = stmt.split_once('=') {
                let name = name.trim().trim_start_matches('$').to_string();
                let v = self.resolve(rhs);
                self.vars.insert(name, v);
                return Ok(ScriptValue::Int(v));
            }
            Ok(ScriptValue::Nil)
        }

        fn eval_int(&mut self, expr: &str) -> EdResult<i64> {
            Ok(self.resolve(expr))
        }

        fn eval_args(&mut self, expr: &str) -> EdResult<Vec<ScriptValue>> {
            Ok(expr.split(',').map(|s| ScriptValue::Int(self.resolve(s))).collect())
        }

        fn bind_args(&mut self, args: &[ScriptValue]) {
            self.args = args.to_vec();
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        open: HashMap<usize, (String, Option<i64>, Vec<String>)>,
        next_id: usize,
        finished: Rc<RefCell<Vec<(String, Option<i64>, Vec<String>)>>>,
    }

    impl MacroHost for RecordingHost {
        type Handle = usize;

        fn begin_macro(&mut self, name: &str, arg_count: Option<i64>) -> EdResult<Self::Handle> {
            let id = self.next_id;
            self.next_id += 1;
            self.open.insert(id, (name.to_string(), arg_count, Vec::new()));
            Ok(id)
        }

        fn append_line(&mut self, handle: &Self::Handle, text: &str) {
            self.open.get_mut(handle).unwrap().2.push(text.to_string());
        }

        fn finish_macro(&mut self, handle: Self::Handle) {
            let entry = self.open.remove(&handle).unwrap();
            self.finished.borrow_mut().push(entry);
        }
    }

    #[test]
    fn if_else_picks_the_live_branch() {
        let store = build(&["if $x == 1", "$y = 10", "else", "$y = 20", "endif"]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = ToyEval::new();
        eval.vars.insert("x".into(), 1);
        let mut host = RecordingHost::default();
        execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(eval.vars.get("y"), Some(&10));
    }

    #[test]
    fn while_loop_counts_up_to_the_bound() {
        let store = build(&["while $i < 5", "$i += 1", "endloop"]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = ToyEval::new();
        let mut host = RecordingHost::default();
        execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(eval.vars.get("i"), Some(&5));
    }

    #[test]
    fn next_skips_the_rest_of_the_body_but_keeps_looping() {
        let store = build(&["while $i < 5", "$i += 1", "if $i == 3", "next", "endif", "$skipped += 1", "endloop"]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = ToyEval::new();
        let mut host = RecordingHost::default();
        execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(eval.vars.get("i"), Some(&5));
        // Every iteration but the one where next fired increments skipped.
        assert_eq!(eval.vars.get("skipped"), Some(&4));
    }

    #[test]
    fn multi_level_break_escapes_both_loops() {
        let store = build(&[
            "loop",
            "$outer += 1",
            "while $inner < 10",
            "$inner += 1",
            "if $inner == 2",
            "break 2",
            "endif",
            "endloop",
            "endloop",
            "$after = 1",
        ]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = ToyEval::new();
        let mut host = RecordingHost::default();
        execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(eval.vars.get("outer"), Some(&1));
        assert_eq!(eval.vars.get("inner"), Some(&2));
        assert_eq!(eval.vars.get("after"), Some(&1));
    }

    #[test]
    fn return_stops_execution_with_a_value() {
        let store = build(&["$x = 1", "return $x", "$x = 99"]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = ToyEval::new();
        let mut host = RecordingHost::default();
        let result = execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(result, ScriptValue::Int(1));
        assert_eq!(eval.vars.get("x"), Some(&1));
    }

    #[test]
    fn force_swallows_a_non_fatal_failure() {
        struct FailingEval;
        impl ExprEval for FailingEval {
            fn eval_bool(&mut self, _: &str) -> EdResult<bool> {
                Ok(true)
            }
            fn eval_value(&mut self, expr: &str) -> EdResult<ScriptValue> {
                Ok(ScriptValue::Int(expr.trim().parse().unwrap_or(0)))
            }
            fn eval_statement(&mut self, _: &str) -> EdResult<ScriptValue> {
                Err(Status::failure("boom"))
            }
            fn eval_int(&mut self, _: &str) -> EdResult<i64> {
                Ok(0)
            }
            fn eval_args(&mut self, _: &str) -> EdResult<Vec<ScriptValue>> {
                Ok(Vec::new())
            }
            fn bind_args(&mut self, _: &[ScriptValue]) {}
        }

        let store = build(&["force oops", "return 7"]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = FailingEval;
        let mut host = RecordingHost::default();
        let result = execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(result, ScriptValue::Int(7));
    }

    #[test]
    fn macro_directive_salts_its_body_into_a_new_buffer_verbatim() {
        let store = build(&["macro greet, 1", "\t$y = $1", "\tif $y == 0", "\t\treturn", "\tendif", "endmacro", "return 42"]);
        let compiled = preprocess(&store).unwrap();
        let mut eval = ToyEval::new();
        let mut host = RecordingHost::default();
        let result = execute(&store, &compiled, &mut eval, &mut host, 10_000).unwrap();
        assert_eq!(result, ScriptValue::Int(42));

        let finished = host.finished.borrow();
        assert_eq!(finished.len(), 1);
        let (name, argct, lines) = &finished[0];
        assert_eq!(name, "greet");
        assert_eq!(*argct, Some(1));
        // The synthetic header comment, then every body line verbatim minus
        // one leading tab; the nested `if`/`endif` is never interpreted.
        assert_eq!(lines[0], "# greet");
        assert_eq!(lines[1], "$y = $1");
        assert_eq!(lines[2], "if $y == 0");
        assert_eq!(lines[3], "\treturn");
        assert_eq!(lines[4], "endif");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn recursion_guard_trips_at_the_limit() {
        let mut buffer = Buffer::new("scratch", None);
        buffer.exec_count = 2;
        assert!(RecursionGuard::enter(&mut buffer, 2).is_err());
        buffer.exec_count = 1;
        {
            let _guard = RecursionGuard::enter(&mut buffer, 2).unwrap();
            assert_eq!(buffer.exec_count, 2);
        }
        assert_eq!(buffer.exec_count, 1);
    }
}
