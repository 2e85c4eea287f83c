//! Search & replace (§4.G): plain-text Boyer-Moore scanning, a small
//! regexp engine compiling to a flat node array, and the replacement
//! machinery (including the interactive query-replace loop) built on top
//! of both.

mod boyer_moore;
mod regex;
mod replace;

pub use boyer_moore::{Pattern, scan_backward, scan_forward};
pub use regex::{Direction, Node, NodeKind, Regex, amatch, mcscan};
pub use replace::{Decision, QueryReplaceOutcome, ReplacePrompt, ReplPat, SearchPattern, compile_replacement, query_replace};
