//! Binds the interactive query-replace loop (§4.G) to a real buffer: runs
//! `core_search::query_replace` against the buffer's point, then applies
//! the "dot-at-original safety" rule — if point ended up somewhere other
//! than where it started, the work mark records the original spot.

use core_search::{QueryReplaceOutcome, ReplPat, ReplacePrompt, SearchPattern};
use core_state::Buffer;
use core_status::EdResult;

use crate::kill::WORK_MARK;

/// Runs query-replace starting from the buffer's current point. On return,
/// `buffer.point` is wherever the loop left off (§4.G), and if that isn't
/// where it started, the work mark (`W`) is set to the original position.
pub fn query_replace_at_point(
    buffer: &mut Buffer,
    pattern: &SearchPattern,
    replacement: &ReplPat,
    prompt: &mut dyn ReplacePrompt,
) -> EdResult<QueryReplaceOutcome> {
    let outcome = core_search::query_replace(&mut buffer.store, buffer.point, pattern, replacement, prompt)?;
    buffer.point = outcome.point;
    if outcome.replacements > 0 {
        buffer.mark_changed();
    }
    if let Some(original) = outcome.moved_from {
        buffer.marks.set(WORK_MARK, original);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_search::{Decision, compile_replacement};
    use core_text::{Point, insert_chars};

    struct AutoYes;
    impl ReplacePrompt for AutoYes {
        fn decide(&mut self, _matched: &[u8], _replacement: &[u8]) -> Decision {
            Decision::Replace
        }
        fn not_found(&mut self) {}
    }

    #[test]
    fn replaces_every_match_and_reports_count() {
        let mut buf = Buffer::new("scratch", None);
        let mut point = buf.point;
        insert_chars(&mut buf.store, &mut point, b"aaa bbb aaa").unwrap();
        buf.point = Point::new(buf.store.first(), 0);

        let pattern = SearchPattern::Plain(core_search::Pattern::compile(b"aaa", true));
        let replacement = compile_replacement(b"xxx").unwrap();
        let mut prompt = AutoYes;
        let outcome = query_replace_at_point(&mut buf, &pattern, &replacement, &mut prompt).unwrap();

        assert_eq!(outcome.replacements, 2);
        let text = String::from_utf8(buf.store.bytes(buf.store.first()).to_vec()).unwrap();
        assert_eq!(text, "xxx bbb xxx");
    }

    /// §8 scenario 6: `"aaa bbb aaa"`, replace `aaa`→`xxx`, keystrokes
    /// `y, y, u, q` — replace, replace, undo the second, then stop. Point
    /// ends up at the undone match rather than back at the origin, so the
    /// work mark records where the operation started.
    #[test]
    fn stopping_after_an_undo_sets_the_work_mark_to_the_origin() {
        let mut buf = Buffer::new("scratch", None);
        let mut point = buf.point;
        insert_chars(&mut buf.store, &mut point, b"aaa bbb aaa").unwrap();
        buf.point = Point::new(buf.store.first(), 0);
        let origin = buf.point;

        struct Scripted(std::collections::VecDeque<Decision>);
        impl ReplacePrompt for Scripted {
            fn decide(&mut self, _matched: &[u8], _replacement: &[u8]) -> Decision {
                self.0.pop_front().unwrap_or(Decision::Abort)
            }
            fn not_found(&mut self) {}
        }

        let pattern = SearchPattern::Plain(core_search::Pattern::compile(b"aaa", true));
        let replacement = compile_replacement(b"xxx").unwrap();
        let mut prompt = Scripted([Decision::Replace, Decision::Replace, Decision::Undo, Decision::Stop].into());
        let outcome = query_replace_at_point(&mut buf, &pattern, &replacement, &mut prompt).unwrap();

        assert_eq!(outcome.replacements, 1);
        let text = String::from_utf8(buf.store.bytes(buf.store.first()).to_vec()).unwrap();
        assert_eq!(text, "xxx bbb aaa");
        assert_ne!(buf.point, origin);
        assert_eq!(buf.marks.get(WORK_MARK).map(|m| m.point()), Some(origin));
    }
}
