//! Directive recognition (§4.I): a line's directive is a lower-case
//! identifier at the start of the line's first non-whitespace portion.

/// Marks the rest of a script line as a comment, exactly like a blank line.
pub const COMMENT_CHAR: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Macro,
    EndMacro,
    If,
    Elsif,
    Else,
    Endif,
    While,
    Until,
    Loop,
    Break,
    Next,
    EndLoop,
    Return,
    Force,
}

impl Directive {
    const ALL: [(Directive, &'static str); 14] = [
        (Directive::Macro, "macro"),
        (Directive::EndMacro, "endmacro"),
        (Directive::If, "if"),
        (Directive::Elsif, "elsif"),
        (Directive::Else, "else"),
        (Directive::Endif, "endif"),
        (Directive::While, "while"),
        (Directive::Until, "until"),
        (Directive::Loop, "loop"),
        (Directive::Break, "break"),
        (Directive::Next, "next"),
        (Directive::EndLoop, "endloop"),
        (Directive::Return, "return"),
        (Directive::Force, "force"),
    ];

    pub fn is_loop_opener(self) -> bool {
        matches!(self, Directive::While | Directive::Until | Directive::Loop)
    }

    pub fn is_break_or_next(self) -> bool {
        matches!(self, Directive::Break | Directive::Next)
    }
}

/// Whether a line is blank or a comment once leading whitespace is skipped
/// (possibly after a leading hard tab carried over from a stored macro body).
pub fn is_blank_or_comment(line: &str) -> bool {
    match line.trim_start().chars().next() {
        None => true,
        Some(c) => c == COMMENT_CHAR,
    }
}

/// Split a script line into its directive (if recognised) and the remaining
/// text after it, trimmed of leading whitespace. A keyword only counts as a
/// directive if it's followed by a word boundary, so `whiled` isn't parsed
/// as `while`.
pub fn split_directive(line: &str) -> (Option<Directive>, &str) {
    let trimmed = line.trim_start();
    for (directive, keyword) in Directive::ALL {
        if let Some(rest) = trimmed.strip_prefix(keyword) {
            let boundary = rest.as_bytes().first().is_none_or(|b| !b.is_ascii_alphanumeric() && *b != b'_');
            if boundary {
                return (Some(directive), rest.trim_start());
            }
        }
    }
    (None, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_keyword_at_line_start() {
        let (d, rest) = split_directive("  while $i < 10");
        assert_eq!(d, Some(Directive::While));
        assert_eq!(rest, "$i < 10");
    }

    #[test]
    fn rejects_keyword_prefix_of_a_longer_identifier() {
        let (d, rest) = split_directive("whiled = 1");
        assert_eq!(d, None);
        assert_eq!(rest, "whiled = 1");
    }

    #[test]
    fn blank_and_comment_lines_are_recognised() {
        assert!(is_blank_or_comment(""));
        assert!(is_blank_or_comment("   "));
        assert!(is_blank_or_comment("  # a note"));
        assert!(!is_blank_or_comment("  x = 1"));
    }
}
