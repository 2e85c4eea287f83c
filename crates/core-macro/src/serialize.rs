//! Macro-buffer header serialisation (§6): `<comment-char><macro-prefix-char><name>`,
//! optionally followed by a declared argument count.

use core_state::MACRO_PREFIX_CHAR;

use crate::directive::COMMENT_CHAR;

pub fn header_line(name: &str, arg_count: Option<i64>) -> String {
    match arg_count {
        Some(n) => format!("{COMMENT_CHAR}{MACRO_PREFIX_CHAR}{name} {n}"),
        None => format!("{COMMENT_CHAR}{MACRO_PREFIX_CHAR}{name}"),
    }
}

/// Parses a serialised header line back into `(name, arg_count)`. Returns
/// `None` if `line` isn't a macro header at all.
pub fn parse_header(line: &str) -> Option<(&str, Option<i64>)> {
    let rest = line.strip_prefix(COMMENT_CHAR)?.strip_prefix(MACRO_PREFIX_CHAR)?;
    if let Some((name, argct)) = rest.rsplit_once(' ')
        && let Ok(n) = argct.trim().parse::<i64>()
    {
        return Some((name, Some(n)));
    }
    Some((rest, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_header_with_an_argument_count() {
        let line = header_line("greet", Some(2));
        assert_eq!(line, "#@greet 2");
        assert_eq!(parse_header(&line), Some(("greet", Some(2))));
    }

    #[test]
    fn round_trips_a_header_without_an_argument_count() {
        let line = header_line("greet", None);
        assert_eq!(line, "#@greet");
        assert_eq!(parse_header(&line), Some(("greet", None)));
    }

    #[test]
    fn rejects_a_line_with_no_macro_header() {
        assert_eq!(parse_header("while $i < 10"), None);
    }
}
