#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Code,
    Str,
    StrEscape,
    LineComment,
    BlockComment,
}

/// Remove `//` and `/* */` comments from JSON-with-comments text.
///
/// Comment markers inside double-quoted strings are left alone. Line comments
/// keep their terminating newline; an unterminated block comment swallows the
/// rest of the input.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut state = Scan::Code;

    while let Some(c) = chars.next() {
        state = match state {
            Scan::Code => match c {
                '"' => {
                    out.push(c);
                    Scan::Str
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    Scan::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    Scan::BlockComment
                }
                _ => {
                    out.push(c);
                    Scan::Code
                }
            },
            Scan::Str => {
                out.push(c);
                match c {
                    '\\' => Scan::StrEscape,
                    '"' => Scan::Code,
                    _ => Scan::Str,
                }
            }
            Scan::StrEscape => {
                out.push(c);
                Scan::Str
            }
            Scan::LineComment => {
                if c == '\n' {
                    out.push(c);
                    Scan::Code
                } else {
                    Scan::LineComment
                }
            }
            Scan::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    Scan::Code
                } else {
                    Scan::BlockComment
                }
            }
        };
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_comments_unchanged() {
        let input = r#"{"a": 1, "b": [true, null]}"#;
        assert_eq!(strip_comments(input), input);
    }

    #[test]
    fn test_line_comment_keeps_newline() {
        assert_eq!(strip_comments("{ // open\n}"), "{ \n}");
    }

    #[test]
    fn test_block_comment_removed() {
        assert_eq!(strip_comments(r#"{"a": /* one */ 1}"#), r#"{"a":  1}"#);
    }

    #[test]
    fn test_multiline_block_comment() {
        assert_eq!(strip_comments("[1, /* two\nlines */ 2]"), "[1,  2]");
    }

    #[test]
    fn test_markers_inside_strings_preserved() {
        let input = r#"{"url": "https://example.test/a//b", "glob": "/* not a comment */"}"#;
        assert_eq!(strip_comments(input), input);
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let input = r#"{"s": "say \"// hi\" now"} // trailing"#;
        assert_eq!(strip_comments(input), r#"{"s": "say \"// hi\" now"} "#);
    }

    #[test]
    fn test_escaped_backslash_before_quote() {
        let input = r#"{"path": "C:\\"} // drive"#;
        assert_eq!(strip_comments(input), r#"{"path": "C:\\"} "#);
    }

    #[test]
    fn test_unterminated_block_comment_swallows_rest() {
        assert_eq!(strip_comments("{\"a\": 1} /* dangling"), "{\"a\": 1} ");
    }

    #[test]
    fn test_lone_slash_kept() {
        assert_eq!(strip_comments("1 / 2"), "1 / 2");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "{ // c\n \"a\": \"//x\" /* y */ }",
            "/*a*//*b*/[1]",
            "\"/*\" // \"*/\"\n2",
            "a/ /*c*/ /b",
        ];
        for input in inputs {
            let once = strip_comments(input);
            assert_eq!(strip_comments(&once), once, "not idempotent for {:?}", input);
        }
    }
}
