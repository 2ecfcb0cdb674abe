//! Text transformations applied to raw provider output
//!
//! Each step is a pure `&str -> String` (or slice) function so it can be
//! tested on its own fixtures. The scanners that need to know whether they
//! are inside a JSON string share `StringTracker`.

/// Tracks whether a character scan is inside a JSON string literal
#[derive(Default)]
struct StringTracker {
    in_string: bool,
    escaped: bool,
}

impl StringTracker {
    /// Feed one character; returns true if the character is structural
    /// (outside any string literal and not a quote itself).
    fn structural(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            false
        } else if c == '"' {
            self.in_string = true;
            false
        } else {
            true
        }
    }
}

/// Remove Markdown code-fence markers (```` ``` ```` with an optional
/// language tag such as `json`).
pub fn strip_code_fences(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        let tag_len: usize = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .map(char::len_utf8)
            .sum();
        rest = &rest[tag_len..];
    }

    out.push_str(rest);
    out
}

/// Remove numeric citation markers such as `[1]` or `[12]`.
pub fn strip_citations(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            let digits = bytes[i + 1..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
            let close = i + 1 + digits;
            if digits > 0 && close < bytes.len() && bytes[close] == b']' {
                out.push_str(&input[last..i]);
                i = close + 1;
                last = i;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&input[last..]);
    out
}

/// Net count of unclosed `{` outside string literals.
pub fn brace_depth(input: &str) -> i64 {
    let mut tracker = StringTracker::default();
    let mut depth = 0i64;
    for c in input.chars() {
        if tracker.structural(c) {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }
    depth
}

/// Slice from the first `{` to the last `}`.
///
/// Returns `None` when the input has no `{`. When the span is missing its
/// closing braces (truncated output) the slice runs to the end of the input
/// so the repair pass can close it.
pub fn slice_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;

    match input.rfind('}') {
        Some(end) if end > start => {
            let candidate = &input[start..=end];
            if brace_depth(candidate) > 0 {
                Some(input[start..].trim_end())
            } else {
                Some(candidate)
            }
        }
        _ => Some(input[start..].trim_end()),
    }
}

/// Replace C0 and C1 control characters with a space.
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .map(|c| match c as u32 {
            0x00..=0x1F | 0x7F..=0x9F => ' ',
            _ => c,
        })
        .collect()
}

/// Clean a decoded string value so it survives another pass through the
/// text steps unchanged: control characters become spaces, fence markers and
/// citation markers are removed until none remain.
pub fn clean_string(input: &str) -> String {
    let mut current = strip_control_chars(input);
    loop {
        let next = strip_citations(&strip_code_fences(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Collapse doubled quote artifacts (`""word""`) into single quotes.
///
/// A pair is only collapsed when it touches an alphanumeric character, so
/// legitimate empty strings (`"key": ""`) survive.
pub fn collapse_doubled_quotes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '"' && chars.get(i + 1) == Some(&'"') {
            let before = i.checked_sub(1).map(|p| chars[p]);
            let after = chars.get(i + 2).copied();
            let touches_word = before.is_some_and(|c| c.is_alphanumeric())
                || after.is_some_and(|c| c.is_alphanumeric());
            if touches_word {
                out.push('"');
                i += 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Close an unterminated string and append the missing `]`/`}` closers in
/// nesting order.
pub fn close_unbalanced(input: &str) -> String {
    let mut tracker = StringTracker::default();
    let mut stack: Vec<char> = Vec::new();

    for c in input.chars() {
        if tracker.structural(c) {
            match c {
                '{' => stack.push('}'),
                '[' => stack.push(']'),
                '}' | ']' => {
                    if stack.last() == Some(&c) {
                        stack.pop();
                    }
                }
                _ => {}
            }
        }
    }

    let mut out = input.trim_end().to_string();
    if tracker.in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Drop commas that directly precede a closing `}` or `]`.
pub fn remove_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut tracker = StringTracker::default();
    let mut out = String::with_capacity(input.len());

    for (i, &c) in chars.iter().enumerate() {
        if tracker.structural(c) && c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}

/// Bounded repair pass run once after a failed strict parse.
pub fn repair(input: &str) -> String {
    let text = collapse_doubled_quotes(input);
    let text = close_unbalanced(&text);
    remove_trailing_commas(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_string_reaches_fixed_point() {
        assert_eq!(clean_string("caf\u{85}e"), "caf e");
        assert_eq!(clean_string("see [1] here"), "see  here");
        assert_eq!(clean_string("[[1]2]"), "");
        assert_eq!(clean_string("run ```rust code"), "run  code");
        assert_eq!(clean_string("plain [a] text"), "plain [a] text");
    }

    #[test]
    fn test_strip_code_fences() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(strip_code_fences(raw), "Here you go:\n\n{\"a\": 1}\n\nThanks");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }

    #[test]
    fn test_strip_citations() {
        assert_eq!(strip_citations("demand is high[1][23]."), "demand is high.");
        assert_eq!(strip_citations("[a] [] [1"), "[a] [] [1");
        assert_eq!(strip_citations("{\"x\": [\"y\"]}"), "{\"x\": [\"y\"]}");
    }

    #[test]
    fn test_slice_object() {
        assert_eq!(slice_object("prose {\"a\":{}} more"), Some("{\"a\":{}}"));
        assert_eq!(slice_object("nothing here"), None);
        assert_eq!(slice_object("} before {\"a\": 1"), Some("{\"a\": 1"));
    }

    #[test]
    fn test_slice_object_keeps_truncated_tail() {
        let truncated = "{\"a\": [{\"b\": 1}], \"c\": [1, 2]";
        assert_eq!(slice_object(truncated), Some(truncated));
    }

    #[test]
    fn test_brace_depth_ignores_strings() {
        assert_eq!(brace_depth("{\"a\": \"{{\"}"), 0);
        assert_eq!(brace_depth("{\"a\": {\"b\": \"}\"}"), 1);
        assert_eq!(brace_depth("{\"a\": \"\\\"{\"}"), 0);
    }

    #[test]
    fn test_strip_control_chars() {
        assert_eq!(strip_control_chars("a\u{0}b\nc\u{85}d\u{7f}"), "a b c d ");
        assert_eq!(strip_control_chars("héllo"), "héllo");
    }

    #[test]
    fn test_collapse_doubled_quotes() {
        assert_eq!(
            collapse_doubled_quotes("{\"a\": \"\"word\"\"}"),
            "{\"a\": \"word\"}"
        );
        assert_eq!(collapse_doubled_quotes("{\"a\": \"\"}"), "{\"a\": \"\"}");
    }

    #[test]
    fn test_close_unbalanced() {
        assert_eq!(close_unbalanced("{\"a\": {\"b\": 1}"), "{\"a\": {\"b\": 1}}");
        assert_eq!(close_unbalanced("{\"a\": [1, {\"b\": 2"), "{\"a\": [1, {\"b\": 2}]}");
        assert_eq!(close_unbalanced("{\"a\": \"cut"), "{\"a\": \"cut\"}");
        assert_eq!(close_unbalanced("{}"), "{}");
    }

    #[test]
    fn test_remove_trailing_commas() {
        assert_eq!(remove_trailing_commas("{\"a\": [1, 2,], }"), "{\"a\": [1, 2] }");
        assert_eq!(remove_trailing_commas("{\"a\": \",}\"}"), "{\"a\": \",}\"}");
    }

    #[test]
    fn test_repair_truncated_with_trailing_comma() {
        let repaired = repair("{\"a\": [1, 2,");
        assert_eq!(repaired, "{\"a\": [1, 2]}");
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }
}
