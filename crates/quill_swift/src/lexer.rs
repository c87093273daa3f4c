//! Line-level lexing helpers for the declaration scanner.

/// Strips comments and string literal contents from source lines.
///
/// State carries across lines so block comments and multi-line string
/// literals are handled. String delimiters are kept, their contents are
/// dropped, so braces inside strings never reach the caller.
#[derive(Debug, Default)]
pub(crate) struct CodeFilter {
    in_block_comment: bool,
    in_multiline_string: bool,
}

impl CodeFilter {
    /// Returns `true` unless a block comment or multi-line string is open.
    pub(crate) fn at_code(&self) -> bool {
        !self.in_block_comment && !self.in_multiline_string
    }

    /// Returns the code of `line` with comments and string contents removed.
    pub(crate) fn code_of(&mut self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let at = |i: usize| chars.get(i).copied();
        let triple = |i: usize| at(i) == Some('"') && at(i + 1) == Some('"') && at(i + 2) == Some('"');

        let mut out = String::with_capacity(line.len());
        let mut i = 0;
        while i < chars.len() {
            if self.in_block_comment {
                if chars[i] == '*' && at(i + 1) == Some('/') {
                    self.in_block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }
            if self.in_multiline_string {
                if triple(i) {
                    self.in_multiline_string = false;
                    out.push_str("\"\"\"");
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }
            match chars[i] {
                '/' if at(i + 1) == Some('/') => break,
                '/' if at(i + 1) == Some('*') => {
                    self.in_block_comment = true;
                    i += 2;
                }
                '"' if triple(i) => {
                    self.in_multiline_string = true;
                    out.push_str("\"\"\"");
                    i += 3;
                }
                '"' => {
                    out.push('"');
                    i += 1;
                    while i < chars.len() && chars[i] != '"' {
                        i += if chars[i] == '\\' { 2 } else { 1 };
                    }
                    out.push('"');
                    i += 1;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }
}

/// Returns `true` for characters that may appear in an identifier.
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits a leading identifier (backticks removed) off `s`.
pub(crate) fn take_ident(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix('`') {
        if let Some(end) = rest.find('`') {
            return (&rest[..end], &rest[end + 1..]);
        }
    }
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// Returns `true` if `s` contains `word` as a whole identifier.
pub(crate) fn contains_word(s: &str, word: &str) -> bool {
    s.split(|c: char| !is_ident_char(c)).any(|t| t == word)
}

/// Splits `s` at top-level commas, ignoring commas nested in brackets.
pub(crate) fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = None;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '<' => depth += 1,
            '>' if prev == Some('-') => {}
            ')' | ']' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        prev = Some(c);
    }
    parts.push(s[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Returns the prefix of `s` before the first top-level occurrence of any of
/// `stops`.
pub(crate) fn until_top_level<'a>(s: &'a str, stops: &[char]) -> &'a str {
    let mut depth = 0i32;
    let mut prev = None;
    for (i, c) in s.char_indices() {
        if depth == 0 && stops.contains(&c) {
            return &s[..i];
        }
        match c {
            '(' | '[' | '<' => depth += 1,
            '>' if prev == Some('-') => {}
            ')' | ']' | '>' => depth -= 1,
            _ => {}
        }
        prev = Some(c);
    }
    s
}

/// Removes `@attribute` and `@attribute(...)` tokens.
pub(crate) fn strip_attributes(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '@' {
            out.push(c);
            continue;
        }
        while chars.peek().is_some_and(|c| is_ident_char(*c)) {
            chars.next();
        }
        if chars.peek() == Some(&'(') {
            let mut depth = 0;
            for c in chars.by_ref() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    out
}
