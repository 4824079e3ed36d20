//! Lightweight PHP source scanning
//!
//! Regex-based scanning works on a masked copy of the source in which
//! comments, attributes and string contents are blanked out. The masked
//! text has the same byte length as the original, so every offset found in
//! it is valid in the source.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// A class-like declaration and the byte range of its body (inside the braces)
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClassSpan {
    pub namespace: String,
    pub name: String,
    pub body: Range<usize>,
}

/// A named function declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FunctionSpan {
    pub name: String,
    /// Offset of the opening `(` of the parameter list
    pub params_open: usize,
}

/// Blank out comments, attributes and string contents
pub(crate) fn mask_non_code(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = blank_line_comment(bytes, &mut out, i);
            }
            b'#' if bytes.get(i + 1) == Some(&b'[') => {
                i = blank_attribute(bytes, &mut out, i);
            }
            b'#' => {
                i = blank_line_comment(bytes, &mut out, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_bytes(bytes, i + 2, b"*/").map(|p| p + 2).unwrap_or(bytes.len());
                blank(&mut out, i, end);
                i = end;
            }
            b'\'' | b'"' | b'`' => {
                let end = string_end(bytes, i);
                blank(&mut out, i + 1, end.saturating_sub(1).max(i + 1));
                i = end;
            }
            b'<' if bytes[i..].starts_with(b"<<<") => {
                i = blank_heredoc(bytes, &mut out, i);
            }
            _ => i += 1,
        }
    }

    // Only whole characters inside comments and strings were blanked
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

fn blank(out: &mut [u8], start: usize, end: usize) {
    let len = out.len();
    for b in &mut out[start..end.min(len)] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn find_bytes(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn blank_line_comment(bytes: &[u8], out: &mut [u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && bytes[end] != b'\n' {
        if bytes[end..].starts_with(b"?>") {
            break;
        }
        end += 1;
    }
    blank(out, start, end);
    end
}

fn blank_attribute(bytes: &[u8], out: &mut [u8], start: usize) -> usize {
    let mut depth = 0;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    blank(out, start, i + 1);
                    return i + 1;
                }
            }
            b'\'' | b'"' => {
                i = string_end(bytes, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    blank(out, start, bytes.len());
    bytes.len()
}

/// Offset just past the closing quote of the string starting at `start`
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn blank_heredoc(bytes: &[u8], out: &mut [u8], start: usize) -> usize {
    let mut i = start + 3;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'\'' || bytes[i] == b'"') {
        i += 1;
    }
    let label_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == label_start {
        return start + 3;
    }
    let label = &bytes[label_start..i];

    let body_start = match find_bytes(bytes, i, b"\n") {
        Some(p) => p + 1,
        None => return bytes.len(),
    };

    let mut line_start = body_start;
    while line_start < bytes.len() {
        let line_end = find_bytes(bytes, line_start, b"\n").unwrap_or(bytes.len());
        let trimmed = bytes[line_start..line_end]
            .iter()
            .position(|b| *b != b' ' && *b != b'\t')
            .map(|p| line_start + p)
            .unwrap_or(line_end);
        if bytes[trimmed..line_end].starts_with(label) {
            let after = trimmed + label.len();
            let closes = bytes
                .get(after)
                .map(|b| !b.is_ascii_alphanumeric() && *b != b'_')
                .unwrap_or(true);
            if closes {
                blank(out, body_start, trimmed);
                return after;
            }
        }
        line_start = line_end + 1;
    }

    blank(out, body_start, bytes.len());
    bytes.len()
}

/// Offset of the bracket closing the one at `open`, in masked text
pub(crate) fn find_closing(masked: &str, open: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    let (open_char, close_char) = match bytes.get(open)? {
        b'(' => (b'(', b')'),
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        if *b == open_char {
            depth += 1;
        } else if *b == close_char {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bnamespace\s+([A-Za-z_][A-Za-z0-9_\\]*)\s*[;{]").unwrap())
}

fn class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(class|interface|trait|enum)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap()
    })
}

fn function_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bfunction\s*&?\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap())
}

/// Namespace in effect at `offset`
fn namespace_at(namespaces: &[(usize, String)], offset: usize) -> String {
    namespaces
        .iter()
        .take_while(|(pos, _)| *pos < offset)
        .last()
        .map(|(_, ns)| ns.clone())
        .unwrap_or_default()
}

/// Every named class-like declaration in the masked source
pub(crate) fn class_spans(masked: &str) -> Vec<ClassSpan> {
    let namespaces: Vec<(usize, String)> = namespace_regex()
        .captures_iter(masked)
        .filter_map(|cap| Some((cap.get(0)?.start(), cap.get(1)?.as_str().to_string())))
        .collect();

    let mut spans = Vec::new();
    for cap in class_regex().captures_iter(masked) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(2)) else {
            continue;
        };

        let before = masked[..whole.start()].trim_end();
        // `Foo::class`, `new class` and `$obj->class` are not declarations
        if before.ends_with("::") || before.ends_with("->") || before.to_lowercase().ends_with("new")
        {
            continue;
        }
        if matches!(
            name.as_str().to_lowercase().as_str(),
            "extends" | "implements"
        ) {
            continue;
        }

        let Some(open) = masked[name.end()..].find(['{', ';']).map(|p| p + name.end()) else {
            continue;
        };
        if masked.as_bytes()[open] != b'{' {
            continue;
        }
        let Some(close) = find_closing(masked, open) else {
            continue;
        };

        spans.push(ClassSpan {
            namespace: namespace_at(&namespaces, whole.start()),
            name: name.as_str().to_string(),
            body: open + 1..close,
        });
    }

    spans
}

/// Named functions declared directly in `range` of the masked source
///
/// Functions nested in the bodies of other functions are not reported.
pub(crate) fn function_spans(masked: &str, range: Range<usize>) -> Vec<FunctionSpan> {
    let mut spans = Vec::new();
    let mut cursor = range.start;

    while cursor < range.end {
        let Some(cap) = function_regex().captures(&masked[cursor..range.end]) else {
            break;
        };
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            break;
        };
        let params_open = cursor + whole.end() - 1;
        spans.push(FunctionSpan {
            name: name.as_str().to_string(),
            params_open,
        });

        // Continue after the body, or after the header for abstract methods
        let Some(params_close) = find_closing(masked, params_open) else {
            break;
        };
        let rest = &masked[params_close..range.end];
        cursor = match rest.find(['{', ';']) {
            Some(p) if rest.as_bytes()[p] == b'{' => {
                find_closing(masked, params_close + p).map(|c| c + 1).unwrap_or(range.end)
            }
            Some(p) => params_close + p + 1,
            None => range.end,
        };
    }

    spans
}

/// Named functions declared outside any class body
pub(crate) fn free_functions(masked: &str, classes: &[ClassSpan]) -> Vec<(String, FunctionSpan)> {
    let namespaces: Vec<(usize, String)> = namespace_regex()
        .captures_iter(masked)
        .filter_map(|cap| Some((cap.get(0)?.start(), cap.get(1)?.as_str().to_string())))
        .collect();

    function_spans(masked, 0..masked.len())
        .into_iter()
        .filter(|f| !classes.iter().any(|c| c.body.contains(&f.params_open)))
        .map(|f| (namespace_at(&namespaces, f.params_open), f))
        .collect()
}
