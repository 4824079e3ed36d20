use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Test doubles seen in the trace, mapped to the type they stand in for
///
/// PHPUnit and Prophecy generate their doubles with `eval`, so the class
/// declaration shows up as a parameter of some entry line. Values whose
/// class is one of these doubles are rewritten to the real type.
#[derive(Debug, Default)]
pub struct MockRegistry {
    /// Double class name (or namespace prefix) -> real type
    doubles: BTreeMap<String, String>,
}

fn phpunit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"class\s+(Mock_[A-Za-z0-9_]+_[0-9a-f]+)\s+(?:extends|implements)\s+([^{]+)")
            .unwrap()
    })
}

fn prophecy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"namespace\s+(Double\\((?:[A-Za-z_][A-Za-z0-9_]*\\?)+))\s*\{\s*class\s+[A-Za-z_]\w*\s+(?:extends|implements)")
            .unwrap()
    })
}

fn type_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\?([A-Za-z_][A-Za-z0-9_]*(?:\\[A-Za-z_][A-Za-z0-9_]*)*)").unwrap())
}

/// Undo the escaping Xdebug applies to string values
fn unescape(raw: &str) -> String {
    raw.replace("\\\\", "\u{0}")
        .replace("\\n", " ")
        .replace("\\t", " ")
        .replace('\u{0}', "\\")
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.doubles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doubles.is_empty()
    }

    /// Real type a double stands in for
    pub fn real_type(&self, double: &str) -> Option<&str> {
        self.doubles.get(double).map(|s| s.as_str())
    }

    /// Look for double declarations in the raw parameters of an entry line
    ///
    /// Returns how many new doubles were registered.
    pub fn observe(&mut self, parameters: &[String]) -> usize {
        let mut found = 0;

        for raw in parameters {
            if !raw.contains("Mock_") && !raw.contains("Double\\") {
                continue;
            }
            let text = unescape(raw);

            for caps in phpunit_regex().captures_iter(&text) {
                let (Some(double), Some(types)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let real = type_list_regex()
                    .captures_iter(types.as_str())
                    .filter_map(|c| c.get(1).map(|m| m.as_str()))
                    .filter(|t| *t != "extends" && *t != "implements")
                    .find(|t| !t.starts_with("PHPUnit\\"));
                if let Some(real) = real {
                    if self
                        .doubles
                        .insert(double.as_str().to_string(), real.to_string())
                        .is_none()
                    {
                        found += 1;
                    }
                }
            }

            for caps in prophecy_regex().captures_iter(&text) {
                let (Some(prefix), Some(real)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let prefix = format!("{}\\", prefix.as_str().trim_end_matches('\\'));
                let real = real.as_str().trim_end_matches('\\').to_string();
                if self.doubles.insert(prefix, real).is_none() {
                    found += 1;
                }
            }
        }

        found
    }

    /// Replace an object value whose class is a known double with `class <Real>`
    ///
    /// Only `class <Name> ...` values are considered; other values that
    /// merely mention a double's name are left alone.
    pub fn rewrite(&self, value: &str) -> Option<String> {
        if self.doubles.is_empty() {
            return None;
        }
        let normalized = value.replace("\\\\", "\\");
        let rest = normalized.trim_start().strip_prefix("class ")?;
        let name = rest
            .split(|c: char| c.is_whitespace() || c == '{')
            .next()
            .unwrap_or("")
            .trim_start_matches('\\');
        if name.is_empty() {
            return None;
        }

        self.doubles
            .iter()
            .find(|(double, _)| {
                // Prophecy doubles are keyed by namespace prefix
                if double.ends_with('\\') {
                    name.starts_with(double.as_str())
                } else {
                    name == double.as_str()
                }
            })
            .map(|(_, real)| format!("class {}", real))
    }
}
