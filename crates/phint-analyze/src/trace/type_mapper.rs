use regex::Regex;
use std::sync::OnceLock;

use super::name::parse_function_name;
use crate::model::{PhpTypeValue, ScalarKind, UnresolvableReason};

/// Classifies raw Xdebug value representations
///
/// Handles both the short form printed with `collect_params=1`
/// (`long`, `string(5)`, `class Foo`) and full values (`42`, `'abc'`,
/// `class Foo { ... }`). Every input maps to some type.
pub struct TypeMapper;

struct Patterns {
    string: Regex,
    array: Regex,
    callable: Regex,
    boolean: Regex,
    int: Regex,
    float: Regex,
    null: Regex,
    class: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        string: Regex::new(r#"^(?:string\(\d+\)|'.*'|".*")$"#).unwrap(),
        array: Regex::new(r"^(?:array\(\d+\)|array\s*\(.*\)|\[.*\])$").unwrap(),
        callable: Regex::new(r"^class Closure\b|\{closure").unwrap(),
        boolean: Regex::new(r"^(?i:bool|true|false)$").unwrap(),
        int: Regex::new(r"^(?:long|int|-?\d+)$").unwrap(),
        float: Regex::new(r"^(?:double|float|-?\d+\.\d*(?:[eE][-+]?\d+)?|-?\d+[eE][-+]?\d+|-?INF|NAN)$").unwrap(),
        null: Regex::new(r"^(?i:null)$").unwrap(),
        class: Regex::new(r"^class\s+(\\?[A-Za-z_][A-Za-z0-9_\\]*)").unwrap(),
    })
}

impl TypeMapper {
    pub fn map(raw: &str) -> PhpTypeValue {
        let value = raw.trim();
        let p = patterns();

        if p.string.is_match(value) {
            return PhpTypeValue::scalar(ScalarKind::String);
        }
        if p.array.is_match(value) {
            return PhpTypeValue::array();
        }
        if p.callable.is_match(value) {
            return PhpTypeValue::callable();
        }
        if p.boolean.is_match(value) {
            return PhpTypeValue::scalar(ScalarKind::Bool);
        }
        if p.int.is_match(value) {
            return PhpTypeValue::scalar(ScalarKind::Int);
        }
        if p.float.is_match(value) {
            return PhpTypeValue::scalar(ScalarKind::Float);
        }
        if p.null.is_match(value) {
            return PhpTypeValue::unresolvable(UnresolvableReason::None);
        }
        if let Some(caps) = p.class.captures(value) {
            if let Some(class) = caps.get(1) {
                return Self::object_from_name(class.as_str());
            }
        }

        Self::object_from_name(value)
    }

    fn object_from_name(text: &str) -> PhpTypeValue {
        match parse_function_name(text) {
            Some(name) if !name.has_class() && !name.is_closure() => {
                PhpTypeValue::object(name.namespace, name.function)
            }
            _ => PhpTypeValue::unresolvable_with(
                UnresolvableReason::None,
                format!("unrecognized value: {}", text),
            ),
        }
    }
}
