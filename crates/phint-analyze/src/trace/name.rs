use regex::Regex;
use std::sync::OnceLock;

/// How a traced function was called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `Class->method`
    Method,
    /// `Class::method`
    Static,
    /// Any `{closure}` frame
    Closure,
    /// A bare function name
    Function,
}

/// A function name as printed in a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Class short name, empty for functions and closures
    pub class: String,
    pub function: String,
    pub kind: CallKind,
}

impl FunctionName {
    pub fn is_closure(&self) -> bool {
        self.kind == CallKind::Closure
    }

    pub fn has_class(&self) -> bool {
        !self.class.is_empty()
    }
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\\?((?:[A-Za-z_][A-Za-z0-9_]*\\)*)([A-Za-z_][A-Za-z0-9_]*)(?:(->|::)([A-Za-z_][A-Za-z0-9_]*))?$")
            .unwrap()
    })
}

/// Parse `Ns\Class->method`, `Ns\Class::method`, `Ns\func` or closure names
///
/// Returns `None` for text that is not a function name.
pub fn parse_function_name(text: &str) -> Option<FunctionName> {
    let text = text.trim();

    if text.contains("{closure") {
        let namespace = text
            .split("{closure")
            .next()
            .unwrap_or("")
            .trim_end_matches('\\')
            .to_string();
        return Some(FunctionName {
            namespace,
            class: String::new(),
            function: "{closure}".to_string(),
            kind: CallKind::Closure,
        });
    }

    let caps = name_regex().captures(text)?;
    let namespace = caps
        .get(1)
        .map(|m| m.as_str().trim_end_matches('\\'))
        .unwrap_or("")
        .to_string();
    let first = caps.get(2)?.as_str().to_string();

    match (caps.get(3), caps.get(4)) {
        (Some(op), Some(method)) => Some(FunctionName {
            namespace,
            class: first,
            function: method.as_str().to_string(),
            kind: if op.as_str() == "->" {
                CallKind::Method
            } else {
                CallKind::Static
            },
        }),
        _ => Some(FunctionName {
            namespace,
            class: String::new(),
            function: first,
            kind: CallKind::Function,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_name() {
        let name = parse_function_name("App\\Service\\Mailer->send").unwrap();
        assert_eq!(name.namespace, "App\\Service");
        assert_eq!(name.class, "Mailer");
        assert_eq!(name.function, "send");
        assert_eq!(name.kind, CallKind::Method);
    }

    #[test]
    fn test_static_global_class() {
        let name = parse_function_name("Mailer::create").unwrap();
        assert_eq!(name.namespace, "");
        assert_eq!(name.class, "Mailer");
        assert_eq!(name.kind, CallKind::Static);
    }

    #[test]
    fn test_function_and_closure() {
        let function = parse_function_name("App\\helper").unwrap();
        assert_eq!(function.kind, CallKind::Function);
        assert_eq!(function.namespace, "App");
        assert!(!function.has_class());

        let closure = parse_function_name("App\\{closure:/src/a.php:10-12}").unwrap();
        assert!(closure.is_closure());
        assert_eq!(closure.namespace, "App");
        assert!(parse_function_name("{closure}").unwrap().is_closure());
    }

    #[test]
    fn test_not_a_name() {
        assert!(parse_function_name("require_once(/a/b.php)").is_none());
        assert!(parse_function_name("").is_none());
    }
}
