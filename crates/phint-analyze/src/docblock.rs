//! Doc comment tag parser
//!
//! Extracts the `@param` and `@return` tags of a method doc comment. Types
//! are kept as written; resolving them against the class graph happens in
//! the docblock analyzer.

use crate::model::ClassId;

/// A `@param` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTag {
    /// Variable name without `$`
    pub name: String,
    /// Type text as written
    pub type_text: String,
    /// Ancestor the tag was inherited from; its names resolve there
    pub origin: Option<ClassId>,
}

/// Parsed doc comment of a method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub params: Vec<ParamTag>,
    /// `@return` type text; `Some("")` for a tag without a type
    pub return_type: Option<String>,
    /// Ancestor the `@return` tag was inherited from
    pub return_origin: Option<ClassId>,
    /// `{@inheritdoc}` or a bare `@inheritDoc`
    pub inherit_doc: bool,
}

impl DocComment {
    pub fn param(&self, name: &str) -> Option<&ParamTag> {
        self.params.iter().find(|tag| tag.name == name)
    }

    pub fn has_tags(&self) -> bool {
        !self.params.is_empty() || self.return_type.is_some()
    }

    /// Copy the tags of `ancestor` that this comment does not declare itself
    ///
    /// Copied tags remember `origin`, the class whose doc comment they were
    /// written in.
    pub fn inherit_from(&mut self, ancestor: &DocComment, origin: &ClassId) {
        for tag in &ancestor.params {
            if self.param(&tag.name).is_none() {
                let mut tag = tag.clone();
                tag.origin.get_or_insert_with(|| origin.clone());
                self.params.push(tag);
            }
        }
        if self.return_type.is_none() && ancestor.return_type.is_some() {
            self.return_type = ancestor.return_type.clone();
            self.return_origin = ancestor
                .return_origin
                .clone()
                .or_else(|| Some(origin.clone()));
        }
    }
}

/// Parse a `/** ... */` block
pub fn parse_doc_comment(comment: &str) -> DocComment {
    let mut doc = DocComment::default();

    for line in comment.lines() {
        let line = line
            .trim()
            .trim_start_matches(['/', '*', ' '])
            .trim_end_matches(['/', '*', ' ']);

        if line.to_lowercase().contains("{@inheritdoc}") {
            doc.inherit_doc = true;
            continue;
        }

        if let Some(rest) = line.strip_prefix("@param") {
            if let Some(tag) = parse_param_line(rest) {
                doc.params.push(tag);
            }
        } else if let Some(rest) = line.strip_prefix("@return") {
            if doc.return_type.is_none() && (rest.is_empty() || rest.starts_with(char::is_whitespace))
            {
                let (type_text, _) = split_type_token(rest.trim());
                doc.return_type = Some(type_text.to_string());
            }
        } else if line.eq_ignore_ascii_case("@inheritdoc") {
            doc.inherit_doc = true;
        }
    }

    doc
}

/// Parse a @param line: "Type $name" or "$name Type"
fn parse_param_line(rest: &str) -> Option<ParamTag> {
    // "@parameter" and friends are not @param
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim();
    if is_variable(rest) {
        let (name, after) = split_type_token(rest);
        let (type_text, _) = split_type_token(after.trim());
        return Some(ParamTag {
            name: variable_name(name),
            type_text: type_text.to_string(),
            origin: None,
        });
    }

    let (type_text, after) = split_type_token(rest);
    let (name, _) = split_type_token(after.trim());
    if !is_variable(name) {
        return None;
    }

    Some(ParamTag {
        name: variable_name(name),
        type_text: type_text.to_string(),
        origin: None,
    })
}

fn is_variable(token: &str) -> bool {
    token
        .trim_start_matches(['&', '.'])
        .starts_with('$')
}

fn variable_name(token: &str) -> String {
    token
        .trim_start_matches(['&', '.', '$'])
        .trim_end_matches([',', ';'])
        .to_string()
}

/// Split off the first type token, keeping `array<int, string>` whole
fn split_type_token(text: &str) -> (&str, &str) {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth -= 1,
            c if c.is_whitespace() && depth <= 0 => return (&text[..i], &text[i..]),
            _ => {}
        }
    }
    (text, "")
}
