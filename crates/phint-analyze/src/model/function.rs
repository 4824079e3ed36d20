//! Analyzed methods and their observations

use super::class_node::ClassId;
use super::types::PhpTypeValue;
use crate::docblock::DocComment;

/// A formal parameter of an analyzed method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (without $)
    pub name: String,
    /// Declared type, as written in the source
    pub type_hint: Option<String>,
    /// Default value expression, as written in the source
    pub default: Option<String>,
    /// Whether it's variadic (...$param)
    pub variadic: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim_start_matches('$').to_string(),
            type_hint: None,
            default: None,
            variadic: false,
        }
    }

    pub fn with_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.type_hint = Some(hint.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    pub fn has_type_hint(&self) -> bool {
        self.type_hint.is_some()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_is_null(&self) -> bool {
        self.default
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case("null"))
    }
}

/// Argument types of one call, index-aligned with the formal parameters
///
/// Omitted trailing optional arguments make the vector shorter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallObservation(pub Vec<PhpTypeValue>);

impl CallObservation {
    pub fn new(types: Vec<PhpTypeValue>) -> Self {
        Self(types)
    }

    pub fn get(&self, index: usize) -> Option<&PhpTypeValue> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One observed return type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnObservation(pub PhpTypeValue);

/// A method of an analyzed class together with everything observed about it
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRecord {
    /// Owning class
    pub class: ClassId,
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Whether the source already declares a return type
    pub has_return_type: bool,
    pub calls: Vec<CallObservation>,
    pub returns: Vec<ReturnObservation>,
    pub doc_comment: Option<DocComment>,
}

impl FunctionRecord {
    pub fn new(class: ClassId, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
            parameters: Vec::new(),
            has_return_type: false,
            calls: Vec::new(),
            returns: Vec::new(),
            doc_comment: None,
        }
    }

    pub fn with_parameter(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_return_type(mut self, has_return_type: bool) -> Self {
        self.has_return_type = has_return_type;
        self
    }

    pub fn with_call(mut self, call: CallObservation) -> Self {
        self.calls.push(call);
        self
    }

    pub fn with_return(mut self, ty: PhpTypeValue) -> Self {
        self.returns.push(ReturnObservation(ty));
        self
    }

    pub fn with_doc_comment(mut self, doc: DocComment) -> Self {
        self.doc_comment = Some(doc);
        self
    }

    /// `Class::method`, for messages
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.class, self.name)
    }

    /// Constructors and friends cannot declare a return type
    pub fn forbids_return_type(&self) -> bool {
        matches!(
            self.name.to_lowercase().as_str(),
            "__construct" | "__destruct" | "__clone"
        )
    }

    /// Types observed for the parameter at `index`, skipping calls that
    /// did not pass that argument
    pub fn observed_at(&self, index: usize) -> impl Iterator<Item = &PhpTypeValue> {
        self.calls.iter().filter_map(move |call| call.get(index))
    }

    pub fn observed_returns(&self) -> impl Iterator<Item = &PhpTypeValue> {
        self.returns.iter().map(|r| &r.0)
    }

    /// Append the observations of `other`, filling metadata this record lacks
    pub(crate) fn merge_from(&mut self, other: FunctionRecord) {
        if self.parameters.is_empty() {
            self.parameters = other.parameters;
        }
        self.has_return_type |= other.has_return_type;
        if self.doc_comment.is_none() {
            self.doc_comment = other.doc_comment;
        }
        self.calls.extend(other.calls);
        self.returns.extend(other.returns);
    }
}
