//! Decided type edits

use serde::Serialize;
use std::fmt;

use super::class_node::ClassId;
use super::types::PhpTypeValue;

/// A decided type: the rendered declaration name plus nullability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredType {
    /// Name as written into the declaration, e.g. `int` or `\App\User`
    pub name: String,
    pub nullable: bool,
}

impl InferredType {
    pub fn new(name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
        }
    }

    /// `None` for unresolvable types, which never become declarations
    pub fn from_value(value: &PhpTypeValue) -> Option<Self> {
        value
            .hint_name()
            .map(|name| Self::new(name, value.is_nullable()))
    }

    /// Declaration text, e.g. `?int`
    pub fn render(&self) -> String {
        if self.nullable {
            format!("?{}", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// An edit the editor should make to a method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Add a return type declaration
    ReturnType {
        class: ClassId,
        function: String,
        ty: InferredType,
    },
    /// Add a type declaration to the parameter at `arg_index`
    TypeHint {
        class: ClassId,
        function: String,
        arg_index: usize,
        ty: InferredType,
    },
}

impl Instruction {
    pub fn class(&self) -> &ClassId {
        match self {
            Instruction::ReturnType { class, .. } | Instruction::TypeHint { class, .. } => class,
        }
    }

    pub fn function(&self) -> &str {
        match self {
            Instruction::ReturnType { function, .. } | Instruction::TypeHint { function, .. } => {
                function
            }
        }
    }

    pub fn ty(&self) -> &InferredType {
        match self {
            Instruction::ReturnType { ty, .. } | Instruction::TypeHint { ty, .. } => ty,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::ReturnType { .. } => "return",
            Instruction::TypeHint { .. } => "hint",
        }
    }

    /// Serializable form for reports
    pub fn surface(&self) -> InstructionSurface {
        let arg_index = match self {
            Instruction::TypeHint { arg_index, .. } => Some(*arg_index),
            Instruction::ReturnType { .. } => None,
        };

        InstructionSurface {
            kind: self.kind(),
            namespace: self.class().namespace().to_string(),
            class_name: self.class().short_name().to_string(),
            function_name: self.function().to_string(),
            arg_index,
            type_name: self.ty().render(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::ReturnType {
                class,
                function,
                ty,
            } => write!(f, "{}::{}() returns {}", class, function, ty),
            Instruction::TypeHint {
                class,
                function,
                arg_index,
                ty,
            } => write!(f, "{}::{}() parameter #{} is {}", class, function, arg_index, ty),
        }
    }
}

/// Flat instruction record used in JSON output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionSurface {
    pub kind: &'static str,
    pub namespace: String,
    pub class_name: String,
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_index: Option<usize>,
    pub type_name: String,
}
