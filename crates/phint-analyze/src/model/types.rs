//! Observed PHP type values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::class_node::ClassId;
use crate::AnalyzeError;

/// Scalar kinds that can be used as native type declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Bool,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
        }
    }
}

impl FromStr for ScalarKind {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Ok(ScalarKind::Int),
            "float" | "double" => Ok(ScalarKind::Float),
            "string" => Ok(ScalarKind::String),
            "bool" | "boolean" => Ok(ScalarKind::Bool),
            other => Err(AnalyzeError::InvalidArgument(format!(
                "'{}' is not a scalar type name",
                other
            ))),
        }
    }
}

/// Why a value could not be turned into a usable type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvableReason {
    /// Nothing known, e.g. an observed `null`
    None,
    /// Observations disagree
    Inconsistent,
    /// Doc comment is missing the tag or uses an unsupported pseudo-type
    Docblock,
    /// Doc comment declares `mixed` or a union
    DocblockMultiple,
}

impl UnresolvableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvableReason::None => "none",
            UnresolvableReason::Inconsistent => "inconsistent",
            UnresolvableReason::Docblock => "docblock",
            UnresolvableReason::DocblockMultiple => "docblock_multiple",
        }
    }
}

/// A type observed for a parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhpTypeValue {
    Scalar {
        kind: ScalarKind,
        nullable: bool,
    },
    /// A class-like type; `array` and `callable` live in the global
    /// namespace with an empty namespace string
    Object {
        namespace: String,
        name: String,
        nullable: bool,
    },
    Unresolvable {
        reason: UnresolvableReason,
        nullable: bool,
        message: Option<String>,
    },
}

impl PhpTypeValue {
    pub fn scalar(kind: ScalarKind) -> Self {
        PhpTypeValue::Scalar {
            kind,
            nullable: false,
        }
    }

    pub fn object(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        PhpTypeValue::Object {
            namespace: namespace.into(),
            name: name.into(),
            nullable: false,
        }
    }

    /// Build an object type from a fully qualified name such as `App\Models\User`
    pub fn from_fqcn(fqcn: &str) -> Self {
        let id = ClassId::new(fqcn);
        Self::object(id.namespace(), id.short_name())
    }

    pub fn array() -> Self {
        Self::object("", "array")
    }

    pub fn callable() -> Self {
        Self::object("", "callable")
    }

    pub fn unresolvable(reason: UnresolvableReason) -> Self {
        PhpTypeValue::Unresolvable {
            reason,
            nullable: false,
            message: None,
        }
    }

    pub fn unresolvable_with(reason: UnresolvableReason, message: impl Into<String>) -> Self {
        PhpTypeValue::Unresolvable {
            reason,
            nullable: false,
            message: Some(message.into()),
        }
    }

    /// Return the same type with its nullable flag set
    pub fn into_nullable(self) -> Self {
        match self {
            PhpTypeValue::Scalar { kind, .. } => PhpTypeValue::Scalar {
                kind,
                nullable: true,
            },
            PhpTypeValue::Object {
                namespace, name, ..
            } => PhpTypeValue::Object {
                namespace,
                name,
                nullable: true,
            },
            PhpTypeValue::Unresolvable {
                reason, message, ..
            } => PhpTypeValue::Unresolvable {
                reason,
                nullable: true,
                message,
            },
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            PhpTypeValue::Scalar { nullable, .. }
            | PhpTypeValue::Object { nullable, .. }
            | PhpTypeValue::Unresolvable { nullable, .. } => *nullable,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, PhpTypeValue::Unresolvable { .. })
    }

    pub fn unresolvable_reason(&self) -> Option<UnresolvableReason> {
        match self {
            PhpTypeValue::Unresolvable { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// `array` and `callable`
    pub fn is_builtin_object(&self) -> bool {
        matches!(
            self,
            PhpTypeValue::Object { namespace, name, .. }
                if namespace.is_empty() && (name == "array" || name == "callable")
        )
    }

    /// Class identity for object types that name a real class
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            PhpTypeValue::Object {
                namespace, name, ..
            } if !self.is_builtin_object() => Some(ClassId::from_parts(namespace, name)),
            _ => None,
        }
    }

    /// Name used to deduplicate observations, without nullability
    pub fn type_name(&self) -> String {
        match self {
            PhpTypeValue::Scalar { kind, .. } => kind.as_str().to_string(),
            PhpTypeValue::Object {
                namespace, name, ..
            } => {
                if namespace.is_empty() {
                    name.clone()
                } else {
                    format!("{}\\{}", namespace, name)
                }
            }
            PhpTypeValue::Unresolvable { reason, .. } => {
                format!("unresolvable({})", reason.as_str())
            }
        }
    }

    /// Name to write into a native type declaration
    ///
    /// Class names are fully qualified with a leading backslash so they
    /// resolve regardless of the file's namespace and imports.
    pub fn hint_name(&self) -> Option<String> {
        match self {
            PhpTypeValue::Scalar { kind, .. } => Some(kind.as_str().to_string()),
            PhpTypeValue::Object { name, .. } if self.is_builtin_object() => Some(name.clone()),
            PhpTypeValue::Object { .. } => Some(format!("\\{}", self.type_name())),
            PhpTypeValue::Unresolvable { .. } => None,
        }
    }
}

impl fmt::Display for PhpTypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nullable() {
            write!(f, "?")?;
        }
        write!(f, "{}", self.type_name())
    }
}
