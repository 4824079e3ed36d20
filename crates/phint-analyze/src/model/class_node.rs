//! Class nodes of the analyzed project

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use super::types::PhpTypeValue;

/// Fully qualified class name, stored without a leading backslash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(String);

impl ClassId {
    pub fn new(fqcn: &str) -> Self {
        Self(fqcn.trim().trim_start_matches('\\').to_string())
    }

    pub fn from_parts(namespace: &str, name: &str) -> Self {
        if namespace.is_empty() {
            Self::new(name)
        } else {
            Self::new(&format!("{}\\{}", namespace.trim_matches('\\'), name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace part, empty for the global namespace
    pub fn namespace(&self) -> &str {
        self.0.rsplit_once('\\').map(|(ns, _)| ns).unwrap_or("")
    }

    pub fn short_name(&self) -> &str {
        self.0.rsplit_once('\\').map(|(_, name)| name).unwrap_or(&self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of class-like structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
    /// Seen only as a reference (trace value, edge target)
    #[default]
    Unknown,
}

/// A class, interface or trait in the canonical registry
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub id: ClassId,
    pub kind: ClassKind,
    /// Parent class
    pub extends: Option<ClassId>,
    /// Implemented interfaces (or extended interfaces, for an interface)
    pub implements: Vec<ClassId>,
    /// Declared method names
    pub methods: BTreeSet<String>,
    /// File declaring this class
    pub declaration_path: Option<PathBuf>,
    /// `use` aliases of the declaring file: alias -> fully qualified name
    pub imports: BTreeMap<String, String>,
    /// Whether a declaration has been seen, as opposed to a bare reference
    pub defined: bool,
}

impl ClassNode {
    /// A reference to a class whose declaration has not been seen yet
    pub fn new(id: ClassId) -> Self {
        Self {
            id,
            kind: ClassKind::Unknown,
            extends: None,
            implements: Vec::new(),
            methods: BTreeSet::new(),
            declaration_path: None,
            imports: BTreeMap::new(),
            defined: false,
        }
    }

    /// A class known from its declaration
    pub fn declared(id: ClassId, kind: ClassKind) -> Self {
        Self {
            kind,
            defined: true,
            ..Self::new(id)
        }
    }

    pub fn from_fqcn(fqcn: &str) -> Self {
        Self::new(ClassId::new(fqcn))
    }

    pub fn namespace(&self) -> &str {
        self.id.namespace()
    }

    pub fn name(&self) -> &str {
        self.id.short_name()
    }

    pub fn with_extends(mut self, parent: ClassId) -> Self {
        self.extends = Some(parent);
        self
    }

    pub fn with_implements(mut self, interface: ClassId) -> Self {
        self.implements.push(interface);
        self
    }

    pub fn with_method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.declaration_path = Some(path.into());
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    /// Outgoing inheritance edges, `extends` first
    pub fn edges(&self) -> impl Iterator<Item = &ClassId> {
        self.extends.iter().chain(self.implements.iter())
    }

    /// The type of an instance of this class
    pub fn as_type(&self) -> PhpTypeValue {
        PhpTypeValue::object(self.namespace(), self.name())
    }

    /// Fill in whatever this node does not know yet from `other`
    ///
    /// Existing values always win; method names are unioned.
    pub(crate) fn merge_from(&mut self, other: ClassNode) {
        if self.kind == ClassKind::Unknown {
            self.kind = other.kind;
        }
        if self.extends.is_none() {
            self.extends = other.extends;
        }
        if self.implements.is_empty() {
            self.implements = other.implements;
        }
        if self.declaration_path.is_none() {
            self.declaration_path = other.declaration_path;
        }
        if self.imports.is_empty() {
            self.imports = other.imports;
        }
        self.methods.extend(other.methods);
        self.defined |= other.defined;
    }
}
