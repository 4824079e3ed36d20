//! Canonical registry of analyzed classes and methods
//!
//! Every analyzer writes through [`AnalyzedFunctionCollection::add`], which
//! merges incoming classes and methods into a single node per identity.

use std::collections::{BTreeMap, HashSet};

use crate::model::{ClassId, ClassNode, FunctionRecord};
use crate::{AnalyzeError, Result};

/// Arena of classes and their methods
#[derive(Debug, Default)]
pub struct AnalyzedFunctionCollection {
    classes: BTreeMap<ClassId, ClassNode>,
    functions: BTreeMap<(ClassId, String), FunctionRecord>,
}

impl AnalyzedFunctionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a class into the registry
    ///
    /// Inheritance targets that are not known yet get a placeholder node,
    /// which is completed once their own declaration is added.
    pub fn add_class(&mut self, class: ClassNode) -> &ClassNode {
        for target in class.edges() {
            if !self.classes.contains_key(target) {
                self.classes
                    .insert(target.clone(), ClassNode::new(target.clone()));
            }
        }

        let id = class.id.clone();
        match self.classes.get_mut(&id) {
            Some(existing) => existing.merge_from(class),
            None => {
                self.classes.insert(id.clone(), class);
            }
        }

        &self.classes[&id]
    }

    /// Merge a method together with its owning class
    ///
    /// Observations are appended to any existing record for the same
    /// method; they are never replaced.
    pub fn add(&mut self, class: ClassNode, mut function: FunctionRecord) {
        function.class = class.id.clone();
        let class = class.with_method(function.name.clone());
        self.add_class(class);

        let key = (function.class.clone(), function.name.clone());
        match self.functions.get_mut(&key) {
            Some(existing) => existing.merge_from(function),
            None => {
                self.functions.insert(key, function);
            }
        }
    }

    /// Look up a method record
    pub fn get(&self, class: &ClassId, name: &str) -> Result<&FunctionRecord> {
        self.functions
            .get(&(class.clone(), name.to_string()))
            .ok_or_else(|| AnalyzeError::NotFound(format!("{}::{}", class, name)))
    }

    pub fn contains(&self, class: &ClassId, name: &str) -> bool {
        self.functions
            .contains_key(&(class.clone(), name.to_string()))
    }

    pub fn class(&self, id: &ClassId) -> Option<&ClassNode> {
        self.classes.get(id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassNode> {
        self.classes.values()
    }

    /// All method records, ordered by class then method name
    pub fn functions(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.functions.values()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The class itself followed by every ancestor, each exactly once
    ///
    /// Depth-first through `extends`, then each `implements` edge in order.
    pub fn get_parents(&self, id: &ClassId) -> Vec<ClassId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        self.collect_parents(id, &mut visited, &mut result);
        result
    }

    fn collect_parents(
        &self,
        id: &ClassId,
        visited: &mut HashSet<ClassId>,
        result: &mut Vec<ClassId>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        result.push(id.clone());

        if let Some(node) = self.classes.get(id) {
            for parent in node.edges() {
                self.collect_parents(parent, visited, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassKind, PhpTypeValue, ScalarKind};

    fn id(name: &str) -> ClassId {
        ClassId::new(name)
    }

    #[test]
    fn test_add_appends_observations() {
        let mut collection = AnalyzedFunctionCollection::new();
        let int = PhpTypeValue::scalar(ScalarKind::Int);

        collection.add(
            ClassNode::from_fqcn("X"),
            FunctionRecord::new(id("X"), "y").with_return(int.clone()),
        );
        collection.add(
            ClassNode::from_fqcn("X"),
            FunctionRecord::new(id("X"), "y").with_return(int.clone()),
        );

        let record = collection.get(&id("X"), "y").unwrap();
        assert_eq!(record.returns.len(), 2);
        assert_eq!(collection.len(), 1);
        assert!(collection.class(&id("X")).unwrap().has_method("y"));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let collection = AnalyzedFunctionCollection::new();
        let result = collection.get(&id("Nope"), "missing");
        assert!(matches!(result, Err(AnalyzeError::NotFound(_))));
    }

    #[test]
    fn test_placeholder_rebinds_to_definition() {
        let mut collection = AnalyzedFunctionCollection::new();
        collection.add_class(
            ClassNode::declared(id("App\\Child"), ClassKind::Class).with_extends(id("App\\Base")),
        );

        let placeholder = collection.class(&id("App\\Base")).unwrap();
        assert!(!placeholder.defined);

        collection.add_class(
            ClassNode::declared(id("App\\Base"), ClassKind::Class)
                .with_implements(id("App\\Contract")),
        );

        assert!(collection.class(&id("App\\Base")).unwrap().defined);
        assert_eq!(
            collection.get_parents(&id("App\\Child")),
            vec![id("App\\Child"), id("App\\Base"), id("App\\Contract")]
        );
    }

    #[test]
    fn test_get_parents_diamond() {
        let mut collection = AnalyzedFunctionCollection::new();
        collection.add_class(
            ClassNode::declared(id("D"), ClassKind::Class)
                .with_implements(id("B"))
                .with_implements(id("C")),
        );
        collection.add_class(
            ClassNode::declared(id("B"), ClassKind::Interface).with_implements(id("A")),
        );
        collection.add_class(
            ClassNode::declared(id("C"), ClassKind::Interface).with_implements(id("A")),
        );
        collection.add_class(ClassNode::declared(id("A"), ClassKind::Interface));

        let parents = collection.get_parents(&id("D"));
        assert_eq!(parents, vec![id("D"), id("B"), id("A"), id("C")]);
    }

    #[test]
    fn test_get_parents_cycle_terminates() {
        let mut collection = AnalyzedFunctionCollection::new();
        collection.add_class(ClassNode::declared(id("A"), ClassKind::Class).with_extends(id("B")));
        collection.add_class(ClassNode::declared(id("B"), ClassKind::Class).with_extends(id("A")));

        assert_eq!(collection.get_parents(&id("A")), vec![id("A"), id("B")]);
    }

    #[test]
    fn test_get_parents_unknown_class() {
        let collection = AnalyzedFunctionCollection::new();
        assert_eq!(collection.get_parents(&id("Ghost")), vec![id("Ghost")]);
    }
}
