//! Types declared in doc comments

use std::sync::Arc;

use super::Analyzer;
use crate::collection::AnalyzedFunctionCollection;
use crate::docblock::DocComment;
use crate::index::DeclarationIndex;
use crate::model::{
    CallObservation, ClassId, ClassNode, FunctionRecord, PhpTypeValue, ScalarKind,
    UnresolvableReason,
};
use crate::{logging, Result};

/// Pseudo-types that have no usable native declaration
const UNSUPPORTED_PSEUDO_TYPES: &[&str] = &[
    "void", "null", "object", "iterable", "resource", "never", "true", "false", "scalar",
    "numeric", "class-string", "positive-int", "negative-int", "non-empty-string",
    "array-key",
];

/// Turns `@param` and `@return` tags into observations
///
/// Methods without a doc comment, or with `{@inheritdoc}`, borrow the tags
/// of the same method in their ancestors.
pub struct DocblockAnalyzer {
    index: Arc<DeclarationIndex>,
}

impl DocblockAnalyzer {
    pub fn new(index: Arc<DeclarationIndex>) -> Self {
        Self { index }
    }

    /// Own tags completed with those of ancestor declarations
    fn effective_doc(
        collection: &AnalyzedFunctionCollection,
        record: &FunctionRecord,
    ) -> Option<DocComment> {
        let mut doc = record.doc_comment.clone().unwrap_or_default();
        if record.doc_comment.is_some() && !doc.inherit_doc {
            return Some(doc);
        }

        for ancestor in collection.get_parents(&record.class).iter().skip(1) {
            let Ok(parent) = collection.get(ancestor, &record.name) else {
                continue;
            };
            if let Some(parent_doc) = &parent.doc_comment {
                doc.inherit_from(parent_doc, ancestor);
            }
        }

        doc.has_tags().then_some(doc)
    }

    fn observations(
        &self,
        collection: &AnalyzedFunctionCollection,
        class: &ClassNode,
        record: &FunctionRecord,
        doc: &DocComment,
    ) -> FunctionRecord {
        let mut observed = FunctionRecord::new(record.class.clone(), record.name.clone());

        if let Some(return_text) = &doc.return_type {
            let scope = tag_scope(collection, class, doc.return_origin.as_ref());
            if let Some(ty) = resolve_doc_type(return_text, class, scope, &self.index) {
                observed = observed.with_return(ty);
            }
        }

        if !record.parameters.is_empty() && !doc.params.is_empty() {
            let types = record
                .parameters
                .iter()
                .map(|param| {
                    doc.param(&param.name)
                        .and_then(|tag| {
                            let scope = tag_scope(collection, class, tag.origin.as_ref());
                            resolve_doc_type(&tag.type_text, class, scope, &self.index)
                        })
                        .unwrap_or_else(|| PhpTypeValue::unresolvable(UnresolvableReason::Docblock))
                })
                .collect();
            observed = observed.with_call(CallObservation::new(types));
        }

        observed
    }
}

/// Class whose file a tag was written in
///
/// Inherited tags name classes as seen from the ancestor's declaration.
fn tag_scope<'c>(
    collection: &'c AnalyzedFunctionCollection,
    class: &'c ClassNode,
    origin: Option<&ClassId>,
) -> &'c ClassNode {
    origin.and_then(|id| collection.class(id)).unwrap_or(class)
}

impl Analyzer for DocblockAnalyzer {
    fn name(&self) -> &'static str {
        "docblock"
    }

    fn analyze(&self, collection: &mut AnalyzedFunctionCollection) -> Result<()> {
        let mut pending = Vec::new();

        for record in collection.functions() {
            let Some(doc) = Self::effective_doc(collection, record) else {
                continue;
            };
            let class = collection
                .class(&record.class)
                .cloned()
                .unwrap_or_else(|| ClassNode::new(record.class.clone()));
            let observed = self.observations(collection, &class, record, &doc);
            if !observed.calls.is_empty() || !observed.returns.is_empty() {
                pending.push((ClassNode::new(record.class.clone()), observed));
            }
        }

        logging::log(&format!("Doc comments typed {} methods", pending.len()));
        for (class, observed) in pending {
            collection.add(class, observed);
        }

        Ok(())
    }
}

/// Resolve a doc comment type
///
/// `class` is the method's own class and gives `$this`, `self` and
/// `static`. Other names resolve through the imports and namespace of
/// `scope`, the class whose doc comment declared the tag. Returns `None`
/// when the tag carries no type at all.
pub fn resolve_doc_type(
    text: &str,
    class: &ClassNode,
    scope: &ClassNode,
    index: &DeclarationIndex,
) -> Option<PhpTypeValue> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(inner) = text.strip_prefix('?') {
        return resolve_doc_type(inner, class, scope, index).map(PhpTypeValue::into_nullable);
    }

    let lower = text.to_lowercase();
    if lower == "mixed" || text.contains('|') {
        return Some(PhpTypeValue::unresolvable_with(
            UnresolvableReason::DocblockMultiple,
            text,
        ));
    }

    if text.ends_with("[]") {
        return Some(PhpTypeValue::array());
    }

    let base = lower.split('<').next().unwrap_or(&lower);
    match base {
        "$this" | "self" | "static" => return Some(class.as_type()),
        "array" | "list" | "non-empty-array" | "non-empty-list" => {
            return Some(PhpTypeValue::array())
        }
        "callable" | "closure" | "\\closure" => return Some(PhpTypeValue::callable()),
        _ => {}
    }

    if let Ok(kind) = text.parse::<ScalarKind>() {
        return Some(PhpTypeValue::scalar(kind));
    }

    let is_class_name = text
        .trim_start_matches('\\')
        .split('\\')
        .all(|part| {
            part.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
    if UNSUPPORTED_PSEUDO_TYPES.contains(&lower.as_str()) || !is_class_name {
        return Some(PhpTypeValue::unresolvable_with(UnresolvableReason::Docblock, text));
    }

    Some(PhpTypeValue::from_fqcn(resolve_class_name(text, scope, index).as_str()))
}

fn resolve_class_name(name: &str, class: &ClassNode, index: &DeclarationIndex) -> ClassId {
    if let Some(fqcn) = name.strip_prefix('\\') {
        return ClassId::new(fqcn);
    }

    let first_part = name.split('\\').next().unwrap_or(name);
    let first_part_lower = first_part.to_lowercase();
    for (alias, fqcn) in &class.imports {
        if alias.to_lowercase() == first_part_lower {
            let rest = &name[first_part.len()..];
            return ClassId::new(&format!("{}{}", fqcn, rest));
        }
    }

    if !name.contains('\\') {
        if let Some(id) = index.find_class(class.namespace(), name) {
            return id.clone();
        }
    }

    ClassId::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docblock::parse_doc_comment;
    use crate::model::{ClassKind, Parameter};
    use std::path::Path;

    fn context() -> (ClassNode, DeclarationIndex) {
        let mut class = ClassNode::declared(ClassId::new("App\\Service\\Mailer"), ClassKind::Class);
        class
            .imports
            .insert("Msg".to_string(), "App\\Mail\\Message".to_string());

        let mut index = DeclarationIndex::new();
        index.add_source(
            Path::new("/p/src/Transport.php"),
            "<?php\nnamespace App\\Service;\ninterface Transport {}\n",
        );
        (class, index)
    }

    fn resolve(text: &str) -> Option<PhpTypeValue> {
        let (class, index) = context();
        resolve_doc_type(text, &class, &class, &index)
    }

    #[test]
    fn test_resolve_scalars_and_builtins() {
        assert_eq!(resolve("integer"), Some(PhpTypeValue::scalar(ScalarKind::Int)));
        assert_eq!(
            resolve("?string"),
            Some(PhpTypeValue::scalar(ScalarKind::String).into_nullable())
        );
        assert_eq!(resolve("User[]"), Some(PhpTypeValue::array()));
        assert_eq!(resolve("array<int, string>"), Some(PhpTypeValue::array()));
        assert_eq!(resolve("callable"), Some(PhpTypeValue::callable()));
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_resolve_unresolvable() {
        let reason = |text: &str| resolve(text).and_then(|t| t.unresolvable_reason());
        assert_eq!(reason("mixed"), Some(UnresolvableReason::DocblockMultiple));
        assert_eq!(reason("int|string"), Some(UnresolvableReason::DocblockMultiple));
        assert_eq!(reason("void"), Some(UnresolvableReason::Docblock));
        assert_eq!(reason("resource"), Some(UnresolvableReason::Docblock));
        assert_eq!(reason("class-string<Foo>"), Some(UnresolvableReason::Docblock));
    }

    #[test]
    fn test_resolve_class_names() {
        assert_eq!(resolve("$this"), Some(PhpTypeValue::object("App\\Service", "Mailer")));
        assert_eq!(resolve("Msg"), Some(PhpTypeValue::object("App\\Mail", "Message")));
        assert_eq!(
            resolve("Transport"),
            Some(PhpTypeValue::object("App\\Service", "Transport"))
        );
        assert_eq!(resolve("\\DateTime"), Some(PhpTypeValue::object("", "DateTime")));
        assert_eq!(resolve("Vendor\\Thing"), Some(PhpTypeValue::object("Vendor", "Thing")));
    }

    #[test]
    fn test_params_matched_by_name() {
        let (class, index) = context();
        let mut collection = AnalyzedFunctionCollection::new();
        collection.add_class(class.clone());
        collection.add(
            class.clone(),
            FunctionRecord::new(class.id.clone(), "send")
                .with_parameter(Parameter::new("to"))
                .with_parameter(Parameter::new("retries"))
                .with_doc_comment(parse_doc_comment(
                    "/**\n * @param int $retries\n * @return bool\n */",
                )),
        );

        DocblockAnalyzer::new(Arc::new(index))
            .analyze(&mut collection)
            .unwrap();

        let record = collection.get(&class.id, "send").unwrap();
        assert_eq!(record.calls.len(), 1);
        assert_eq!(
            record.calls[0].0,
            vec![
                PhpTypeValue::unresolvable(UnresolvableReason::Docblock),
                PhpTypeValue::scalar(ScalarKind::Int),
            ]
        );
        assert_eq!(
            record.returns[0].0,
            PhpTypeValue::scalar(ScalarKind::Bool)
        );
    }

    #[test]
    fn test_tags_inherited_from_interface() {
        let mut collection = AnalyzedFunctionCollection::new();
        let contract = ClassNode::declared(ClassId::new("App\\Contract"), ClassKind::Interface);
        let child = ClassNode::declared(ClassId::new("App\\Impl"), ClassKind::Class)
            .with_implements(ClassId::new("App\\Contract"));
        collection.add_class(contract.clone());
        collection.add_class(child.clone());

        collection.add(
            contract.clone(),
            FunctionRecord::new(contract.id.clone(), "get")
                .with_parameter(Parameter::new("key"))
                .with_doc_comment(parse_doc_comment(
                    "/**\n * @param string $key\n * @return int\n */",
                )),
        );
        collection.add(
            child.clone(),
            FunctionRecord::new(child.id.clone(), "get")
                .with_parameter(Parameter::new("key"))
                .with_doc_comment(parse_doc_comment("/** {@inheritdoc} */")),
        );

        DocblockAnalyzer::new(Arc::new(DeclarationIndex::new()))
            .analyze(&mut collection)
            .unwrap();

        let record = collection.get(&child.id, "get").unwrap();
        assert_eq!(
            record.calls[0].0,
            vec![PhpTypeValue::scalar(ScalarKind::String)]
        );
        assert_eq!(record.returns[0].0, PhpTypeValue::scalar(ScalarKind::Int));
    }

    #[test]
    fn test_inherited_tags_resolve_in_ancestor_namespace() {
        let mut index = DeclarationIndex::new();
        index.add_source(
            Path::new("/p/src/Contracts/Result.php"),
            "<?php\nnamespace App\\Contracts;\nclass Result {}\n",
        );

        let mut contract =
            ClassNode::declared(ClassId::new("App\\Contracts\\Repository"), ClassKind::Interface);
        contract
            .imports
            .insert("Criteria".to_string(), "App\\Support\\Criteria".to_string());
        let child = ClassNode::declared(ClassId::new("App\\Impl\\UserRepository"), ClassKind::Class)
            .with_implements(contract.id.clone());

        let mut collection = AnalyzedFunctionCollection::new();
        collection.add_class(contract.clone());
        collection.add_class(child.clone());
        collection.add(
            contract.clone(),
            FunctionRecord::new(contract.id.clone(), "find")
                .with_parameter(Parameter::new("criteria"))
                .with_doc_comment(parse_doc_comment(
                    "/**\n * @param Criteria $criteria\n * @return Result\n */",
                )),
        );
        collection.add(
            contract.clone(),
            FunctionRecord::new(contract.id.clone(), "fluent")
                .with_doc_comment(parse_doc_comment("/** @return $this */")),
        );
        collection.add(
            child.clone(),
            FunctionRecord::new(child.id.clone(), "find").with_parameter(Parameter::new("criteria")),
        );
        collection.add(child.clone(), FunctionRecord::new(child.id.clone(), "fluent"));

        DocblockAnalyzer::new(Arc::new(index))
            .analyze(&mut collection)
            .unwrap();

        let find = collection.get(&child.id, "find").unwrap();
        assert_eq!(
            find.returns[0].0,
            PhpTypeValue::object("App\\Contracts", "Result")
        );
        assert_eq!(
            find.calls[0].0,
            vec![PhpTypeValue::object("App\\Support", "Criteria")]
        );

        let fluent = collection.get(&child.id, "fluent").unwrap();
        assert_eq!(
            fluent.returns[0].0,
            PhpTypeValue::object("App\\Impl", "UserRepository")
        );
    }
}
