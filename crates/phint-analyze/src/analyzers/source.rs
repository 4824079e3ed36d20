//! Declarations read from project source files

use mago_database::file::FileId;
use mago_span::HasSpan;
use mago_syntax::ast::*;
use phint_core::{namespace_name, walk_declarations, DeclarationVisitor};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::Analyzer;
use crate::collection::AnalyzedFunctionCollection;
use crate::docblock::{parse_doc_comment, DocComment};
use crate::exclude::PathFilter;
use crate::logging;
use crate::model::{ClassId, ClassKind, ClassNode, FunctionRecord, Parameter};
use crate::Result;

/// Registers every class of the project, its hierarchy and its methods
///
/// Existing parameter hints, defaults, return type declarations and doc
/// comments are recorded so later steps know what is already typed.
pub struct SourceAnalyzer {
    roots: Vec<PathBuf>,
    filter: PathFilter,
}

/// Declarations of one file
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub classes: Vec<ClassNode>,
    pub functions: Vec<FunctionRecord>,
}

impl SourceAnalyzer {
    pub fn new(roots: Vec<PathBuf>, filter: PathFilter) -> Self {
        Self { roots, filter }
    }

    pub fn analyze_file(path: &Path) -> Result<ParsedFile> {
        let source = fs::read_to_string(path)?;
        Ok(Self::analyze_source(path, &source))
    }

    /// Collect the declarations of a source text
    pub fn analyze_source(path: &Path, source: &str) -> ParsedFile {
        let arena = bumpalo::Bump::new();
        let file_id = FileId::new(path.to_string_lossy().as_ref());
        let (program, parse_error) =
            mago_syntax::parser::parse_file_content(&arena, file_id, source);

        if let Some(error) = parse_error {
            logging::warn(&format!("{}: parse error: {}", path.display(), error));
        }

        let mut collector = DeclarationCollector::new(source, path);
        walk_declarations(&mut collector, &program, source);
        collector.parsed
    }

    /// Merge parsed declarations into the collection
    pub fn merge(parsed: ParsedFile, collection: &mut AnalyzedFunctionCollection) {
        for class in parsed.classes {
            collection.add_class(class);
        }
        for function in parsed.functions {
            let owner = ClassNode::new(function.class.clone());
            collection.add(owner, function);
        }
    }
}

impl Analyzer for SourceAnalyzer {
    fn name(&self) -> &'static str {
        "source"
    }

    fn analyze(&self, collection: &mut AnalyzedFunctionCollection) -> Result<()> {
        let files = self.filter.collect_php_files(&self.roots);
        logging::log(&format!("Parsing {} source files", files.len()));

        let results: Vec<_> = files
            .par_iter()
            .map(|file| (file, Self::analyze_file(file)))
            .collect();

        for (file, result) in results {
            match result {
                Ok(parsed) => Self::merge(parsed, collection),
                Err(e) => logging::warn(&format!("{}: {}", file.display(), e)),
            }
        }

        Ok(())
    }
}

/// Walks one file and records its class-like declarations
struct DeclarationCollector<'s> {
    source: &'s str,
    file: PathBuf,
    namespace: String,
    /// Use aliases of the file: alias -> fully qualified name
    aliases: BTreeMap<String, String>,
    parsed: ParsedFile,
}

impl<'s> DeclarationCollector<'s> {
    fn new(source: &'s str, file: &Path) -> Self {
        Self {
            source,
            file: file.to_path_buf(),
            namespace: String::new(),
            aliases: BTreeMap::new(),
            parsed: ParsedFile::default(),
        }
    }

    fn get_span_text(&self, span: &mago_span::Span) -> &'s str {
        &self.source[span.start.offset as usize..span.end.offset as usize]
    }

    /// Qualify a class reference with the file's aliases and namespace
    fn qualify_name(&self, name: &str) -> ClassId {
        if let Some(fqcn) = name.strip_prefix('\\') {
            return ClassId::new(fqcn);
        }

        let first_part = name.split('\\').next().unwrap_or(name);
        let first_part_lower = first_part.to_lowercase();
        for (alias, fqcn) in &self.aliases {
            if alias.to_lowercase() == first_part_lower {
                let rest = &name[first_part.len()..];
                return ClassId::new(&format!("{}{}", fqcn, rest));
            }
        }

        ClassId::from_parts(&self.namespace, name)
    }

    /// Record the imports of a `use` statement
    fn extract_imports_from_use_text(&mut self, use_text: &str) {
        let text = use_text.trim().trim_start_matches("use").trim_start();
        // Function and constant imports never name a class
        if text.starts_with("function ") || text.starts_with("const ") {
            return;
        }
        let text = text.trim().trim_end_matches(';').trim();

        if let (Some(brace_start), Some(brace_end)) = (text.find('{'), text.find('}')) {
            let prefix = text[..brace_start].trim().trim_end_matches('\\');
            for item in text[brace_start + 1..brace_end].split(',') {
                let item = item.trim();
                if !item.is_empty() {
                    self.add_import(prefix, item);
                }
            }
            return;
        }

        for item in text.split(',') {
            let item = item.trim();
            if !item.is_empty() {
                self.add_import("", item);
            }
        }
    }

    fn add_import(&mut self, prefix: &str, item: &str) {
        let (name, alias) = match item.to_lowercase().find(" as ") {
            Some(as_pos) => (item[..as_pos].trim(), Some(item[as_pos + 4..].trim())),
            None => (item, None),
        };
        let name = name.trim_start_matches('\\');
        let full_name = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", prefix.trim_start_matches('\\'), name)
        };
        let alias = alias
            .unwrap_or_else(|| name.rsplit('\\').next().unwrap_or(name))
            .to_string();
        self.aliases.insert(alias, full_name);
    }

    /// Doc comment directly preceding the element starting at `offset`
    fn extract_doc_comment(&self, offset: usize) -> Option<DocComment> {
        let before = &self.source[..offset];
        let doc_end = before.rfind("*/")?;
        let doc_start = before[..doc_end].rfind("/**")?;

        let between = before[doc_end + 2..].trim();
        let is_adjacent = between.split_whitespace().all(|word| {
            matches!(
                word,
                "public" | "private" | "protected" | "static" | "final" | "abstract" | "readonly"
            ) || word.starts_with("#[")
        });

        if is_adjacent {
            Some(parse_doc_comment(&self.source[doc_start..doc_end + 2]))
        } else {
            None
        }
    }

    fn class_like(
        &mut self,
        kind: ClassKind,
        name_span: &mago_span::Span,
        members: &Sequence<'_, ClassLikeMember<'_>>,
    ) -> ClassNode {
        let name = self.get_span_text(name_span);
        let id = ClassId::from_parts(&self.namespace, name);

        let mut node = ClassNode::declared(id, kind).with_path(self.file.clone());
        node.imports = self.aliases.clone();

        for member in members.iter() {
            if let ClassLikeMember::Method(method) = member {
                let record = self.method_record(&node.id, method);
                node.methods.insert(record.name.clone());
                self.parsed.functions.push(record);
            }
        }

        node
    }

    fn method_record(&self, class: &ClassId, method: &Method<'_>) -> FunctionRecord {
        let name = self.get_span_text(&method.name.span);
        let mut record = FunctionRecord::new(class.clone(), name)
            .with_return_type(method.return_type_hint.is_some());

        for param in method.parameter_list.parameters.iter() {
            let mut parameter = Parameter::new(self.get_span_text(&param.variable.span))
                .with_variadic(param.ellipsis.is_some());
            if let Some(hint) = &param.hint {
                parameter = parameter.with_type_hint(self.get_span_text(&hint.span()));
            }
            if let Some(default) = &param.default_value {
                parameter = parameter.with_default(self.get_span_text(&default.value.span()));
            }
            record = record.with_parameter(parameter);
        }

        if let Some(doc) = self.extract_doc_comment(method.span().start.offset as usize) {
            record = record.with_doc_comment(doc);
        }

        record
    }
}

impl<'a, 's> DeclarationVisitor<'a> for DeclarationCollector<'s> {
    fn visit_statement(&mut self, stmt: &Statement<'a>, _source: &str) -> bool {
        match stmt {
            Statement::Namespace(ns) => {
                let text = self.get_span_text(&ns.span());
                self.namespace = namespace_name(text).unwrap_or("").to_string();
                // Imports are scoped to their namespace block
                self.aliases.clear();
                true
            }
            Statement::Use(use_stmt) => {
                let use_text = self.get_span_text(&use_stmt.span());
                self.extract_imports_from_use_text(use_text);
                true
            }
            Statement::Class(class) => {
                let mut node = self.class_like(ClassKind::Class, &class.name.span, &class.members);

                if let Some(extends) = &class.extends {
                    if let Some(parent) = extends.types.iter().next() {
                        node.extends = Some(self.qualify_name(self.get_span_text(&parent.span())));
                    }
                }
                if let Some(implements) = &class.implements {
                    for iface in implements.types.iter() {
                        let iface = self.qualify_name(self.get_span_text(&iface.span()));
                        node.implements.push(iface);
                    }
                }

                self.parsed.classes.push(node);
                false
            }
            Statement::Interface(interface) => {
                let mut node = self.class_like(
                    ClassKind::Interface,
                    &interface.name.span,
                    &interface.members,
                );

                if let Some(extends) = &interface.extends {
                    for parent in extends.types.iter() {
                        let parent = self.qualify_name(self.get_span_text(&parent.span()));
                        node.implements.push(parent);
                    }
                }

                self.parsed.classes.push(node);
                false
            }
            Statement::Trait(trait_def) => {
                let node =
                    self.class_like(ClassKind::Trait, &trait_def.name.span, &trait_def.members);
                self.parsed.classes.push(node);
                false
            }
            Statement::Enum(enum_def) => {
                let node = self.class_like(ClassKind::Enum, &enum_def.name.span, &enum_def.members);
                self.parsed.classes.push(node);
                false
            }
            _ => true,
        }
    }
}
